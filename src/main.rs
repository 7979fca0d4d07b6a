//! CLI for pubsublite
//!
//! Subcommands:
//! - `serve` (default): run the WebSocket server
//! - `subscribe`: connect to a server and print messages of a topic
//! - `publish`: connect to a server and publish one message

use clap::{Parser, Subcommand};
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tracing::{error, info};
use tungstenite::protocol::Message as WsMessage;

use pubsublite::broker::Broker;
use pubsublite::config::load_config;
use pubsublite::transport::message::{ClientMessage, ServerMessage};
use pubsublite::transport::websocket::start_websocket_server;
use pubsublite::utils::logging;

#[derive(Parser)]
#[command(name = "pubsublite", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the WebSocket server
    Serve,
    /// Subscribe to a topic and print every message received
    Subscribe {
        topic: String,
        #[arg(long, default_value = "ws://127.0.0.1:8111")]
        url: String,
    },
    /// Publish one message to a topic
    Publish {
        topic: String,
        payload: String,
        #[arg(long, default_value = "ws://127.0.0.1:8111")]
        url: String,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let result = match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => run_server().await,
        Command::Subscribe { topic, url } => {
            logging::init("info");
            run_subscribe(&url, topic).await
        }
        Command::Publish {
            topic,
            payload,
            url,
        } => {
            logging::init("info");
            run_publish(&url, topic, payload).await
        }
    };

    if let Err(e) = result {
        // no-op when a subscriber is already installed
        logging::init("error");
        error!("pubsublite failed: {e}");
        std::process::exit(1);
    }
}

async fn run_server() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    logging::init(&config.log.level);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let broker = Broker::new();

    tokio::select! {
        res = start_websocket_server(&addr, broker.clone(), config) => {
            res?;
            error!("WebSocket server exited unexpectedly.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    broker.shutdown().await;
    Ok(())
}

async fn run_subscribe(url: &str, topic: String) -> Result<(), Box<dyn std::error::Error>> {
    let (mut ws_stream, _response) = connect_async(url).await?;
    let request = serde_json::to_string(&ClientMessage::Subscribe { topic })?;
    ws_stream.send(WsMessage::text(request)).await?;

    while let Some(frame) = ws_stream.next().await {
        let frame = frame?;
        if !frame.is_text() {
            continue;
        }
        match serde_json::from_str::<ServerMessage>(frame.to_text()?)? {
            ServerMessage::Message { id, payload, .. } => println!("{id}: {payload}"),
            ServerMessage::Error { message } => return Err(message.into()),
            other => info!("{other:?}"),
        }
    }
    Ok(())
}

async fn run_publish(
    url: &str,
    topic: String,
    payload: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let (mut ws_stream, _response) = connect_async(url).await?;
    let request = serde_json::to_string(&ClientMessage::Publish { topic, payload })?;
    ws_stream.send(WsMessage::text(request)).await?;

    if let Some(frame) = ws_stream.next().await {
        let frame = frame?;
        match serde_json::from_str::<ServerMessage>(frame.to_text()?)? {
            ServerMessage::Error { message } => return Err(message.into()),
            reply => println!("{reply:?}"),
        }
    }
    ws_stream.close(None).await?;
    Ok(())
}
