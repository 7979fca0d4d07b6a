//! WebSocket transport
//!
//! This file implements a minimal WebSocket server that translates protocol
//! JSON messages into broker operations. Responsibilities:
//! - Accept TCP/WebSocket connections and create a `Client` for each one
//! - Register a broker `Subscriber` per subscribed topic, whose sink writes
//!   deliveries to the connection
//! - Enforce transport limits (payload size) before publishing
//! - Unsubscribe everything a connection owns when it goes away

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio_tungstenite::accept_async;
use tracing::{debug, info, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::broker::{Broker, Message, Sink, Subscriber};
use crate::client::Client;
use crate::config::Settings;
use crate::transport::message::{ClientMessage, ServerMessage};
use crate::utils::error::DeliveryError;

/// Sink that forwards deliveries to a connection's outbound channel.
///
/// Fails with [`DeliveryError::Closed`] once the connection's writer is
/// gone, which makes the broker drop the subscriber.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    topic: String,
    sender: UnboundedSender<WsMessage>,
}

impl ChannelSink {
    pub fn new(topic: &str, sender: UnboundedSender<WsMessage>) -> Self {
        Self {
            topic: topic.to_string(),
            sender,
        }
    }
}

#[async_trait]
impl Sink for ChannelSink {
    async fn deliver(&self, message: Arc<Message>) -> Result<(), DeliveryError> {
        let frame = serde_json::to_string(&ServerMessage::delivery(&self.topic, &message))
            .map_err(|e| DeliveryError::Failed(e.to_string()))?;
        self.sender
            .send(WsMessage::text(frame))
            .map_err(|_| DeliveryError::Closed)
    }
}

/// Binds `addr` and serves WebSocket clients until accepting fails.
pub async fn start_websocket_server(
    addr: &str,
    broker: Broker,
    settings: Settings,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("WebSocket server listening on ws://{}", listener.local_addr()?);
    serve(listener, broker, settings).await
}

/// Accept loop over an already bound listener.
pub async fn serve(listener: TcpListener, broker: Broker, settings: Settings) -> std::io::Result<()> {
    let settings = Arc::new(settings);
    loop {
        let (stream, peer) = listener.accept().await?;
        tokio::spawn(handle_connection(
            stream,
            peer,
            broker.clone(),
            Arc::clone(&settings),
        ));
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    broker: Broker,
    settings: Arc<Settings>,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!(%peer, error = %e, "WebSocket handshake error");
            return;
        }
    };

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();
    let mut client = Client::new(tx);
    let client_id = client.id.clone();
    info!(client = %client_id, %peer, "client connected");

    {
        let client_id = client_id.clone();
        tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                if let Err(e) = ws_sender.send(frame).await {
                    debug!(client = %client_id, error = %e, "failed to write frame");
                    break;
                }
            }
            debug!(client = %client_id, "send loop closed");
        });
    }

    while let Some(frame) = ws_receiver.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                debug!(client = %client_id, error = %e, "read error");
                break;
            }
        };
        if frame.is_close() {
            break;
        }
        if !frame.is_text() {
            continue;
        }
        let Ok(text) = frame.to_text() else {
            continue;
        };

        let reply = match serde_json::from_str::<ClientMessage>(text) {
            Ok(request) => handle_client_message(&broker, &mut client, request, &settings).await,
            Err(err) => {
                warn!(
                    client = %client_id,
                    error = %err,
                    "invalid client message: {}",
                    text.chars().take(100).collect::<String>()
                );
                ServerMessage::error(format!("invalid client message: {err}"))
            }
        };

        if !client.send(&reply) {
            break;
        }
    }

    client.cleanup(&broker).await;
    info!(client = %client_id, "client disconnected");
}

/// Applies one client request to the broker and returns the reply frame.
pub async fn handle_client_message(
    broker: &Broker,
    client: &mut Client,
    request: ClientMessage,
    settings: &Settings,
) -> ServerMessage {
    match request {
        ClientMessage::Subscribe { topic } => {
            if client.is_subscribed(&topic) {
                return ServerMessage::error(format!("already subscribed to '{topic}'"));
            }
            let sink = ChannelSink::new(&topic, client.sender.clone());
            let subscriber = Subscriber::new(topic.clone(), sink)
                .with_capacity(settings.broker.inbox_capacity());

            match broker.subscribe(subscriber).await {
                Ok(subscription) => {
                    client.track(subscription);
                    info!(client = %client.id, topic = %topic, "subscribed");
                    ServerMessage::Subscribed { topic }
                }
                Err(e) => ServerMessage::error(e),
            }
        }

        ClientMessage::Unsubscribe { topic } => {
            let Some(subscription) = client.untrack(&topic) else {
                return ServerMessage::error(format!("not subscribed to '{topic}'"));
            };
            match broker.unsubscribe(&subscription).await {
                Ok(()) => {
                    info!(client = %client.id, topic = %topic, "unsubscribed");
                    ServerMessage::Unsubscribed { topic }
                }
                Err(e) => ServerMessage::error(e),
            }
        }

        ClientMessage::Publish { topic, payload } => {
            let limit = settings.broker.max_payload_bytes;
            if payload.len() > limit {
                return ServerMessage::error(format!(
                    "payload of {} bytes exceeds the {limit} byte limit",
                    payload.len()
                ));
            }
            match broker.broadcast(payload, &topic).await {
                Ok(()) => {
                    debug!(client = %client.id, topic = %topic, "published");
                    ServerMessage::Published { topic }
                }
                Err(e) => {
                    debug!(client = %client.id, topic = %topic, error = e.as_label(), "publish rejected");
                    ServerMessage::error(e)
                }
            }
        }
    }
}
