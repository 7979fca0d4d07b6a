//! # pubsublite
//!
//! `pubsublite` is an in-process publish/subscribe broker built with Tokio.
//! Producers publish opaque byte payloads to named topics; every subscriber
//! registered on a topic receives each payload published after it joined.
//! A WebSocket transport exposes the broker to remote clients.
//!
//! ## Core Modules
//!
//! - `broker`: the subscription registry and fan-out engine.
//! - `client`: per-connection state for WebSocket clients.
//! - `config`: loading and merging server configuration.
//! - `transport`: the WebSocket server and its JSON protocol.
//! - `utils`: error types and logging setup.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use pubsublite::broker::{Broker, Message, Subscriber};
//! use pubsublite::utils::error::DeliveryError;
//!
//! # async fn run() -> Result<(), pubsublite::utils::error::BrokerError> {
//! let broker = Broker::new();
//! let subscription = broker
//!     .subscribe(Subscriber::new("news", |message: Arc<Message>| async move {
//!         println!("got {} bytes", message.data().len());
//!         Ok::<(), DeliveryError>(())
//!     }))
//!     .await?;
//!
//! broker.broadcast("hello", "news").await?;
//! broker.unsubscribe(&subscription).await?;
//! # Ok(())
//! # }
//! ```

pub mod broker;
pub mod client;
pub mod config;
pub mod transport;
pub mod utils;
