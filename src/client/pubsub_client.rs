use std::collections::HashMap;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};
use tungstenite::protocol::Message as WsMessage;
use uuid::Uuid;

use crate::broker::{Broker, Subscription};
use crate::transport::message::ServerMessage;

/// Represents a connected WebSocket client in the Pub/Sub system.
///
/// Each client is uniquely identified by an `id` and has a channel (`sender`)
/// for sending messages to the client over WebSocket.
#[derive(Debug)]
pub struct Client {
    /// Unique identifier for the client (`client-<uuid>`).
    pub id: String,

    /// Channel to send WebSocket messages to the client.
    pub sender: UnboundedSender<WsMessage>,

    /// Broker subscriptions owned by this connection, keyed by topic.
    subscriptions: HashMap<String, Subscription>,
}

impl Client {
    pub fn new(sender: UnboundedSender<WsMessage>) -> Self {
        Self {
            id: format!("client-{}", Uuid::new_v4()),
            sender,
            subscriptions: HashMap::new(),
        }
    }

    /// Serializes `message` and queues it for the connection.
    ///
    /// Returns `false` when the connection's writer is gone.
    pub fn send(&self, message: &ServerMessage) -> bool {
        match serde_json::to_string(message) {
            Ok(json) => self.sender.send(WsMessage::text(json)).is_ok(),
            Err(e) => {
                warn!(client = %self.id, error = %e, "failed to serialize server message");
                false
            }
        }
    }

    pub fn is_subscribed(&self, topic: &str) -> bool {
        self.subscriptions.contains_key(topic)
    }

    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.subscriptions.keys().map(String::as_str)
    }

    pub(crate) fn track(&mut self, subscription: Subscription) {
        self.subscriptions
            .insert(subscription.topic().to_string(), subscription);
    }

    pub(crate) fn untrack(&mut self, topic: &str) -> Option<Subscription> {
        self.subscriptions.remove(topic)
    }

    /// Unsubscribes every subscription this client still owns.
    pub async fn cleanup(&mut self, broker: &Broker) {
        for (topic, subscription) in self.subscriptions.drain() {
            if let Err(e) = broker.unsubscribe(&subscription).await {
                debug!(client = %self.id, topic = %topic, error = %e, "cleanup unsubscribe failed");
            }
        }
        debug!(client = %self.id, "cleaned up client");
    }
}
