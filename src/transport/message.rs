use serde::{Deserialize, Serialize};

use crate::broker::Message;

/// Requests a client may send, tagged by `type`.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "subscribe")]
    Subscribe { topic: String },

    #[serde(rename = "unsubscribe")]
    Unsubscribe { topic: String },

    #[serde(rename = "publish")]
    Publish { topic: String, payload: String },
}

/// Frames the server writes to a client, tagged by `type`.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "subscribed")]
    Subscribed { topic: String },

    #[serde(rename = "unsubscribed")]
    Unsubscribed { topic: String },

    #[serde(rename = "published")]
    Published { topic: String },

    #[serde(rename = "error")]
    Error { message: String },

    /// A broadcast delivered to one of the client's subscriptions.
    /// `publish_time` is milliseconds since the UNIX epoch.
    #[serde(rename = "message")]
    Message {
        topic: String,
        id: String,
        payload: String,
        publish_time: i64,
    },
}

impl ServerMessage {
    /// Wraps a delivered envelope; non UTF-8 payload bytes are replaced.
    pub fn delivery(topic: &str, message: &Message) -> Self {
        ServerMessage::Message {
            topic: topic.to_string(),
            id: message.id().to_string(),
            payload: String::from_utf8_lossy(message.data()).into_owned(),
            publish_time: message.publish_time().timestamp_millis(),
        }
    }

    pub fn error(message: impl std::fmt::Display) -> Self {
        ServerMessage::Error {
            message: message.to_string(),
        }
    }
}
