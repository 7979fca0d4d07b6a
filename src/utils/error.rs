//! The `error` module defines the error types used within `pubsublite`.
//!
//! - [`BrokerError`] is returned synchronously by the registry operations
//!   (`subscribe`, `broadcast`, `unsubscribe`).
//! - [`DeliveryError`] is produced by a [`Sink`](crate::broker::Sink) and never
//!   reaches a publisher; it only ends the failing subscriber's participation.

use thiserror::Error;

/// Errors returned to callers of the broker's public operations.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    /// The subscriber cannot be registered (it has no usable topic).
    #[error("invalid subscriber")]
    InvalidSubscriber,

    /// The topic has never been registered with the broker.
    #[error("unable to find topic '{0}'")]
    TopicNotFound(String),

    /// The broker has been shut down and accepts no new subscribers.
    #[error("broker is shutting down")]
    ShuttingDown,
}

impl BrokerError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            BrokerError::InvalidSubscriber => "invalid_subscriber",
            BrokerError::TopicNotFound(_) => "topic_not_found",
            BrokerError::ShuttingDown => "shutting_down",
        }
    }
}

/// Errors a sink reports when it cannot take a message.
///
/// Any delivery error is terminal for the subscriber that produced it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The destination behind the sink is gone (closed connection, dropped receiver).
    #[error("sink closed")]
    Closed,

    /// The sink failed for another reason.
    #[error("delivery failed: {0}")]
    Failed(String),
}

impl From<String> for DeliveryError {
    fn from(reason: String) -> Self {
        DeliveryError::Failed(reason)
    }
}

impl From<&str> for DeliveryError {
    fn from(reason: &str) -> Self {
        DeliveryError::Failed(reason.to_string())
    }
}
