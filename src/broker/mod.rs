//! The `broker` module holds the subscription registry and the fan-out engine.
//!
//! - `message`: the immutable envelope built for every broadcast.
//! - `subscriber`: subscribers, their sinks and dispatch loops.
//! - `topic`: the per-topic member list.
//! - `engine`: the `Broker` that ties them together.

pub mod engine;
pub mod message;
pub mod subscriber;
pub mod topic;

pub use engine::Broker;
pub use message::Message;
pub use subscriber::{InboxCapacity, Sink, Subscriber, SubscriberId, Subscription, Termination};
