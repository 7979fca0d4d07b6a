//! The `client` module defines the representation of a client in the Pub/Sub system.
//!
//! It provides the `Client` struct, which encapsulates the state of a single
//! WebSocket connection: its identifier, the channel for writing frames to
//! it, and the broker subscriptions it owns.

pub mod pubsub_client;
pub use pubsub_client::Client;

#[cfg(test)]
mod tests;
