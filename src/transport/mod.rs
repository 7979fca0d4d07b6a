//! The `transport` module is responsible for handling network communication
//! with clients via WebSockets.
//!
//! It defines the messaging protocol used between clients and the server,
//! and implements the WebSocket server itself: connections become broker
//! subscribers through a [`websocket::ChannelSink`], and client requests are
//! translated into `subscribe`, `unsubscribe` and `broadcast` calls.

pub mod message;
pub mod websocket;
