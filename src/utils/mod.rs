//! The `utils` module provides a collection of utility functions and common
//! definitions used across the `pubsublite` application.
//!
//! This module centralizes reusable components, such as the error types and
//! the tracing initialiser, to keep the broker and transport layers lean.

pub mod error;
pub mod logging;

#[cfg(test)]
mod tests;
