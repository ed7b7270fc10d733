//! Gavel Engine Library
//!
//! This library provides the core functionality of the Gavel judging
//! coordinator. It is used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// Database persistence module
pub mod db;

/// Latest unsubmitted ratings per judge and round
pub mod drafts;

/// Realtime fan-out to connected clients
pub mod hub;

/// Presentation state machine and deadline reconciliation
pub mod scheduler;

/// Inbound client event relay
pub mod session;

/// HTTP and WebSocket server
pub mod server;

/// Director console WebSocket client
pub mod console;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;

#[cfg(test)]
mod testing;
