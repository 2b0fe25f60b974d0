//! # SSMP
//!
//! A minimal in-memory key-value store served over SSMP, a
//! length-prefixed request/response protocol:
//! - 4-byte big-endian length + UTF-8 JSON array payload
//! - Five commands: PING, SET, GET, DEL, EXISTS
//! - One shared store behind a single lock
//! - Thread-per-connection TCP server
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Listener                            │
//! │              (one handler thread per client)                 │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                 Connection Handler                           │
//! │        (read frame → dispatch → write frame)                 │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Engine                                  │
//! │          (command parsing, arity, responses)                 │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!                       ▼
//!                ┌─────────────┐
//!                │    Store    │
//!                │   (Mutex)   │
//!                └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod store;
pub mod protocol;
pub mod engine;
pub mod network;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{SsmpError, Result};
pub use config::Config;
pub use engine::Engine;
pub use store::Store;
pub use client::Client;
pub use network::{Server, ShutdownHandle};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of the SSMP crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
