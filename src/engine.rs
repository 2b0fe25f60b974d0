//! Engine Module
//!
//! Executes commands against the shared store.
//!
//! ## Responsibilities
//! - Decode a request payload into a command
//! - Validate command arity
//! - Run the command against the Store and build exactly one response

use std::sync::Arc;

use crate::protocol::{Command, ErrorCode, Request, Response};
use crate::store::Store;

/// The command engine
///
/// Holds the only reference handlers need: the shared `Store`. Every
/// connection handler gets an `Arc<Engine>`.
#[derive(Debug, Clone)]
pub struct Engine {
    store: Arc<Store>,
}

impl Engine {
    /// Create an engine over an existing store
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Decode a raw payload and execute it
    ///
    /// Malformed payloads produce `["ERR","INVALID_PAYLOAD"]` and never
    /// reach the store.
    pub fn handle_payload(&self, payload: &[u8]) -> Response {
        match Request::from_payload(payload) {
            Ok(request) => {
                let command = Command::parse(request);
                tracing::debug!(command = command.name(), "Received command");
                self.execute(command)
            }
            Err(e) => {
                tracing::warn!("Rejecting payload of {} bytes: {}", payload.len(), e);
                Response::Error(ErrorCode::InvalidPayload)
            }
        }
    }

    /// Execute a command
    ///
    /// Routes commands to the store
    pub fn execute(&self, command: Command) -> Response {
        match command {
            Command::Ping => Response::Pong,
            Command::Set { key, value } => {
                self.store.set(key, value);
                Response::Ok
            }
            Command::Get { key } => match self.store.get(&key) {
                Some(value) => Response::Value(value),
                None => Response::Error(ErrorCode::NotFound),
            },
            Command::Del { key } => Response::Count(self.store.delete(&key)),
            Command::Exists { key } => Response::Count(self.store.exists(&key)),
            Command::Unknown { name, argc } => {
                tracing::debug!("Unknown command {} with {} argument(s)", name, argc);
                Response::Error(ErrorCode::UnknownCommand)
            }
        }
    }

    /// Get the shared store
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }
}
