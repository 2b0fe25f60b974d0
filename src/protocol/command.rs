//! Command definitions
//!
//! Turns a request's tokens into a command with validated arity.

use super::Request;

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Ping (health check)
    Ping,

    /// Set a key-value pair
    Set { key: String, value: String },

    /// Get a value by key
    Get { key: String },

    /// Delete a key
    Del { key: String },

    /// Check whether a key exists
    Exists { key: String },

    /// Unrecognized name, or a known name with the wrong number of arguments
    Unknown { name: String, argc: usize },
}

impl Command {
    /// Parse a request
    ///
    /// The first token is the command name (case-insensitive), the rest are
    /// its arguments.
    pub fn parse(request: Request) -> Self {
        let mut tokens = request.into_tokens().into_iter();
        let name = tokens.next().unwrap_or_default().to_uppercase();
        let args: Vec<String> = tokens.collect();
        let argc = args.len();

        let command = match (name.as_str(), argc) {
            ("PING", 0) => Some(Command::Ping),
            ("SET", 2) => take::<2>(args).map(|[key, value]| Command::Set { key, value }),
            ("GET", 1) => take::<1>(args).map(|[key]| Command::Get { key }),
            ("DEL", 1) => take::<1>(args).map(|[key]| Command::Del { key }),
            ("EXISTS", 1) => take::<1>(args).map(|[key]| Command::Exists { key }),
            _ => None,
        };

        command.unwrap_or(Command::Unknown { name, argc })
    }

    /// Command name as used on the wire
    pub fn name(&self) -> &str {
        match self {
            Command::Ping => "PING",
            Command::Set { .. } => "SET",
            Command::Get { .. } => "GET",
            Command::Del { .. } => "DEL",
            Command::Exists { .. } => "EXISTS",
            Command::Unknown { name, .. } => name,
        }
    }
}

fn take<const N: usize>(args: Vec<String>) -> Option<[String; N]> {
    args.try_into().ok()
}
