//! Error types for SSMP
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using SsmpError
pub type Result<T> = std::result::Result<T, SsmpError>;

/// Unified error type for SSMP operations
#[derive(Debug, Error)]
pub enum SsmpError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Framing Errors
    // -------------------------------------------------------------------------
    #[error("Frame too large: {len} bytes (max {max})")]
    FrameTooLarge { len: u64, max: u64 },

    #[error("Truncated frame: peer closed before {expected} payload bytes arrived")]
    TruncatedFrame { expected: u32 },

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unexpected reply: {0}")]
    UnexpectedReply(String),

    #[error("Server error: {0}")]
    Server(String),

    // -------------------------------------------------------------------------
    // Connection State Errors
    // -------------------------------------------------------------------------
    #[error("Client not connected")]
    NotConnected,

    #[error("Connection closed by peer")]
    ConnectionClosed,

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SsmpError {
    /// True when the error means the peer went away (reset, abort, broken pipe, EOF)
    pub fn is_disconnect(&self) -> bool {
        match self {
            SsmpError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::UnexpectedEof
            ),
            SsmpError::ConnectionClosed | SsmpError::TruncatedFrame { .. } => true,
            _ => false,
        }
    }
}
