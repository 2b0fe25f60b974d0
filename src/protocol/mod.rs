//! Protocol Module
//!
//! Defines the SSMP wire protocol for client-server communication.
//!
//! ## Frame Format
//! ```text
//! ┌──────────────┬─────────────────────────────┐
//! │ Len (4, BE)  │   Payload (UTF-8 JSON)      │
//! └──────────────┴─────────────────────────────┘
//! ```
//!
//! ### Commands
//! - `["PING"]`              -> `["OK","PONG"]`
//! - `["SET", key, value]`   -> `["OK"]`
//! - `["GET", key]`          -> `["OK", value]` / `["ERR","NOT_FOUND"]`
//! - `["DEL", key]`          -> `["OK", 0|1]`
//! - `["EXISTS", key]`       -> `["OK", 0|1]`
//!
//! ### Error Reasons
//! - `NOT_FOUND`
//! - `UNKNOWN_COMMAND` (unknown name or wrong arity)
//! - `INVALID_PAYLOAD` (not a non-empty JSON array of strings)

pub mod frame;
mod command;
mod message;

pub use command::Command;
pub use message::{ErrorCode, Reply, Request, Response, Status, Token};
pub use frame::{decode_header, encode, read_frame, write_frame, HEADER_SIZE};
