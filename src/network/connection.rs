//! Connection Handler
//!
//! Handles individual client connections.
//!
//! ## States
//! ```text
//! AwaitHeader -> AwaitPayload -> Dispatch -> Respond -> AwaitHeader
//!      │              │                         │
//!      └──────────────┴────────► Closed ◄───────┘
//! ```

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::sync::Arc;

use crate::config::Config;
use crate::engine::Engine;
use crate::error::{Result, SsmpError};
use crate::protocol::{frame, Response};

/// Why a connection stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Peer closed the stream between requests
    ClientClosed,

    /// Peer closed the stream inside a frame's payload
    Truncated,

    /// A header announced more than the configured maximum payload
    Oversized,

    /// Read or write failed (reset, broken pipe, ...)
    Transport,
}

/// Handler state machine
enum State {
    AwaitHeader,
    AwaitPayload { len: u32 },
    Dispatch { payload: Vec<u8> },
    Respond { response: Response },
    Closed(CloseReason),
}

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Reference to the command engine
    engine: Arc<Engine>,

    /// Peer address for logging
    peer_addr: String,

    /// Largest payload a header may announce
    max_payload_size: u32,
}

impl Connection {
    /// Create a new connection handler
    pub fn new(stream: TcpStream, engine: Arc<Engine>, config: &Config) -> Result<Self> {
        // Get peer address for logging before we split the stream
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        if config.nodelay {
            stream.set_nodelay(true)?;
        }

        // Clone stream for separate read/write handles
        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            engine,
            peer_addr,
            max_payload_size: config.max_payload_size,
        })
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Reads requests in a loop and sends one response for each.
    /// Returns when the client disconnects, sends a bad frame, or the
    /// transport fails. The stream is closed when `self` is dropped.
    pub fn handle(&mut self) -> CloseReason {
        tracing::debug!("Connection established from {}", self.peer_addr);

        let mut state = State::AwaitHeader;
        loop {
            state = match state {
                State::AwaitHeader => self.await_header(),
                State::AwaitPayload { len } => self.await_payload(len),
                State::Dispatch { payload } => State::Respond {
                    response: self.engine.handle_payload(&payload),
                },
                State::Respond { response } => match self.send_response(&response) {
                    Ok(()) => State::AwaitHeader,
                    Err(e) => self.transport_failure("write", e),
                },
                State::Closed(reason) => return reason,
            };
        }
    }

    fn await_header(&mut self) -> State {
        match frame::read_header(&mut self.reader) {
            Ok(Some(len)) if len > self.max_payload_size => {
                tracing::warn!(
                    "Client {} announced {} byte payload (max {}), closing",
                    self.peer_addr,
                    len,
                    self.max_payload_size
                );
                State::Closed(CloseReason::Oversized)
            }
            Ok(Some(len)) => State::AwaitPayload { len },
            Ok(None) => {
                tracing::debug!("Client {} disconnected", self.peer_addr);
                State::Closed(CloseReason::ClientClosed)
            }
            Err(e) => self.transport_failure("read", e.into()),
        }
    }

    fn await_payload(&mut self, len: u32) -> State {
        match frame::read_exact(&mut self.reader, len as usize) {
            Ok(Some(payload)) => State::Dispatch { payload },
            Ok(None) => {
                tracing::debug!(
                    "Client {} disconnected before sending {} payload bytes",
                    self.peer_addr,
                    len
                );
                State::Closed(CloseReason::Truncated)
            }
            Err(e) => self.transport_failure("read", e.into()),
        }
    }

    fn transport_failure(&self, op: &str, e: SsmpError) -> State {
        if e.is_disconnect() {
            tracing::debug!("Client {} went away during {}: {}", self.peer_addr, op, e);
        } else {
            tracing::warn!("Error during {} on {}: {}", op, self.peer_addr, e);
        }
        State::Closed(CloseReason::Transport)
    }

    /// Send a response to the client
    fn send_response(&mut self, response: &Response) -> Result<()> {
        let payload = response.to_payload()?;
        frame::write_frame(&mut self.writer, &payload)
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}
