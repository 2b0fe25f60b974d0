//! SSMP Client
//!
//! Blocking client for the SSMP protocol. One request in flight at a time:
//! every call writes a request frame and waits for its response frame.
//!
//! ```no_run
//! use ssmp::client::Client;
//!
//! let mut client = Client::open("127.0.0.1:6380")?;
//! client.set("user:1", "Alice")?;
//! assert_eq!(client.get("user:1")?, Some("Alice".to_string()));
//! # Ok::<(), ssmp::SsmpError>(())
//! ```

use std::io::{BufReader, BufWriter};
use std::net::{Shutdown, TcpStream};

use crate::config::{DEFAULT_ADDR, DEFAULT_MAX_PAYLOAD_SIZE};
use crate::error::{Result, SsmpError};
use crate::protocol::{frame, ErrorCode, Reply, Request, Token};

struct ClientStream {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

/// Client for an SSMP server
///
/// The connection is closed by `close()` or when the client is dropped.
pub struct Client {
    addr: String,
    max_payload_size: u32,
    stream: Option<ClientStream>,
}

impl Client {
    /// Create an unconnected client for `addr` (host:port)
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            stream: None,
        }
    }

    /// Set the largest reply payload the client will accept
    ///
    /// Should be at least the server's `Config::max_payload_size`, or
    /// large values the server accepts cannot be read back.
    pub fn with_max_payload_size(mut self, size: u32) -> Self {
        self.max_payload_size = size;
        self
    }

    /// Largest reply payload the client will accept
    pub fn max_payload_size(&self) -> u32 {
        self.max_payload_size
    }

    /// Create a client and connect it right away
    pub fn open(addr: impl Into<String>) -> Result<Self> {
        let mut client = Self::new(addr);
        client.connect()?;
        Ok(client)
    }

    /// Establish the connection, replacing any existing one
    pub fn connect(&mut self) -> Result<()> {
        if self.stream.is_some() {
            self.close();
        }

        let stream = TcpStream::connect(&self.addr)?;
        stream.set_nodelay(true)?;
        let read_stream = stream.try_clone()?;

        self.stream = Some(ClientStream {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        });
        tracing::debug!("Connected to {}", self.addr);
        Ok(())
    }

    /// Close the connection, if any
    pub fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.writer.get_ref().shutdown(Shutdown::Both);
            tracing::debug!("Closed connection to {}", self.addr);
        }
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Send a raw request and wait for its reply
    ///
    /// Fails with `NotConnected` before `connect()`, and with
    /// `ConnectionClosed` if the server goes away before the reply is
    /// complete. Any failure after the request is written leaves the
    /// stream at an unknown frame boundary, so the connection is closed
    /// and later calls fail with `NotConnected`.
    pub fn call<S: AsRef<str>>(&mut self, tokens: &[S]) -> Result<Reply> {
        if self.stream.is_none() {
            return Err(SsmpError::NotConnected);
        }

        let request = Request::new(tokens.iter().map(|t| t.as_ref()))?;
        let payload = request.to_payload()?;

        match self.exchange(&payload) {
            Ok(reply) => Ok(reply),
            Err(e) => {
                let e = if e.is_disconnect() { SsmpError::ConnectionClosed } else { e };
                tracing::debug!("Request to {} failed, dropping connection: {}", self.addr, e);
                self.close();
                Err(e)
            }
        }
    }

    /// One request/response round trip on the open stream
    fn exchange(&mut self, payload: &[u8]) -> Result<Reply> {
        let stream = self.stream.as_mut().ok_or(SsmpError::NotConnected)?;

        frame::write_frame(&mut stream.writer, payload)?;

        let reply = frame::read_frame(&mut stream.reader, self.max_payload_size)?
            .ok_or(SsmpError::ConnectionClosed)?;

        Reply::from_payload(&reply)
    }

    // =========================================================================
    // Typed commands
    // =========================================================================

    pub fn ping(&mut self) -> Result<()> {
        let tokens = ok_tokens(self.call(&["PING"])?)?;
        match tokens.as_slice() {
            [Token::Text(pong)] if pong == "PONG" => Ok(()),
            other => Err(unexpected("PING", other)),
        }
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let tokens = ok_tokens(self.call(&["SET", key, value])?)?;
        match tokens.as_slice() {
            [] => Ok(()),
            other => Err(unexpected("SET", other)),
        }
    }

    /// `None` when the server answers `NOT_FOUND`
    pub fn get(&mut self, key: &str) -> Result<Option<String>> {
        let reply = self.call(&["GET", key])?;
        if let Reply::Err(reason) = &reply {
            if reason == ErrorCode::NotFound.as_str() {
                return Ok(None);
            }
        }

        let mut tokens = ok_tokens(reply)?;
        match tokens.as_mut_slice() {
            [Token::Text(value)] => Ok(Some(std::mem::take(value))),
            other => Err(unexpected("GET", other)),
        }
    }

    /// Number of keys removed (0 or 1)
    pub fn delete(&mut self, key: &str) -> Result<u64> {
        count(self.call(&["DEL", key])?, "DEL")
    }

    /// 1 if the key exists, 0 otherwise
    pub fn exists(&mut self, key: &str) -> Result<u64> {
        count(self.call(&["EXISTS", key])?, "EXISTS")
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new(DEFAULT_ADDR)
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.close();
    }
}

fn ok_tokens(reply: Reply) -> Result<Vec<Token>> {
    match reply {
        Reply::Ok(tokens) => Ok(tokens),
        Reply::Err(reason) => Err(SsmpError::Server(reason)),
    }
}

fn count(reply: Reply, command: &str) -> Result<u64> {
    let tokens = ok_tokens(reply)?;
    match tokens.as_slice() {
        [Token::Count(n)] => Ok(*n),
        other => Err(unexpected(command, other)),
    }
}

fn unexpected(command: &str, tokens: &[Token]) -> SsmpError {
    SsmpError::UnexpectedReply(format!("{} returned {:?}", command, tokens))
}
