//! Message definitions
//!
//! Frame payloads are UTF-8 JSON arrays. Requests are arrays of string
//! tokens; responses start with a status token followed by results.

use std::fmt;

use serde::ser::{Serialize, SerializeSeq, Serializer};
use serde::Deserialize;

use crate::error::{Result, SsmpError};

// =============================================================================
// Request
// =============================================================================

/// A decoded request: `[COMMAND, arg1, arg2, ...]`, never empty
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    tokens: Vec<String>,
}

impl Request {
    /// Build a request from tokens
    pub fn new<I, S>(tokens: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: Vec<String> = tokens.into_iter().map(Into::into).collect();
        if tokens.is_empty() {
            return Err(SsmpError::InvalidPayload("request has no tokens".to_string()));
        }
        Ok(Self { tokens })
    }

    /// Decode a request payload
    ///
    /// Anything other than a non-empty JSON array of strings is rejected.
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        let tokens: Vec<String> = serde_json::from_slice(payload)
            .map_err(|e| SsmpError::InvalidPayload(e.to_string()))?;
        Self::new(tokens)
    }

    /// Encode the request as a payload
    pub fn to_payload(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.tokens)?)
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn into_tokens(self) -> Vec<String> {
        self.tokens
    }
}

// =============================================================================
// Response
// =============================================================================

/// Status token leading every response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Err,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Err => "ERR",
        }
    }
}

/// Reason carried by an `ERR` response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    NotFound,
    UnknownCommand,
    InvalidPayload,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::UnknownCommand => "UNKNOWN_COMMAND",
            ErrorCode::InvalidPayload => "INVALID_PAYLOAD",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A response produced by the server
///
/// | Variant      | Wire form              |
/// |--------------|------------------------|
/// | `Pong`       | `["OK","PONG"]`        |
/// | `Ok`         | `["OK"]`               |
/// | `Value(v)`   | `["OK", v]`            |
/// | `Count(n)`   | `["OK", n]`            |
/// | `Error(e)`   | `["ERR", e]`           |
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Pong,
    Ok,
    Value(String),
    Count(u64),
    Error(ErrorCode),
}

impl Response {
    pub fn status(&self) -> Status {
        match self {
            Response::Error(_) => Status::Err,
            _ => Status::Ok,
        }
    }

    pub fn is_error(&self) -> bool {
        self.status() == Status::Err
    }

    /// Encode the response as a payload
    pub fn to_payload(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

impl Serialize for Response {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let len = if matches!(self, Response::Ok) { 1 } else { 2 };
        let mut seq = serializer.serialize_seq(Some(len))?;
        seq.serialize_element(self.status().as_str())?;
        match self {
            Response::Pong => seq.serialize_element("PONG")?,
            Response::Ok => {}
            Response::Value(value) => seq.serialize_element(value)?,
            Response::Count(count) => seq.serialize_element(count)?,
            Response::Error(code) => seq.serialize_element(code.as_str())?,
        }
        seq.end()
    }
}

// =============================================================================
// Reply (client-side view of a response)
// =============================================================================

/// One result token in a reply
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Token {
    Count(u64),
    Text(String),
}

impl Token {
    pub fn text(s: impl Into<String>) -> Self {
        Token::Text(s.into())
    }
}

/// A response as decoded by a client, without knowledge of which
/// command produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `["OK", tokens...]`
    Ok(Vec<Token>),

    /// `["ERR", reason]`
    Err(String),
}

impl Reply {
    /// Decode a response payload
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        let tokens: Vec<Token> = serde_json::from_slice(payload)
            .map_err(|e| SsmpError::UnexpectedReply(e.to_string()))?;

        let mut tokens = tokens.into_iter();
        match tokens.next() {
            Some(Token::Text(status)) if status == Status::Ok.as_str() => {
                Ok(Reply::Ok(tokens.collect()))
            }
            Some(Token::Text(status)) if status == Status::Err.as_str() => {
                match (tokens.next(), tokens.next()) {
                    (Some(Token::Text(reason)), None) => Ok(Reply::Err(reason)),
                    _ => Err(SsmpError::UnexpectedReply(
                        "ERR reply without a single reason".to_string(),
                    )),
                }
            }
            Some(other) => Err(SsmpError::UnexpectedReply(format!(
                "unknown status token {:?}",
                other
            ))),
            None => Err(SsmpError::UnexpectedReply("empty reply".to_string())),
        }
    }
}

impl From<&Response> for Reply {
    fn from(response: &Response) -> Self {
        match response {
            Response::Pong => Reply::Ok(vec![Token::text("PONG")]),
            Response::Ok => Reply::Ok(Vec::new()),
            Response::Value(value) => Reply::Ok(vec![Token::Text(value.clone())]),
            Response::Count(count) => Reply::Ok(vec![Token::Count(*count)]),
            Response::Error(code) => Reply::Err(code.as_str().to_string()),
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut values = Vec::new();
        match self {
            Reply::Ok(tokens) => {
                values.push(serde_json::Value::from(Status::Ok.as_str()));
                for token in tokens {
                    values.push(match token {
                        Token::Count(n) => serde_json::Value::from(*n),
                        Token::Text(s) => serde_json::Value::from(s.as_str()),
                    });
                }
            }
            Reply::Err(reason) => {
                values.push(serde_json::Value::from(Status::Err.as_str()));
                values.push(serde_json::Value::from(reason.as_str()));
            }
        }
        write!(f, "{}", serde_json::Value::Array(values))
    }
}
