//! Frame codec
//!
//! Length-prefixed framing, with no knowledge of what the payload means.
//!
//! ## Wire Format
//! ```text
//! ┌──────────────┬─────────────────────────────┐
//! │ Len (4, BE)  │      Payload (Len bytes)    │
//! └──────────────┴─────────────────────────────┘
//! ```

use std::io::{self, ErrorKind, Read, Write};

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Result, SsmpError};

/// Header size: 4 bytes big-endian payload length
pub const HEADER_SIZE: usize = 4;

// =============================================================================
// Encoding/Decoding
// =============================================================================

/// Encode a payload into a frame
///
/// Fails with `FrameTooLarge` when the payload does not fit a 32-bit length.
pub fn encode(payload: &[u8]) -> Result<Bytes> {
    let len = u32::try_from(payload.len()).map_err(|_| SsmpError::FrameTooLarge {
        len: payload.len() as u64,
        max: u64::from(u32::MAX),
    })?;

    let mut frame = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    frame.put_u32(len);
    frame.put_slice(payload);

    Ok(frame.freeze())
}

/// Interpret a frame header as the payload length
pub fn decode_header(header: [u8; HEADER_SIZE]) -> u32 {
    u32::from_be_bytes(header)
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read exactly `n` bytes from a stream
///
/// Returns `Ok(None)` if the peer closes the stream before `n` bytes
/// arrive. That is end-of-stream, not an error; callers decide whether it
/// was a clean disconnect or a truncated frame.
pub fn read_exact<R: Read>(reader: &mut R, n: usize) -> io::Result<Option<Vec<u8>>> {
    let mut buf = vec![0u8; n];
    let mut filled = 0;

    while filled < n {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => return Ok(None),
            Ok(read) => filled += read,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(Some(buf))
}

/// Read a frame header, or `None` on end-of-stream
pub fn read_header<R: Read>(reader: &mut R) -> io::Result<Option<u32>> {
    let Some(bytes) = read_exact(reader, HEADER_SIZE)? else {
        return Ok(None);
    };

    let mut header = [0u8; HEADER_SIZE];
    header.copy_from_slice(&bytes);
    Ok(Some(decode_header(header)))
}

/// Read one complete frame and return its payload
///
/// - `Ok(None)`: the stream ended before a header arrived
/// - `Err(FrameTooLarge)`: the header announces more than `max_payload` bytes
/// - `Err(TruncatedFrame)`: the stream ended inside the payload
pub fn read_frame<R: Read>(reader: &mut R, max_payload: u32) -> Result<Option<Vec<u8>>> {
    let Some(len) = read_header(reader)? else {
        return Ok(None);
    };

    if len > max_payload {
        return Err(SsmpError::FrameTooLarge {
            len: u64::from(len),
            max: u64::from(max_payload),
        });
    }

    match read_exact(reader, len as usize)? {
        Some(payload) => Ok(Some(payload)),
        None => Err(SsmpError::TruncatedFrame { expected: len }),
    }
}

/// Write one frame to a stream and flush it
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<()> {
    let frame = encode(payload)?;
    writer.write_all(&frame)?;
    writer.flush()?;
    Ok(())
}
