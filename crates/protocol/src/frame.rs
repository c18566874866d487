//! Frame codec
//!
//! Length-prefixed framing for the ingestion socket. The peek/advance split
//! lets connection handlers process frames in place from a single read
//! buffer without copying: peek the length, decode the payload slice, then
//! advance the buffer past the whole frame.

use bytes::BytesMut;

use crate::error::ProtocolError;
use crate::event::Event;
use crate::{LENGTH_PREFIX_SIZE, MAX_FRAME_SIZE};

/// Peek at the next frame's payload length without consuming the buffer
///
/// Returns:
/// - `Ok(Some(len))` if a complete frame is buffered (len = payload size,
///   not including the prefix)
/// - `Ok(None)` if more data is needed
/// - `Err` if the length prefix is invalid
#[inline]
pub fn peek_frame_len(buf: &BytesMut) -> Result<Option<usize>, ProtocolError> {
    if buf.len() < LENGTH_PREFIX_SIZE {
        return Ok(None);
    }

    let raw = i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
    if raw < 0 {
        return Err(ProtocolError::NegativeLength(raw));
    }

    let payload_len = raw as usize;
    if payload_len > MAX_FRAME_SIZE {
        return Err(ProtocolError::frame_too_large(payload_len));
    }

    if buf.len() < LENGTH_PREFIX_SIZE + payload_len {
        return Ok(None);
    }

    Ok(Some(payload_len))
}

/// Decode one frame payload into an [`Event`]
#[inline]
pub fn decode_event(payload: &[u8]) -> Result<Event, ProtocolError> {
    Ok(serde_json::from_slice(payload)?)
}

/// Encode an [`Event`] into a complete frame (prefix + payload)
///
/// The producer side of the protocol; feedhook itself only decodes, but
/// tests and node-side tooling share this encoder.
pub fn encode_frame(event: &Event) -> Result<Vec<u8>, ProtocolError> {
    let payload = serde_json::to_vec(event)?;
    if payload.len() > MAX_FRAME_SIZE {
        return Err(ProtocolError::frame_too_large(payload.len()));
    }

    let mut frame = Vec::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
    frame.extend_from_slice(&(payload.len() as i32).to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

#[cfg(test)]
#[path = "frame_test.rs"]
mod frame_test;
