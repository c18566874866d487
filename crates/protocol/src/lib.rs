//! Feedhook wire protocol
//!
//! Defines the event model produced by the upstream node and the framing
//! used on the ingestion socket.
//!
//! # Protocol
//!
//! Each frame is a 4-byte little-endian signed length prefix followed by
//! exactly that many bytes of JSON-serialized [`Event`]:
//!
//! ```text
//! [4 bytes: length (little-endian i32)][N bytes: JSON Event]
//! ```
//!
//! There is no end marker; a stream ends when the peer closes the
//! connection. A clean close at a frame boundary is a normal end of stream.

mod error;
mod event;
mod frame;

pub use error::ProtocolError;
pub use event::{Event, EventPayload, EventType, MessageLevel};
pub use frame::{decode_event, encode_frame, peek_frame_len};

/// Length prefix size (4 bytes, little-endian i32)
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Maximum frame payload size (16MB)
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;
