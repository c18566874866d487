//! Protocol error types
//!
//! Errors that can occur when framing or decoding node events.

use thiserror::Error;

/// Errors that can occur during protocol operations
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Frame length prefix is negative
    #[error("negative frame length: {0}")]
    NegativeLength(i32),

    /// Frame exceeds the maximum payload size
    #[error("frame size {size} exceeds maximum {max}")]
    FrameTooLarge { size: usize, max: usize },

    /// Event payload failed to (de)serialize
    #[error("event decode failed: {0}")]
    Decode(#[from] serde_json::Error),

    /// Event carries an unrecognized or unset variant
    #[error("event variant does not map to a known event type")]
    UnmappedEventType,
}

impl ProtocolError {
    /// Create a frame-too-large error against [`crate::MAX_FRAME_SIZE`]
    #[inline]
    pub fn frame_too_large(size: usize) -> Self {
        Self::FrameTooLarge {
            size,
            max: crate::MAX_FRAME_SIZE,
        }
    }
}
