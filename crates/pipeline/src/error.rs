//! Pipeline error types

use thiserror::Error;

/// Errors from one delivery call to a subscription endpoint
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Request never completed (connect failure, timeout, ...)
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Endpoint answered with a non-200 status
    #[error("unexpected response status {0}")]
    Status(u16),

    /// Inner retry budget exhausted without a successful attempt
    ///
    /// The rendered message becomes the subscription's diagnostic info when
    /// the failure suspends it.
    #[error("all {attempts} delivery attempts failed: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}
