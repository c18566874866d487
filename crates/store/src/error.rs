//! Store error types

use thiserror::Error;

use crate::subscription::SubscriptionId;

/// Result type for repository operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur against a subscription repository
#[derive(Debug, Error)]
pub enum StoreError {
    /// No subscription exists with the given id
    #[error("subscription '{id}' not found")]
    SubscriptionNotFound { id: SubscriptionId },

    /// Backend-specific failure (connection loss, constraint violation, ...)
    #[error("repository backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Create a not-found error
    #[inline]
    pub fn not_found(id: &SubscriptionId) -> Self {
        Self::SubscriptionNotFound { id: id.clone() }
    }
}
