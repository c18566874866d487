//! Subscription store
//!
//! The subscription model and the [`Repository`] seam the delivery pipeline
//! persists health updates through. Subscriptions are created and edited by
//! an external management API; the pipeline only reads them and updates
//! status, info and failure counts.
//!
//! The in-memory backend here is the default wiring and the test double.
//! SQL-backed repositories are external collaborators implementing the same
//! trait; any implementation must be safe under concurrent calls from
//! multiple senders.

mod error;
mod memory;
mod subscription;

pub use error::{Result, StoreError};
pub use memory::MemoryRepository;
pub use subscription::{
    CallbackAuth, Subscription, SubscriptionContext, SubscriptionId, SubscriptionStatus,
};

use async_trait::async_trait;
use feedhook_protocol::EventType;

/// Persistence contract required by the delivery pipeline
///
/// Implementations provide their own internal synchronization.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Store a new subscription
    async fn create_subscription(
        &self,
        ctx: SubscriptionContext,
    ) -> Result<SubscriptionContext>;

    /// Read a subscription by id
    ///
    /// # Errors
    ///
    /// [`StoreError::SubscriptionNotFound`] if the id is absent.
    async fn read_subscription(&self, id: &SubscriptionId) -> Result<SubscriptionContext>;

    /// Replace a stored subscription (health updates go through here)
    async fn update_subscription(
        &self,
        ctx: SubscriptionContext,
    ) -> Result<SubscriptionContext>;

    /// Remove a subscription
    async fn delete_subscription(&self, id: &SubscriptionId) -> Result<()>;

    /// Subscriptions that are Active and carry a filter entry for this type
    async fn get_active_subscriptions(
        &self,
        event_type: EventType,
    ) -> Result<Vec<SubscriptionContext>>;
}
