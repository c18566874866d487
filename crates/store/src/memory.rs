//! In-memory repository
//!
//! Default backend for single-process deployments and the test double for
//! the pipeline. A `parking_lot::RwLock` keeps reads cheap; every method
//! returns before any await point, so the lock is never held across one.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use feedhook_protocol::EventType;

use crate::error::{Result, StoreError};
use crate::subscription::{SubscriptionContext, SubscriptionId, SubscriptionStatus};
use crate::Repository;

/// Thread-safe in-memory subscription repository
#[derive(Debug, Default)]
pub struct MemoryRepository {
    inner: RwLock<HashMap<SubscriptionId, SubscriptionContext>>,
}

impl MemoryRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored subscriptions
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Whether the repository is empty
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn create_subscription(
        &self,
        ctx: SubscriptionContext,
    ) -> Result<SubscriptionContext> {
        let mut inner = self.inner.write();
        inner.insert(ctx.id().clone(), ctx.clone());
        Ok(ctx)
    }

    async fn read_subscription(&self, id: &SubscriptionId) -> Result<SubscriptionContext> {
        self.inner
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(id))
    }

    async fn update_subscription(
        &self,
        ctx: SubscriptionContext,
    ) -> Result<SubscriptionContext> {
        let mut inner = self.inner.write();
        if !inner.contains_key(ctx.id()) {
            return Err(StoreError::not_found(ctx.id()));
        }
        inner.insert(ctx.id().clone(), ctx.clone());
        Ok(ctx)
    }

    async fn delete_subscription(&self, id: &SubscriptionId) -> Result<()> {
        self.inner
            .write()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(id))
    }

    async fn get_active_subscriptions(
        &self,
        event_type: EventType,
    ) -> Result<Vec<SubscriptionContext>> {
        let inner = self.inner.read();
        Ok(inner
            .values()
            .filter(|ctx| {
                ctx.subscription.status == SubscriptionStatus::Active
                    && ctx.subscription.wants(event_type)
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscription::Subscription;

    fn ctx(id: &str, types: &[EventType]) -> SubscriptionContext {
        let mut sub = Subscription::new(id, format!("http://localhost/hooks/{id}"));
        for ty in types {
            sub.filters.insert(*ty, String::new());
        }
        SubscriptionContext::new(sub)
    }

    #[tokio::test]
    async fn test_crud_round_trip() {
        let repo = MemoryRepository::new();
        let created = repo
            .create_subscription(ctx("sub-1", &[EventType::BlockCommit]))
            .await
            .unwrap();

        let read = repo.read_subscription(created.id()).await.unwrap();
        assert_eq!(read, created);

        let mut updated = read.clone();
        updated.failures = 2;
        repo.update_subscription(updated.clone()).await.unwrap();
        let read = repo.read_subscription(created.id()).await.unwrap();
        assert_eq!(read.failures, 2);

        repo.delete_subscription(created.id()).await.unwrap();
        assert!(repo.read_subscription(created.id()).await.is_err());
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let repo = MemoryRepository::new();
        let err = repo
            .read_subscription(&SubscriptionId::new("ghost"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::SubscriptionNotFound { .. }));
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let repo = MemoryRepository::new();
        let err = repo
            .update_subscription(ctx("ghost", &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::SubscriptionNotFound { .. }));
    }

    #[tokio::test]
    async fn test_active_set_filters_by_event_type() {
        let repo = MemoryRepository::new();
        repo.create_subscription(ctx("a", &[EventType::BlockCommit]))
            .await
            .unwrap();
        repo.create_subscription(ctx("b", &[EventType::NodeMessage]))
            .await
            .unwrap();
        repo.create_subscription(ctx(
            "c",
            &[EventType::BlockCommit, EventType::NodeMessage],
        ))
        .await
        .unwrap();

        let mut ids: Vec<String> = repo
            .get_active_subscriptions(EventType::BlockCommit)
            .await
            .unwrap()
            .iter()
            .map(|c| c.id().as_str().to_string())
            .collect();
        ids.sort();
        assert_eq!(ids, ["a", "c"]);
    }

    #[tokio::test]
    async fn test_active_set_excludes_suspended() {
        let repo = MemoryRepository::new();
        let mut suspended = ctx("s", &[EventType::BlockCommit]);
        suspended.subscription.status = SubscriptionStatus::Suspended;
        repo.create_subscription(suspended).await.unwrap();
        repo.create_subscription(ctx("a", &[EventType::BlockCommit]))
            .await
            .unwrap();

        let active = repo
            .get_active_subscriptions(EventType::BlockCommit)
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id().as_str(), "a");
    }
}
