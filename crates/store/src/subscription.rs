//! Subscription model
//!
//! A subscription is a registered webhook destination: callback URL,
//! authentication, delivery health, and a per-event-type filter map.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use feedhook_protocol::EventType;

/// Unique subscription identifier
///
/// Opaque string assigned by the management API.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(String);

impl SubscriptionId {
    /// Create an id from a string
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubscriptionId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Authentication attached to outbound delivery calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CallbackAuth {
    /// Plain HTTP, no Authorization header
    None,

    /// HTTP Basic authentication
    Basic { username: String, password: String },

    /// Bearer token authentication
    Bearer { token: String },
}

/// Delivery health state of a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Receiving deliveries
    Active,

    /// Halted after consecutive delivery failures; requires external
    /// reactivation
    Suspended,
}

/// A registered webhook destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    /// Unique identifier
    pub id: SubscriptionId,

    /// Destination URL for event POSTs
    pub callback_url: String,

    /// Authentication policy for deliveries
    pub auth: CallbackAuth,

    /// Current health state
    pub status: SubscriptionStatus,

    /// Diagnostic text; empty while healthy, last failure reason when not
    pub info: String,

    /// Per-event-type filter expressions
    ///
    /// The subscription receives only event types present in this map. An
    /// empty expression delivers the full event JSON.
    pub filters: HashMap<EventType, String>,
}

impl Subscription {
    /// Create an active subscription with no filters
    pub fn new(id: impl Into<SubscriptionId>, callback_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            callback_url: callback_url.into(),
            auth: CallbackAuth::None,
            status: SubscriptionStatus::Active,
            info: String::new(),
            filters: HashMap::new(),
        }
    }

    /// Set the authentication policy
    #[must_use]
    pub fn with_auth(mut self, auth: CallbackAuth) -> Self {
        self.auth = auth;
        self
    }

    /// Add a filter entry for an event type
    #[must_use]
    pub fn with_filter(mut self, event_type: EventType, expression: impl Into<String>) -> Self {
        self.filters.insert(event_type, expression.into());
        self
    }

    /// Whether this subscription wants the given event type
    #[inline]
    pub fn wants(&self, event_type: EventType) -> bool {
        self.filters.contains_key(&event_type)
    }
}

impl From<String> for SubscriptionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Runtime pairing of a subscription with its transient delivery health
///
/// `failures` counts consecutive failed deliveries. It is mutated only by
/// the subscription's sender and resets to zero on a successful delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionContext {
    /// The subscription itself
    pub subscription: Subscription,

    /// Consecutive-failure counter
    pub failures: u32,
}

impl SubscriptionContext {
    /// Wrap a subscription with a zeroed failure counter
    pub fn new(subscription: Subscription) -> Self {
        Self {
            subscription,
            failures: 0,
        }
    }

    /// The subscription id
    #[inline]
    pub fn id(&self) -> &SubscriptionId {
        &self.subscription.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_builder() {
        let sub = Subscription::new("sub-1", "http://localhost:9000/hook")
            .with_auth(CallbackAuth::Bearer {
                token: "t0k3n".into(),
            })
            .with_filter(EventType::BlockCommit, "")
            .with_filter(EventType::ChainRegistration, "payload { chain_id }");

        assert_eq!(sub.id.as_str(), "sub-1");
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert!(sub.info.is_empty());
        assert!(sub.wants(EventType::BlockCommit));
        assert!(sub.wants(EventType::ChainRegistration));
        assert!(!sub.wants(EventType::NodeMessage));
    }

    #[test]
    fn test_context_starts_healthy() {
        let ctx = SubscriptionContext::new(Subscription::new("sub-2", "http://example/hook"));
        assert_eq!(ctx.failures, 0);
        assert_eq!(ctx.id().as_str(), "sub-2");
    }

    #[test]
    fn test_auth_serde_tagging() {
        let auth = CallbackAuth::Basic {
            username: "u".into(),
            password: "p".into(),
        };
        let json = serde_json::to_value(&auth).unwrap();
        assert_eq!(json["type"], "basic");
    }
}
