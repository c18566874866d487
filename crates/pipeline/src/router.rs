//! Event router
//!
//! Single consumer of the shared event queue. For each event the router
//! classifies it, asks the repository for the active subscriptions of that
//! type, projects the payload through each subscription's filter and hands
//! the result to the subscription's sender. Senders are created lazily on
//! first use and dropped when their subscription leaves the active set.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;

use feedhook_protocol::{Event, EventType};
use feedhook_store::{Repository, SubscriptionId};

use crate::sender::{DeliveryOptions, Sender};

/// Routes events from the shared queue to per-subscription senders
pub struct Router {
    repo: Arc<dyn Repository>,

    /// Shared across all senders so callbacks reuse pooled connections
    client: reqwest::Client,

    options: DeliveryOptions,

    /// Live senders, keyed by subscription id
    ///
    /// Owned by the router task alone; reconciled against the active set on
    /// every routed event.
    senders: HashMap<SubscriptionId, Arc<Sender>>,
}

impl Router {
    /// Create a router backed by the given repository
    pub fn new(repo: Arc<dyn Repository>, client: reqwest::Client, options: DeliveryOptions) -> Self {
        Self {
            repo,
            client,
            options,
            senders: HashMap::new(),
        }
    }

    /// Number of live senders (diagnostics)
    pub fn sender_count(&self) -> usize {
        self.senders.len()
    }

    /// Drain the shared event queue until all producers are gone
    pub async fn run(mut self, mut rx: mpsc::Receiver<Event>) {
        tracing::info!("router started");

        while let Some(event) = rx.recv().await {
            self.route(event).await;
        }

        tracing::info!("event queue closed, router stopping");
    }

    /// Route one event: classify, fan out, reconcile the sender registry
    ///
    /// A faulty event or a repository error drops this event and moves on;
    /// neither stops the router.
    pub async fn route(&mut self, event: Event) {
        let event_type = match event.event_type() {
            Ok(t) => t,
            Err(err) => {
                tracing::warn!(source = %event.source, error = %err, "skipping event");
                return;
            }
        };

        let active = match self.repo.get_active_subscriptions(event_type).await {
            Ok(subs) => subs,
            Err(err) => {
                tracing::warn!(
                    event_type = %event_type,
                    error = %err,
                    "subscription lookup failed, dropping event"
                );
                return;
            }
        };

        tracing::debug!(
            event_type = %event_type,
            source = %event.source,
            subscribers = active.len(),
            "routing event"
        );

        // Identical filter expressions share one projection per event
        let mut projections: HashMap<String, Bytes> = HashMap::new();

        for ctx in &active {
            let expression = ctx
                .subscription
                .filters
                .get(&event_type)
                .map(String::as_str)
                .unwrap_or("");

            let payload = match projections.get(expression) {
                Some(cached) => cached.clone(),
                None => match feedhook_filter::project(&event, expression) {
                    Ok(bytes) => {
                        let payload = Bytes::from(bytes);
                        projections.insert(expression.to_owned(), payload.clone());
                        payload
                    }
                    Err(err) => {
                        tracing::warn!(
                            subscription = %ctx.id(),
                            event_type = %event_type,
                            error = %err,
                            "filter projection failed, skipping subscription"
                        );
                        continue;
                    }
                },
            };

            let sender = match self.senders.entry(ctx.id().clone()) {
                Entry::Occupied(entry) => {
                    let sender = entry.into_mut();
                    // Pick up out-of-band edits (URL, auth, filters) without
                    // waiting for the sender to be reaped and recreated
                    sender.refresh(&ctx.subscription);
                    sender
                }
                Entry::Vacant(entry) => {
                    tracing::debug!(subscription = %ctx.id(), "creating sender");
                    entry.insert(Arc::new(Sender::new(
                        ctx.clone(),
                        Arc::clone(&self.repo),
                        self.client.clone(),
                        self.options.clone(),
                    )))
                }
            };

            sender.enqueue(payload);
        }

        self.reconcile(event_type, &active);
    }

    /// Drop senders for this event type whose subscription is no longer in
    /// the active set (deleted, or suspended by its own sender)
    fn reconcile(&mut self, event_type: EventType, active: &[feedhook_store::SubscriptionContext]) {
        self.senders.retain(|id, sender| {
            let ctx = sender.context();
            if !ctx.subscription.wants(event_type) {
                return true;
            }

            let keep = active.iter().any(|a| a.id() == id);
            if !keep {
                tracing::debug!(subscription = %id, "dropping sender, no longer active");
            }
            keep
        });
    }
}

#[cfg(test)]
#[path = "router_test.rs"]
mod router_test;
