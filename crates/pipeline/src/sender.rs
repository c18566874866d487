//! Per-subscription sender
//!
//! Owns one delivery queue's drain loop: builds authenticated HTTP POSTs,
//! retries within a bounded per-call budget, and drives the subscription's
//! Active/Suspended health state, persisting every transition through the
//! repository.
//!
//! # Health state machine
//!
//! - A successful delivery resets `failures` to 0, restores Active and
//!   clears the diagnostic info.
//! - A delivery call that exhausts its retry budget counts as one failure.
//!   At `max_failures` the subscription is suspended with the last failure
//!   reason recorded, and the drain stops; the router reclaims the sender.
//! - Below the threshold the payload is re-inserted at the queue head and
//!   the drain resumes after a holdoff. Before counting the failure the
//!   sender re-reads the subscription and adopts the persisted state when
//!   its failure count is lower (external reactivation), so a manual reset
//!   is never overwritten by a stale local counter.
//!
//! Persistence failures while recording health are logged and never crash
//! the sender; local and persisted state may diverge until the next
//! successful write.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use reqwest::header::CONTENT_TYPE;

use feedhook_store::{
    CallbackAuth, Repository, Subscription, SubscriptionContext, SubscriptionId,
    SubscriptionStatus,
};

use crate::error::DeliveryError;
use crate::queue::DeliveryQueue;

/// Delivery policy knobs (mapped from the `[delivery]` config section)
#[derive(Debug, Clone)]
pub struct DeliveryOptions {
    /// Attempts per delivery call before it counts as one failure
    pub max_attempts: u32,

    /// Fixed sleep between attempts within one call
    pub retry_interval: Duration,

    /// Wait before re-attempting a failed payload at the queue head
    pub holdoff: Duration,

    /// Consecutive failed calls before the subscription is suspended
    pub max_failures: u32,

    /// Per-request timeout
    pub request_timeout: Duration,
}

impl Default for DeliveryOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_interval: Duration::from_secs(1),
            holdoff: Duration::from_secs(10),
            max_failures: 3,
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Outcome of recording a failed delivery call
#[derive(Debug, PartialEq, Eq)]
enum Health {
    /// Below the threshold; keep draining after the holdoff
    Degraded,

    /// Threshold reached; the subscription is suspended and the drain stops
    Suspended,
}

/// Per-subscription delivery worker
///
/// Created lazily by the router on the first matching event and dropped by
/// its reconciliation pass when the subscription leaves the active set.
pub struct Sender {
    /// Subscription id, cached for logging without taking the lock
    id: SubscriptionId,

    /// Pending payloads for this subscription
    queue: Arc<DeliveryQueue>,

    /// Subscription plus transient health, mutated only by this sender
    ctx: Mutex<SubscriptionContext>,

    /// Persistence seam for health updates
    repo: Arc<dyn Repository>,

    /// Shared HTTP client (connection pooling across senders)
    client: reqwest::Client,

    options: DeliveryOptions,
}

impl Sender {
    /// Create a sender for a subscription
    pub fn new(
        ctx: SubscriptionContext,
        repo: Arc<dyn Repository>,
        client: reqwest::Client,
        options: DeliveryOptions,
    ) -> Self {
        Self {
            id: ctx.id().clone(),
            queue: Arc::new(DeliveryQueue::new()),
            ctx: Mutex::new(ctx),
            repo,
            client,
            options,
        }
    }

    /// The subscription this sender delivers for
    #[inline]
    pub fn id(&self) -> &SubscriptionId {
        &self.id
    }

    /// Snapshot of the sender's local subscription state (diagnostics)
    pub fn context(&self) -> SubscriptionContext {
        self.ctx.lock().clone()
    }

    /// Adopt externally editable subscription fields from a fresh read
    ///
    /// Callback URL, auth and filters may change out of band while the
    /// sender lives; the router passes the latest context on every routed
    /// event. Health fields (status, info, failures) stay local since this
    /// sender owns them.
    pub fn refresh(&self, latest: &Subscription) {
        let mut ctx = self.ctx.lock();
        ctx.subscription.callback_url.clone_from(&latest.callback_url);
        ctx.subscription.auth.clone_from(&latest.auth);
        ctx.subscription.filters.clone_from(&latest.filters);
    }

    /// Number of payloads waiting in the delivery queue
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Whether a drain task currently owns the queue
    pub fn is_draining(&self) -> bool {
        self.queue.is_processing()
    }

    /// Enqueue a payload and ensure a drain task is running
    ///
    /// The queue keeps FIFO order; the drain is spawned only when no other
    /// task already owns the queue.
    pub fn enqueue(self: &Arc<Self>, payload: Bytes) {
        self.queue.add(payload);

        if self.queue.begin_processing() {
            let sender = Arc::clone(self);
            tokio::spawn(async move {
                sender.drain().await;
            });
        }
    }

    /// Drain loop: deliver queued payloads in order until the queue is
    /// empty or the subscription is suspended
    async fn drain(self: Arc<Self>) {
        loop {
            let Some(payload) = self.queue.pop() else {
                self.queue.end_processing();

                // An add may have raced the release; re-acquire if so,
                // otherwise another enqueue will spawn the next drain.
                if self.queue.is_empty() || !self.queue.begin_processing() {
                    return;
                }
                continue;
            };

            match self.deliver(&payload).await {
                Ok(()) => {
                    self.record_success().await;
                }
                Err(err) => {
                    tracing::warn!(
                        subscription = %self.id,
                        error = %err,
                        "delivery call failed"
                    );

                    if self.record_failure(err.to_string()).await == Health::Suspended {
                        self.queue.end_processing();
                        return;
                    }

                    // Same payload retries ahead of later items
                    self.queue.push(payload);
                    tokio::time::sleep(self.options.holdoff).await;
                }
            }
        }
    }

    /// One delivery call: up to `max_attempts` POSTs with a fixed sleep
    /// between them
    ///
    /// Success is exactly: the request completed without transport error
    /// and the endpoint answered 200.
    async fn deliver(&self, payload: &Bytes) -> Result<(), DeliveryError> {
        let (url, auth) = {
            let ctx = self.ctx.lock();
            (
                ctx.subscription.callback_url.clone(),
                ctx.subscription.auth.clone(),
            )
        };

        let mut last_error = String::new();

        for attempt in 0..self.options.max_attempts {
            if attempt > 0 {
                tokio::time::sleep(self.options.retry_interval).await;
            }

            match self.post_once(&url, &auth, payload).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::debug!(
                        subscription = %self.id,
                        attempt = attempt + 1,
                        max_attempts = self.options.max_attempts,
                        error = %e,
                        "delivery attempt failed"
                    );
                    last_error = e.to_string();
                }
            }
        }

        Err(DeliveryError::RetriesExhausted {
            attempts: self.options.max_attempts,
            last_error,
        })
    }

    /// Execute a single POST to the callback URL
    async fn post_once(
        &self,
        url: &str,
        auth: &CallbackAuth,
        payload: &Bytes,
    ) -> Result<(), DeliveryError> {
        let mut request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .timeout(self.options.request_timeout)
            .body(payload.clone());

        request = match auth {
            CallbackAuth::None => request,
            CallbackAuth::Basic { username, password } => {
                request.basic_auth(username, Some(password))
            }
            CallbackAuth::Bearer { token } => request.bearer_auth(token),
        };

        let response = request.send().await?;

        if response.status() == reqwest::StatusCode::OK {
            Ok(())
        } else {
            Err(DeliveryError::Status(response.status().as_u16()))
        }
    }

    /// Record a successful delivery: reset health if it was degraded
    async fn record_success(&self) {
        let recovered = {
            let mut ctx = self.ctx.lock();
            if ctx.failures == 0 {
                None
            } else {
                ctx.failures = 0;
                ctx.subscription.status = SubscriptionStatus::Active;
                ctx.subscription.info.clear();
                Some(ctx.clone())
            }
        };

        if let Some(snapshot) = recovered {
            tracing::info!(subscription = %self.id, "subscription recovered");
            self.persist(snapshot).await;
        }
    }

    /// Record one failed delivery call; returns whether to keep draining
    async fn record_failure(&self, reason: String) -> Health {
        // Adopt an externally reset state before counting this failure so a
        // manual reactivation is not overwritten by the stale local count
        match self.repo.read_subscription(&self.id).await {
            Ok(persisted) => {
                let mut ctx = self.ctx.lock();
                if persisted.failures < ctx.failures {
                    tracing::info!(
                        subscription = %self.id,
                        local_failures = ctx.failures,
                        persisted_failures = persisted.failures,
                        "adopting externally updated subscription state"
                    );
                    *ctx = persisted;
                }
            }
            Err(err) => {
                tracing::warn!(
                    subscription = %self.id,
                    error = %err,
                    "recovery read failed, keeping local state"
                );
            }
        }

        let (snapshot, suspended) = {
            let mut ctx = self.ctx.lock();
            ctx.failures += 1;

            if ctx.failures >= self.options.max_failures {
                ctx.subscription.status = SubscriptionStatus::Suspended;
                ctx.subscription.info = reason;
                (ctx.clone(), true)
            } else {
                (ctx.clone(), false)
            }
        };

        if suspended {
            tracing::warn!(
                subscription = %self.id,
                failures = snapshot.failures,
                "subscription suspended after consecutive failures"
            );
        }

        self.persist(snapshot).await;

        if suspended {
            Health::Suspended
        } else {
            Health::Degraded
        }
    }

    /// Persist a health snapshot; failures are logged, never fatal
    async fn persist(&self, snapshot: SubscriptionContext) {
        if let Err(err) = self.repo.update_subscription(snapshot).await {
            tracing::warn!(
                subscription = %self.id,
                error = %err,
                "failed to persist subscription health"
            );
        }
    }
}

impl std::fmt::Debug for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sender")
            .field("id", &self.id)
            .field("pending", &self.queue.len())
            .field("draining", &self.queue.is_processing())
            .finish()
    }
}

#[cfg(test)]
#[path = "sender_test.rs"]
mod sender_test;
