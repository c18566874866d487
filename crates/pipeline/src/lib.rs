//! Delivery pipeline
//!
//! The core of the broker: a single [`Router`] drains the shared event
//! queue, classifies each event, queries the repository for the matching
//! active subscriptions, and hands a per-subscription projection to that
//! subscription's [`Sender`]. Each sender owns one [`DeliveryQueue`] and its
//! drain loop: authenticated HTTP POSTs with a bounded inner retry budget,
//! head re-insertion on failure, and Active/Suspended health transitions
//! persisted through the repository.
//!
//! # Ordering
//!
//! Within one subscription, delivery order equals enqueue order, including
//! retries: a failed payload is re-attempted before later payloads proceed.
//! No ordering holds across subscriptions.

mod error;
mod queue;
mod router;
mod sender;

pub use error::DeliveryError;
pub use queue::DeliveryQueue;
pub use router::Router;
pub use sender::{DeliveryOptions, Sender};

#[cfg(test)]
mod testutil;
