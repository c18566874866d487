//! Event ingestion
//!
//! Listeners that receive node events and feed them into the shared event
//! queue. The only transport is TCP with length-prefixed JSON frames; see
//! [`TcpIngress`].

mod tcp;

pub use tcp::{IngressMetricsSnapshot, TcpIngress, TcpIngressConfig, TcpIngressError};
