//! TCP event ingress
//!
//! Accepts connections from event-producing nodes and reads length-prefixed
//! JSON frames: a 4-byte little-endian signed payload length followed by
//! the event JSON. Decoded events go into the shared bounded queue; a full
//! queue blocks the reader, which is the transport's only backpressure.
//!
//! A malformed length prefix (negative or oversized) means the stream can
//! no longer be framed, so the connection is closed. A payload that fails
//! to decode is also fatal for its connection; the listener itself keeps
//! accepting either way.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::{Buf, BytesMut};
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use feedhook_protocol::{decode_event, peek_frame_len, Event, LENGTH_PREFIX_SIZE};

/// Default read buffer capacity per connection (64KB)
const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// TCP ingress configuration
#[derive(Debug, Clone)]
pub struct TcpIngressConfig {
    /// Bind address (e.g., "127.0.0.1")
    pub address: String,

    /// Listen port
    pub port: u16,

    /// Initial read buffer capacity per connection
    pub buffer_size: usize,
}

impl Default for TcpIngressConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".into(),
            port: 8040,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl TcpIngressConfig {
    /// The socket address to bind to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// Ingress counters, updated by the accept loop and connection handlers
#[derive(Debug, Default)]
struct IngressMetrics {
    connections_total: AtomicU64,
    connections_active: AtomicU64,
    events_received: AtomicU64,
    bytes_received: AtomicU64,
    frames_malformed: AtomicU64,
}

impl IngressMetrics {
    fn snapshot(&self) -> IngressMetricsSnapshot {
        IngressMetricsSnapshot {
            connections_total: self.connections_total.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            events_received: self.events_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            frames_malformed: self.frames_malformed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of the ingress counters
#[derive(Debug, Clone, Copy)]
pub struct IngressMetricsSnapshot {
    pub connections_total: u64,
    pub connections_active: u64,
    pub events_received: u64,
    pub bytes_received: u64,
    pub frames_malformed: u64,
}

/// TCP ingress errors
#[derive(Debug, thiserror::Error)]
pub enum TcpIngressError {
    /// Failed to bind the listen socket
    #[error("failed to bind to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O error on an established connection
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Length-prefixed TCP event listener
pub struct TcpIngress {
    config: TcpIngressConfig,

    /// Producer side of the shared event queue
    tx: mpsc::Sender<Event>,

    metrics: Arc<IngressMetrics>,
}

impl TcpIngress {
    /// Create an ingress feeding the given queue
    pub fn new(config: TcpIngressConfig, tx: mpsc::Sender<Event>) -> Self {
        Self {
            config,
            tx,
            metrics: Arc::new(IngressMetrics::default()),
        }
    }

    /// Snapshot the ingress counters
    pub fn metrics(&self) -> IngressMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Bind and serve until cancelled
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), TcpIngressError> {
        let (_, serve) = self.bind(cancel).await?;
        serve.await
    }

    /// Bind the listen socket, reporting the bound address and a detached
    /// accept-loop future
    ///
    /// The split lets callers binding port 0 learn the ephemeral port before
    /// serving.
    pub async fn bind(
        &self,
        cancel: CancellationToken,
    ) -> Result<
        (
            SocketAddr,
            impl Future<Output = Result<(), TcpIngressError>> + Send + 'static,
        ),
        TcpIngressError,
    > {
        let bind_addr = self.config.bind_address();

        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| TcpIngressError::Bind {
                address: bind_addr.clone(),
                source: e,
            })?;
        let local_addr = listener.local_addr()?;

        tracing::info!(address = %local_addr, "event ingress listening");

        let tx = self.tx.clone();
        let metrics = Arc::clone(&self.metrics);
        let buffer_size = self.config.buffer_size;

        Ok((
            local_addr,
            accept_loop(listener, tx, metrics, buffer_size, cancel),
        ))
    }
}

async fn accept_loop(
    listener: TcpListener,
    tx: mpsc::Sender<Event>,
    metrics: Arc<IngressMetrics>,
    buffer_size: usize,
    cancel: CancellationToken,
) -> Result<(), TcpIngressError> {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                break;
            }
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        metrics.connections_total.fetch_add(1, Ordering::Relaxed);
                        metrics.connections_active.fetch_add(1, Ordering::Relaxed);

                        let handler = ConnectionHandler {
                            tx: tx.clone(),
                            metrics: Arc::clone(&metrics),
                            peer_addr,
                            buffer_size,
                            cancel: cancel.child_token(),
                        };

                        tokio::spawn(async move {
                            let peer = handler.peer_addr;
                            let metrics = Arc::clone(&handler.metrics);
                            if let Err(e) = handler.handle(stream).await {
                                tracing::debug!(peer = %peer, error = %e, "ingress connection error");
                            }
                            metrics.connections_active.fetch_sub(1, Ordering::Relaxed);
                        });
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "ingress accept error");
                    }
                }
            }
        }
    }

    tracing::info!("event ingress stopped");
    Ok(())
}

/// Handles a single producer connection
struct ConnectionHandler {
    tx: mpsc::Sender<Event>,
    metrics: Arc<IngressMetrics>,
    peer_addr: SocketAddr,
    buffer_size: usize,
    cancel: CancellationToken,
}

impl ConnectionHandler {
    async fn handle(&self, mut stream: TcpStream) -> Result<(), TcpIngressError> {
        let mut buf = BytesMut::with_capacity(self.buffer_size);

        loop {
            // Drain every complete frame currently buffered
            loop {
                match peek_frame_len(&buf) {
                    Ok(Some(payload_len)) => {
                        let payload = &buf[LENGTH_PREFIX_SIZE..LENGTH_PREFIX_SIZE + payload_len];

                        match decode_event(payload) {
                            Ok(event) => {
                                self.metrics.events_received.fetch_add(1, Ordering::Relaxed);
                                // Blocks while the shared queue is full; the
                                // producer stalls instead of events dropping
                                if self.tx.send(event).await.is_err() {
                                    tracing::debug!(
                                        peer = %self.peer_addr,
                                        "event queue closed, dropping connection"
                                    );
                                    return Ok(());
                                }
                            }
                            Err(e) => {
                                self.metrics.frames_malformed.fetch_add(1, Ordering::Relaxed);
                                tracing::warn!(
                                    peer = %self.peer_addr,
                                    error = %e,
                                    "undecodable frame, closing connection"
                                );
                                return Ok(());
                            }
                        }

                        buf.advance(LENGTH_PREFIX_SIZE + payload_len);
                    }
                    Ok(None) => break,
                    Err(e) => {
                        self.metrics.frames_malformed.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!(
                            peer = %self.peer_addr,
                            error = %e,
                            "invalid frame header, closing connection"
                        );
                        return Ok(());
                    }
                }
            }

            tokio::select! {
                _ = self.cancel.cancelled() => {
                    return Ok(());
                }
                read_result = stream.read_buf(&mut buf) => {
                    let n = read_result?;
                    if n == 0 {
                        // Clean EOF; anything short of a full frame is discarded
                        if !buf.is_empty() {
                            tracing::debug!(
                                peer = %self.peer_addr,
                                leftover = buf.len(),
                                "connection closed mid-frame"
                            );
                        }
                        return Ok(());
                    }
                    self.metrics.bytes_received.fetch_add(n as u64, Ordering::Relaxed);
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "tcp_test.rs"]
mod tcp_test;
