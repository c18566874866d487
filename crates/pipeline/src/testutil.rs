//! Shared test support: a minimal HTTP endpoint that records POST bodies
//! and answers with scripted status codes.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// A received request: headers of interest plus the raw body
#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub authorization: Option<String>,
    pub body: Vec<u8>,
}

/// Minimal HTTP/1.1 server for exercising senders
///
/// Each incoming POST is recorded and answered with the next scripted
/// status, falling back to the default status once the script runs out.
pub struct MockEndpoint {
    addr: std::net::SocketAddr,
    requests: mpsc::UnboundedReceiver<ReceivedRequest>,
    scripted: Arc<Mutex<VecDeque<u16>>>,
    default_status: Arc<AtomicU16>,
}

impl MockEndpoint {
    /// Bind on an ephemeral port and start serving
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind mock endpoint");
        let addr = listener.local_addr().expect("failed to get addr");

        let (tx, rx) = mpsc::unbounded_channel();
        let scripted: Arc<Mutex<VecDeque<u16>>> = Arc::new(Mutex::new(VecDeque::new()));
        let default_status = Arc::new(AtomicU16::new(200));

        let script = Arc::clone(&scripted);
        let fallback = Arc::clone(&default_status);
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let tx = tx.clone();
                let script = Arc::clone(&script);
                let fallback = Arc::clone(&fallback);
                tokio::spawn(async move {
                    serve_connection(stream, tx, script, fallback).await;
                });
            }
        });

        Self {
            addr,
            requests: rx,
            scripted,
            default_status,
        }
    }

    /// Callback URL pointing at this endpoint
    pub fn url(&self) -> String {
        format!("http://{}/callback", self.addr)
    }

    /// Queue a one-shot status for the next unscripted request
    pub fn push_status(&self, status: u16) {
        self.scripted.lock().push_back(status);
    }

    /// Status answered once the script is exhausted
    pub fn set_default_status(&self, status: u16) {
        self.default_status.store(status, Ordering::SeqCst);
    }

    /// Wait for the next recorded request
    pub async fn recv(&mut self) -> ReceivedRequest {
        self.requests
            .recv()
            .await
            .expect("mock endpoint channel closed")
    }

    /// Wait for the next recorded request, failing after the timeout
    pub async fn recv_timeout(&mut self, timeout: std::time::Duration) -> ReceivedRequest {
        tokio::time::timeout(timeout, self.recv())
            .await
            .expect("timed out waiting for request")
    }

    /// True if no request arrives within the window
    pub async fn assert_no_request(&mut self, window: std::time::Duration) {
        let outcome = tokio::time::timeout(window, self.requests.recv()).await;
        assert!(outcome.is_err(), "unexpected request: {:?}", outcome);
    }
}

async fn serve_connection(
    mut stream: tokio::net::TcpStream,
    tx: mpsc::UnboundedSender<ReceivedRequest>,
    scripted: Arc<Mutex<VecDeque<u16>>>,
    default_status: Arc<AtomicU16>,
) {
    let mut buf = Vec::new();

    loop {
        // Read until the header terminator
        let header_end = loop {
            if let Some(pos) = find_header_end(&buf) {
                break pos;
            }
            let mut chunk = [0u8; 4096];
            match stream.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
            }
        };

        let headers = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let body_len = content_length(&headers);
        let body_start = header_end + 4;

        while buf.len() < body_start + body_len {
            let mut chunk = [0u8; 4096];
            match stream.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
            }
        }

        let body = buf[body_start..body_start + body_len].to_vec();
        buf.drain(..body_start + body_len);

        let _ = tx.send(ReceivedRequest {
            authorization: header_value(&headers, "authorization"),
            body,
        });

        let status = scripted
            .lock()
            .pop_front()
            .unwrap_or_else(|| default_status.load(Ordering::SeqCst));

        let response = format!(
            "HTTP/1.1 {} {}\r\ncontent-length: 0\r\n\r\n",
            status,
            reason(status)
        );
        if stream.write_all(response.as_bytes()).await.is_err() {
            return;
        }
    }
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn content_length(headers: &str) -> usize {
    header_value(headers, "content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

fn header_value(headers: &str, name: &str) -> Option<String> {
    headers.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        if key.trim().eq_ignore_ascii_case(name) {
            Some(value.trim().to_string())
        } else {
            None
        }
    })
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}
