use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use feedhook_protocol::{encode_frame, Event, EventPayload};

use crate::tcp::{TcpIngress, TcpIngressConfig};

fn test_event(height: u64) -> Event {
    Event {
        source: "node-1".into(),
        timestamp: 1_700_000_000,
        payload: EventPayload::BlockCommit {
            block_height: height,
            block_hash: "0011aabb".into(),
            entry_count: 3,
        },
    }
}

async fn start_ingress(
    queue_capacity: usize,
) -> (
    TcpIngress,
    std::net::SocketAddr,
    mpsc::Receiver<Event>,
    CancellationToken,
) {
    let (tx, rx) = mpsc::channel(queue_capacity);
    let config = TcpIngressConfig {
        address: "127.0.0.1".into(),
        port: 0,
        ..TcpIngressConfig::default()
    };
    let ingress = TcpIngress::new(config, tx);
    let cancel = CancellationToken::new();

    let (addr, serve) = ingress
        .bind(cancel.clone())
        .await
        .expect("failed to bind ingress");
    tokio::spawn(serve);

    (ingress, addr, rx, cancel)
}

async fn recv_event(rx: &mut mpsc::Receiver<Event>) -> Event {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event queue closed")
}

#[tokio::test]
async fn test_receives_framed_event() {
    let (ingress, addr, mut rx, _cancel) = start_ingress(16).await;

    let mut stream = TcpStream::connect(addr).await.expect("failed to connect");
    let frame = encode_frame(&test_event(42)).expect("failed to encode");
    stream.write_all(&frame).await.expect("failed to write");

    let received = recv_event(&mut rx).await;
    assert_eq!(received, test_event(42));

    let metrics = ingress.metrics();
    assert_eq!(metrics.events_received, 1);
    assert_eq!(metrics.connections_total, 1);
    assert_eq!(metrics.frames_malformed, 0);
}

#[tokio::test]
async fn test_reassembles_split_writes() {
    let (_ingress, addr, mut rx, _cancel) = start_ingress(16).await;

    let mut stream = TcpStream::connect(addr).await.expect("failed to connect");
    let frame = encode_frame(&test_event(7)).expect("failed to encode");

    // Dribble the frame one fragment at a time
    for chunk in frame.chunks(3) {
        stream.write_all(chunk).await.expect("failed to write");
        stream.flush().await.expect("failed to flush");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    assert_eq!(recv_event(&mut rx).await, test_event(7));
}

#[tokio::test]
async fn test_multiple_frames_in_one_write() {
    let (_ingress, addr, mut rx, _cancel) = start_ingress(16).await;

    let mut buf = Vec::new();
    for height in 1..=3 {
        buf.extend_from_slice(&encode_frame(&test_event(height)).expect("failed to encode"));
    }

    let mut stream = TcpStream::connect(addr).await.expect("failed to connect");
    stream.write_all(&buf).await.expect("failed to write");

    for height in 1..=3 {
        assert_eq!(recv_event(&mut rx).await, test_event(height));
    }
}

#[tokio::test]
async fn test_negative_length_closes_connection_not_listener() {
    let (ingress, addr, mut rx, _cancel) = start_ingress(16).await;

    // Negative little-endian length prefix
    let mut stream = TcpStream::connect(addr).await.expect("failed to connect");
    stream
        .write_all(&(-1i32).to_le_bytes())
        .await
        .expect("failed to write");

    // Peer observes the close
    let mut probe = [0u8; 1];
    let read = tokio::time::timeout(
        Duration::from_secs(5),
        tokio::io::AsyncReadExt::read(&mut stream, &mut probe),
    )
    .await
    .expect("timed out waiting for close")
    .expect("read failed");
    assert_eq!(read, 0);

    // The listener still serves new connections
    let mut stream = TcpStream::connect(addr).await.expect("failed to reconnect");
    let frame = encode_frame(&test_event(1)).expect("failed to encode");
    stream.write_all(&frame).await.expect("failed to write");
    assert_eq!(recv_event(&mut rx).await, test_event(1));

    assert_eq!(ingress.metrics().frames_malformed, 1);
}

#[tokio::test]
async fn test_undecodable_payload_closes_connection() {
    let (ingress, addr, mut rx, _cancel) = start_ingress(16).await;

    let payload = b"not json at all";
    let mut frame = (payload.len() as i32).to_le_bytes().to_vec();
    frame.extend_from_slice(payload);

    let mut stream = TcpStream::connect(addr).await.expect("failed to connect");
    stream.write_all(&frame).await.expect("failed to write");

    let mut probe = [0u8; 1];
    let read = tokio::time::timeout(
        Duration::from_secs(5),
        tokio::io::AsyncReadExt::read(&mut stream, &mut probe),
    )
    .await
    .expect("timed out waiting for close")
    .expect("read failed");
    assert_eq!(read, 0);

    assert_eq!(ingress.metrics().frames_malformed, 1);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_concurrent_connections() {
    let (ingress, addr, mut rx, _cancel) = start_ingress(256).await;

    let mut handles = Vec::new();
    for conn in 0..20u64 {
        handles.push(tokio::spawn(async move {
            let mut stream = TcpStream::connect(addr).await.expect("failed to connect");
            for i in 0..5u64 {
                let frame =
                    encode_frame(&test_event(conn * 100 + i)).expect("failed to encode");
                stream.write_all(&frame).await.expect("failed to write");
            }
        }));
    }
    for handle in handles {
        handle.await.expect("writer task failed");
    }

    let mut heights = Vec::new();
    for _ in 0..100 {
        let event = recv_event(&mut rx).await;
        if let EventPayload::BlockCommit { block_height, .. } = event.payload {
            heights.push(block_height);
        }
    }
    heights.sort_unstable();
    heights.dedup();
    assert_eq!(heights.len(), 100);
    assert_eq!(ingress.metrics().events_received, 100);
}

#[tokio::test]
async fn test_full_queue_blocks_instead_of_dropping() {
    // Capacity 1: the reader must stall until the consumer drains
    let (_ingress, addr, mut rx, _cancel) = start_ingress(1).await;

    let mut stream = TcpStream::connect(addr).await.expect("failed to connect");
    let mut buf = Vec::new();
    for height in 1..=5 {
        buf.extend_from_slice(&encode_frame(&test_event(height)).expect("failed to encode"));
    }
    stream.write_all(&buf).await.expect("failed to write");

    // Slow consumer still sees every event in order
    for height in 1..=5 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(recv_event(&mut rx).await, test_event(height));
    }
}
