//! Dedup window tests
//!
//! With a window set, a burst of messages collapses into one handler call
//! carrying the most recent message.

use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tests::{MockTransport, RecordingHandler};
use tokio::time::sleep;

use krs_core::{EventListener, ListenerConfig};

async fn started(dedup_secs: u64) -> (EventListener, Arc<MockTransport>, Arc<RecordingHandler>) {
    let transport = Arc::new(MockTransport::new());
    let handler = Arc::new(RecordingHandler::new());
    let listener = EventListener::new(
        ListenerConfig::default().with_dedup_secs(dedup_secs),
        transport.clone(),
        handler.clone(),
    );
    listener.start().await.unwrap();
    (listener, transport, handler)
}

#[tokio::test(start_paused = true)]
async fn test_burst_delivers_only_latest_message() {
    let (listener, transport, handler) = started(2).await;

    transport.publish_json(&json!({"id": 1}));
    sleep(Duration::from_millis(200)).await;
    transport.publish_json(&json!({"id": 2}));
    sleep(Duration::from_millis(200)).await;
    transport.publish_json(&json!({"id": 3}));

    sleep(Duration::from_millis(2100)).await;

    assert_eq!(handler.values(), vec![json!({"id": 3})]);
    assert_eq!(transport.ack_count(), 3);

    listener.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_nothing_handled_before_window_elapses() {
    let (listener, transport, handler) = started(2).await;

    transport.publish_json(&json!({"id": 1}));
    sleep(Duration::from_millis(1500)).await;

    assert_eq!(handler.count(), 0);
    assert_eq!(transport.ack_count(), 0);

    sleep(Duration::from_millis(1000)).await;
    assert_eq!(handler.values(), vec![json!({"id": 1})]);
    assert_eq!(transport.ack_count(), 1);

    listener.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_window_is_measured_from_first_message() {
    let (listener, transport, handler) = started(2).await;

    transport.publish_json(&json!({"id": 1}));
    sleep(Duration::from_millis(1900)).await;
    transport.publish_json(&json!({"id": 2}));
    sleep(Duration::from_millis(300)).await;

    // The second message did not extend the window
    assert_eq!(handler.values(), vec![json!({"id": 2})]);

    listener.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_separate_bursts_are_handled_separately() {
    let (listener, transport, handler) = started(1).await;

    transport.publish_json(&json!({"id": 1}));
    sleep(Duration::from_millis(1500)).await;
    transport.publish_json(&json!({"id": 2}));
    sleep(Duration::from_millis(1500)).await;

    assert_eq!(handler.values(), vec![json!({"id": 1}), json!({"id": 2})]);
    assert_eq!(transport.ack_count(), 2);

    listener.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_superseded_messages_acked_before_latest() {
    let (listener, transport, _handler) = started(1).await;

    transport.publish_json(&json!({"id": 1}));
    sleep(Duration::from_millis(100)).await;
    transport.publish_json(&json!({"id": 2}));
    sleep(Duration::from_millis(1500)).await;

    let acked: Vec<serde_json::Value> = transport
        .acked()
        .iter()
        .map(|body| serde_json::from_slice(body).unwrap())
        .collect();
    assert_eq!(acked, vec![json!({"id": 1}), json!({"id": 2})]);

    listener.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_stop_drops_pending_burst_unacked() {
    let (listener, transport, handler) = started(2).await;

    transport.publish_json(&json!({"id": 1}));
    transport.publish_json(&json!({"id": 2}));
    sleep(Duration::from_millis(100)).await;

    listener.stop().await;
    sleep(Duration::from_secs(5)).await;

    assert_eq!(handler.count(), 0);
    assert_eq!(transport.ack_count(), 0);
    assert_eq!(transport.close_count(), 1);
}
