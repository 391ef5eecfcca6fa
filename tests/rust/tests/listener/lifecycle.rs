//! Start / stop lifecycle tests

use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tests::{MockTransport, RecordingHandler};
use tokio::time::sleep;

use krs_core::{EventListener, ListenerConfig, ListenerError, TransportError};

fn listener(transport: Arc<MockTransport>, handler: Arc<RecordingHandler>) -> EventListener {
    EventListener::new(ListenerConfig::default(), transport, handler)
}

#[tokio::test]
async fn test_start_declares_configured_topology() {
    let transport = Arc::new(MockTransport::new());
    let config = ListenerConfig::default()
        .with_exchange("events")
        .with_routing_key("KK.EVENT.ADMIN.IceCube.#")
        .with_prefetch_count(10);
    let listener = EventListener::new(config, transport.clone(), Arc::new(RecordingHandler::new()));

    listener.start().await.unwrap();

    let topology = transport.last_topology().unwrap();
    assert_eq!(topology.exchange, "events");
    assert_eq!(topology.routing_key, "KK.EVENT.ADMIN.IceCube.#");
    assert_eq!(topology.prefetch_count, 10);

    listener.stop().await;
}

#[tokio::test]
async fn test_second_start_rejected() {
    let transport = Arc::new(MockTransport::new());
    let listener = listener(transport.clone(), Arc::new(RecordingHandler::new()));

    listener.start().await.unwrap();
    let result = listener.start().await;

    assert!(matches!(result, Err(ListenerError::AlreadyStarted)));
    assert_eq!(transport.open_count(), 1);

    listener.stop().await;
}

#[tokio::test]
async fn test_failed_connect_leaves_listener_stopped() {
    let transport = Arc::new(MockTransport::failing());
    let listener = listener(transport.clone(), Arc::new(RecordingHandler::new()));

    let result = listener.start().await;

    assert!(matches!(
        result,
        Err(ListenerError::Transport(TransportError::Connect(_)))
    ));
    assert!(!listener.is_running().await);
}

#[tokio::test]
async fn test_stop_closes_subscription_once() {
    let transport = Arc::new(MockTransport::new());
    let listener = listener(transport.clone(), Arc::new(RecordingHandler::new()));

    listener.start().await.unwrap();
    assert!(listener.is_running().await);

    listener.stop().await;
    listener.stop().await;

    assert!(!listener.is_running().await);
    assert_eq!(transport.close_count(), 1);
}

#[tokio::test]
async fn test_stop_without_start_is_noop() {
    let transport = Arc::new(MockTransport::new());
    let listener = listener(transport.clone(), Arc::new(RecordingHandler::new()));

    listener.stop().await;

    assert_eq!(transport.close_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_restart_resumes_delivery() {
    let transport = Arc::new(MockTransport::new());
    let handler = Arc::new(RecordingHandler::new());
    let listener = listener(transport.clone(), handler.clone());

    listener.start().await.unwrap();
    listener.stop().await;

    // Published while stopped; picked up after the restart
    transport.publish_json(&json!({"id": 1}));
    listener.start().await.unwrap();
    sleep(Duration::from_millis(100)).await;

    assert_eq!(handler.values(), vec![json!({"id": 1})]);
    assert_eq!(transport.open_count(), 2);

    listener.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_ended_subscription_allows_restart() {
    let transport = Arc::new(MockTransport::new());
    let handler = Arc::new(RecordingHandler::new());
    let listener = listener(transport.clone(), handler.clone());

    listener.start().await.unwrap();
    sleep(Duration::from_millis(10)).await;
    transport.disconnect();
    sleep(Duration::from_millis(10)).await;

    assert!(!listener.is_running().await);
    assert_eq!(transport.close_count(), 1);

    listener.start().await.unwrap();
    assert!(listener.is_running().await);
    transport.publish_json(&json!({"id": 7}));
    sleep(Duration::from_millis(100)).await;

    assert_eq!(handler.values(), vec![json!({"id": 7})]);
    assert_eq!(transport.open_count(), 2);

    listener.stop().await;
}
