//! Direct delivery tests
//!
//! Without a dedup window every message reaches the handler, and every
//! message is acknowledged whatever the handler does with it.

use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tests::fixtures::admin_event_body;
use tests::{MockTransport, RecordingHandler};
use tokio::time::sleep;

use krs_core::{EventHandler, EventListener, ListenerConfig, OperationType, ResourceType};

async fn started(handler: Arc<dyn EventHandler>) -> (EventListener, Arc<MockTransport>) {
    let transport = Arc::new(MockTransport::new());
    let listener = EventListener::new(ListenerConfig::default(), transport.clone(), handler);
    listener.start().await.unwrap();
    (listener, transport)
}

// =============================================================================
// Handling
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_every_message_is_handled() {
    let handler = Arc::new(RecordingHandler::new());
    let (listener, transport) = started(handler.clone()).await;

    for id in 1..=3 {
        transport.publish_json(&json!({ "id": id }));
    }
    sleep(Duration::from_millis(100)).await;

    let mut ids: Vec<i64> = handler
        .events()
        .iter()
        .filter_map(|e| e.get("id").and_then(|v| v.as_i64()))
        .collect();
    ids.sort();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(transport.ack_count(), 3);

    listener.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_keycloak_event_decoded() {
    let handler = Arc::new(RecordingHandler::new());
    let (listener, transport) = started(handler.clone()).await;

    transport.publish_json(&admin_event_body(
        "GROUP_MEMBERSHIP",
        "CREATE",
        "users/u1/groups/g1",
        Some(json!({"id": "g1", "name": "fooU", "path": "/inst/fooU"})),
    ));
    sleep(Duration::from_millis(100)).await;

    let events = handler.events();
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.resource_type, Some(ResourceType::GroupMembership));
    assert_eq!(event.operation_type, Some(OperationType::Create));
    assert_eq!(event.realm_id.as_deref(), Some("IceCube"));
    assert_eq!(event.representation_field("path"), Some(&json!("/inst/fooU")));

    listener.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_undecodable_representation_kept_raw() {
    let handler = Arc::new(RecordingHandler::new());
    let (listener, transport) = started(handler.clone()).await;

    transport.publish_json(&json!({"resourceType": "USER", "representation": "{not json"}));
    sleep(Duration::from_millis(100)).await;

    let events = handler.events();
    assert_eq!(events.len(), 1);
    let representation = events[0].representation.as_ref().unwrap();
    assert!(!representation.is_decoded());
    assert_eq!(representation.as_value(), &json!("{not json"));
    assert_eq!(transport.ack_count(), 1);

    listener.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_unusual_field_types_delivered_unchanged() {
    let handler = Arc::new(RecordingHandler::new());
    let (listener, transport) = started(handler.clone()).await;

    let mistyped = json!({"id": 1, "time": "2024-01-01", "error": {"code": 7}, "realmId": 5});
    let nulls = json!({"id": 2, "error": null, "representation": null});
    transport.publish_json(&mistyped);
    sleep(Duration::from_millis(100)).await;
    transport.publish_json(&nulls);
    sleep(Duration::from_millis(100)).await;

    assert_eq!(handler.values(), vec![mistyped, nulls]);
    assert_eq!(transport.ack_count(), 2);

    listener.stop().await;
}

// =============================================================================
// Failures are acknowledged and swallowed
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_invalid_json_acked_without_handling() {
    let handler = Arc::new(RecordingHandler::new());
    let (listener, transport) = started(handler.clone()).await;

    transport.publish("not json at all");
    sleep(Duration::from_millis(100)).await;

    assert_eq!(handler.count(), 0);
    assert_eq!(transport.acked(), vec![b"not json at all".to_vec()]);

    // The listener keeps going
    transport.publish_json(&json!({"id": 2}));
    sleep(Duration::from_millis(100)).await;
    assert_eq!(handler.values(), vec![json!({"id": 2})]);

    listener.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_handler_error_still_acks() {
    let handler = Arc::new(RecordingHandler::failing());
    let (listener, transport) = started(handler.clone()).await;

    transport.publish_json(&json!({"id": 1}));
    sleep(Duration::from_millis(100)).await;
    transport.publish_json(&json!({"id": 2}));
    sleep(Duration::from_millis(100)).await;

    assert_eq!(handler.count(), 2);
    assert_eq!(transport.ack_count(), 2);
    assert!(listener.is_running().await);

    listener.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_handler_panic_still_acks() {
    let handler = Arc::new(RecordingHandler::panicking());
    let (listener, transport) = started(handler.clone()).await;

    transport.publish_json(&json!({"id": 1}));
    sleep(Duration::from_millis(100)).await;
    transport.publish_json(&json!({"id": 2}));
    sleep(Duration::from_millis(100)).await;

    assert_eq!(handler.count(), 2);
    assert_eq!(transport.ack_count(), 2);
    assert!(listener.is_running().await);

    listener.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_handler_panic_in_dedup_mode_still_acks() {
    let handler = Arc::new(RecordingHandler::panicking());
    let transport = Arc::new(MockTransport::new());
    let listener = EventListener::new(
        ListenerConfig::default().with_dedup_secs(1),
        transport.clone(),
        handler.clone(),
    );
    listener.start().await.unwrap();

    transport.publish_json(&json!({"id": 1}));
    transport.publish_json(&json!({"id": 2}));
    sleep(Duration::from_millis(1500)).await;

    assert_eq!(handler.count(), 1);
    assert_eq!(transport.ack_count(), 2);

    listener.stop().await;
}
