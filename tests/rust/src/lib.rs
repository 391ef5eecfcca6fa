//! Shared test utilities and fixtures for krs integration tests.

pub use krs_core::{AdminEvent, GroupInfo, OperationType, ResourceType};

/// Mock transport, directory and handler implementations
pub mod mocks;
pub use mocks::{MockGroupDirectory, MockTransport, RecordingHandler};

/// Event testing utilities
pub mod events {
    use krs_core::{AdminEvent, EventReceiver};
    use std::time::Duration;

    /// Collect events from a bus receiver until the timeout elapses
    pub async fn collect_events(mut rx: EventReceiver, timeout: Duration) -> Vec<AdminEvent> {
        let mut events = Vec::new();
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                break;
            }

            match tokio::time::timeout(remaining, rx.recv()).await {
                Ok(Some(event)) => events.push(event),
                Ok(None) => break, // Channel closed
                Err(_) => break,   // Timeout
            }
        }

        events
    }

    /// Poll `condition` until it holds or the timeout elapses
    pub async fn wait_until<F>(timeout: Duration, condition: F) -> bool
    where
        F: Fn() -> bool,
    {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if condition() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        condition()
    }
}

/// Test fixture utilities
pub mod fixtures {
    use super::*;
    use krs_core::{group_name, GroupAttributes, Representation};
    use serde_json::{json, Value};

    /// Group record for a path, with no attributes or subgroups
    pub fn test_group(id: &str, path: &str) -> GroupInfo {
        GroupInfo {
            id: id.to_string(),
            name: group_name(path).to_string(),
            path: path.to_string(),
            attributes: GroupAttributes::new(),
            sub_groups: Vec::new(),
        }
    }

    /// Group record as returned by the Keycloak admin API
    pub fn group_json(id: &str, path: &str, sub_groups: Vec<Value>) -> Value {
        json!({
            "id": id,
            "name": group_name(path),
            "path": path,
            "attributes": {},
            "subGroups": sub_groups,
        })
    }

    /// Admin event envelope as published by Keycloak
    ///
    /// `representation` is embedded as an encoded JSON string, the way the
    /// event listener plugin sends it.
    pub fn admin_event_body(
        resource_type: &str,
        operation_type: &str,
        resource_path: &str,
        representation: Option<Value>,
    ) -> Value {
        let mut body = json!({
            "time": 1_700_000_000_000_i64,
            "realmId": "IceCube",
            "authDetails": {
                "realmId": "master",
                "clientId": "rest-access",
                "userId": "00000000-0000-0000-0000-000000000001",
                "ipAddress": "10.0.0.1"
            },
            "resourceType": resource_type,
            "operationType": operation_type,
            "resourcePath": resource_path,
        });
        if let Some(representation) = representation {
            body["representation"] = Value::String(representation.to_string());
        }
        body
    }

    /// Decoded membership event for a group path
    pub fn membership_event(operation: OperationType, group_path: &str) -> AdminEvent {
        AdminEvent {
            resource_type: Some(ResourceType::GroupMembership),
            operation_type: Some(operation),
            resource_path: Some(format!("users/u1/groups/{}", group_name(group_path))),
            representation: Some(Representation::Decoded(json!({
                "id": "g1",
                "name": group_name(group_path),
                "path": group_path,
            }))),
            ..AdminEvent::default()
        }
    }

    /// Decoded event of any resource type, with no representation
    pub fn bare_event(resource: ResourceType, operation: OperationType) -> AdminEvent {
        AdminEvent {
            resource_type: Some(resource),
            operation_type: Some(operation),
            ..AdminEvent::default()
        }
    }
}
