//! Mock implementations for testing
//!
//! In-memory transport, group directory and event handler for fast,
//! isolated tests without a broker or a Keycloak server.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};

use krs_core::{
    flatten_groups, Acknowledger, AdminEvent, Delivery, DirectoryError, DirectoryResult,
    EventHandler, GroupDirectory, GroupInfo, GroupListing, MessageTransport, Subscription,
    Topology, TransportError,
};

// ============================================================================
// MockTransport
// ============================================================================

#[derive(Default)]
struct TransportState {
    acked: Mutex<Vec<Vec<u8>>>,
    topologies: Mutex<Vec<Topology>>,
    opened: AtomicUsize,
    closed: AtomicUsize,
    fail_open: AtomicBool,
    disconnect: Notify,
}

/// In-memory broker: `publish` queues a delivery for the open subscription
///
/// The queue outlives subscriptions, so messages published while the
/// listener is stopped are delivered after the next `start`.
pub struct MockTransport {
    state: Arc<TransportState>,
    sender: mpsc::UnboundedSender<Vec<u8>>,
    receiver: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Vec<u8>>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            state: Arc::new(TransportState::default()),
            sender,
            receiver: Arc::new(tokio::sync::Mutex::new(receiver)),
        }
    }

    /// Make every `open` fail with a connection error
    pub fn failing() -> Self {
        let transport = Self::new();
        transport.state.fail_open.store(true, Ordering::SeqCst);
        transport
    }

    pub fn publish(&self, body: impl Into<Vec<u8>>) {
        // The receiver lives as long as the transport
        let _ = self.sender.send(body.into());
    }

    pub fn publish_json(&self, value: &Value) {
        self.publish(value.to_string());
    }

    /// End the open subscription as a dropped broker connection would
    pub fn disconnect(&self) {
        self.state.disconnect.notify_one();
    }

    /// Bodies of every acknowledged delivery, in ack order
    pub fn acked(&self) -> Vec<Vec<u8>> {
        self.state.acked.lock().clone()
    }

    pub fn ack_count(&self) -> usize {
        self.state.acked.lock().len()
    }

    pub fn open_count(&self) -> usize {
        self.state.opened.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.state.closed.load(Ordering::SeqCst)
    }

    /// Topology requested by the most recent `open`
    pub fn last_topology(&self) -> Option<Topology> {
        self.state.topologies.lock().last().cloned()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageTransport for MockTransport {
    async fn open(&self, topology: &Topology) -> Result<Box<dyn Subscription>, TransportError> {
        if self.state.fail_open.load(Ordering::SeqCst) {
            return Err(TransportError::Connect("connection refused".to_string()));
        }

        self.state.opened.fetch_add(1, Ordering::SeqCst);
        self.state.topologies.lock().push(topology.clone());
        Ok(Box::new(MockSubscription {
            state: self.state.clone(),
            receiver: self.receiver.clone(),
            routing_key: topology.routing_key.clone(),
            closed: false,
        }))
    }
}

struct MockSubscription {
    state: Arc<TransportState>,
    receiver: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Vec<u8>>>>,
    routing_key: String,
    closed: bool,
}

#[async_trait]
impl Subscription for MockSubscription {
    async fn next_delivery(&mut self) -> Option<Delivery> {
        if self.closed {
            return None;
        }

        let mut receiver = self.receiver.lock().await;
        let body = tokio::select! {
            body = receiver.recv() => body?,
            _ = self.state.disconnect.notified() => {
                self.closed = true;
                return None;
            }
        };
        drop(receiver);
        let acker = MockAcker {
            state: self.state.clone(),
            body: body.clone(),
        };
        Some(Delivery::new(self.routing_key.clone(), body, Box::new(acker)))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.closed = true;
        self.state.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct MockAcker {
    state: Arc<TransportState>,
    body: Vec<u8>,
}

#[async_trait]
impl Acknowledger for MockAcker {
    async fn ack(&self) -> Result<(), TransportError> {
        self.state.acked.lock().push(self.body.clone());
        Ok(())
    }
}

// ============================================================================
// MockGroupDirectory
// ============================================================================

/// Group directory backed by a map, counting every remote call
#[derive(Default)]
pub struct MockGroupDirectory {
    groups: Mutex<HashMap<String, GroupInfo>>,
    members: Mutex<HashMap<String, Vec<String>>>,
    fail: AtomicBool,
    pub list_calls: AtomicUsize,
    pub info_calls: AtomicUsize,
    pub info_by_id_calls: AtomicUsize,
    pub membership_calls: AtomicUsize,
}

impl MockGroupDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_group(self, group: GroupInfo, members: &[&str]) -> Self {
        self.set_members(&group.id, members);
        self.groups.lock().insert(group.path.clone(), group);
        self
    }

    /// Replace the members of a group (by id)
    pub fn set_members(&self, group_id: &str, members: &[&str]) {
        self.members.lock().insert(
            group_id.to_string(),
            members.iter().map(|m| m.to_string()).collect(),
        );
    }

    /// Make every call fail with a network error until cleared
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn check(&self) -> DirectoryResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DirectoryError::Network("connection reset".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl GroupDirectory for MockGroupDirectory {
    async fn list_groups(&self) -> DirectoryResult<GroupListing> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let groups: Vec<GroupInfo> = self.groups.lock().values().cloned().collect();
        Ok(flatten_groups(&groups))
    }

    async fn group_info(&self, path: &str) -> DirectoryResult<GroupInfo> {
        self.info_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.groups
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| DirectoryError::group_not_found(path))
    }

    async fn group_info_by_id(&self, group_id: &str) -> DirectoryResult<GroupInfo> {
        self.info_by_id_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.groups
            .lock()
            .values()
            .find(|g| g.id == group_id)
            .cloned()
            .ok_or_else(|| DirectoryError::group_not_found(group_id))
    }

    async fn group_membership_by_id(&self, group_id: &str) -> DirectoryResult<Vec<String>> {
        self.membership_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.members
            .lock()
            .get(group_id)
            .cloned()
            .ok_or_else(|| DirectoryError::group_not_found(group_id))
    }
}

// ============================================================================
// RecordingHandler
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Behavior {
    Succeed,
    Fail,
    Panic,
}

/// Handler that records every event it receives
///
/// `failing()` and `panicking()` record the event first, then error or
/// panic.
pub struct RecordingHandler {
    events: Mutex<Vec<AdminEvent>>,
    behavior: Behavior,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            behavior: Behavior::Succeed,
        }
    }

    /// Return an error for every event
    pub fn failing() -> Self {
        Self {
            behavior: Behavior::Fail,
            ..Self::new()
        }
    }

    /// Panic for every event
    pub fn panicking() -> Self {
        Self {
            behavior: Behavior::Panic,
            ..Self::new()
        }
    }

    pub fn events(&self) -> Vec<AdminEvent> {
        self.events.lock().clone()
    }

    /// Received events as plain JSON mappings
    pub fn values(&self) -> Vec<Value> {
        self.events.lock().iter().map(AdminEvent::to_value).collect()
    }

    pub fn count(&self) -> usize {
        self.events.lock().len()
    }
}

impl Default for RecordingHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventHandler for RecordingHandler {
    async fn handle(&self, event: AdminEvent) -> anyhow::Result<()> {
        self.events.lock().push(event);
        match self.behavior {
            Behavior::Succeed => Ok(()),
            Behavior::Fail => anyhow::bail!("handler rejected event"),
            Behavior::Panic => panic!("handler exploded"),
        }
    }
}
