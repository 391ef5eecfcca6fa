//! Event Bus - In-process fan-out of admin events
//!
//! The listener delivers each event to exactly one handler. When several
//! consumers care about the same events (cache invalidation, audit output,
//! ...), the listener's handler is a `BusHandler` and consumers subscribe here.
//!
//! ```text
//! ┌──────────────┐    ┌───────────────────────────────┐
//! │ EventListener│───▶│ EventBus (broadcast channel)  │
//! │ (BusHandler) │    │                               │
//! └──────────────┘    │  ├─ GroupCacheInvalidator     │
//!                     │  └─ ... other consumers       │
//!                     └───────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let event_bus = EventBus::new();
//! let handler = Arc::new(BusHandler::new(event_bus.sender()));
//! let receiver = event_bus.subscribe();
//!
//! while let Some(event) = receiver.recv().await { ... }
//! ```

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::AdminEvent;

/// Default channel capacity for the event bus
const DEFAULT_CAPACITY: usize = 256;

/// Event Bus - hub for admin event distribution
///
/// Uses a broadcast channel so every consumer receives every event.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<AdminEvent>,
}

impl EventBus {
    /// Create a new event bus with default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a new event bus with custom capacity
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Get a sender for emitting events
    pub fn sender(&self) -> EventSender {
        EventSender::new(self.sender.clone())
    }

    /// Subscribe to events emitted after this call
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver::new(self.sender.subscribe())
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Event Sender - emits admin events onto the bus
#[derive(Clone)]
pub struct EventSender {
    sender: broadcast::Sender<AdminEvent>,
}

impl EventSender {
    fn new(sender: broadcast::Sender<AdminEvent>) -> Self {
        Self { sender }
    }

    /// Emit an event
    ///
    /// Returns the number of receivers. 0 means nobody is subscribed, which
    /// is not an error.
    pub fn emit(&self, event: AdminEvent) -> usize {
        let kind = event.kind();
        match self.sender.send(event) {
            Ok(count) => {
                debug!(event_kind = %kind, receivers = count, "[EventBus] Emitted event");
                count
            }
            Err(_) => {
                debug!(event_kind = %kind, "[EventBus] No receivers for event");
                0
            }
        }
    }

    /// Check if there are any subscribers
    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

/// Event Receiver - consumer end of the bus
pub struct EventReceiver {
    receiver: broadcast::Receiver<AdminEvent>,
}

impl EventReceiver {
    fn new(receiver: broadcast::Receiver<AdminEvent>) -> Self {
        Self { receiver }
    }

    /// Receive the next event
    ///
    /// Returns `None` once the channel is closed. Lag is logged and skipped.
    pub async fn recv(&mut self) -> Option<AdminEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(
                        skipped_events = skipped,
                        "[EventBus] Receiver lagged, skipped {} events", skipped
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("[EventBus] Channel closed");
                    return None;
                }
            }
        }
    }
}

/// Shared event bus for application-wide use
pub type SharedEventBus = Arc<EventBus>;

/// Create a shared event bus
pub fn create_shared_event_bus() -> SharedEventBus {
    Arc::new(EventBus::new())
}
