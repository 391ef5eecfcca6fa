//! # KRS Core Library
//!
//! Admin event handling and group lookups shared by the KRS services.
//!
//! ## Modules
//!
//! - `domain` - Admin events, group records and configuration
//! - `directory` - Remote group directory trait
//! - `transport` - Message transport traits (subscription, delivery, ack)
//! - `listener` - Deduplicating admin event listener
//! - `service` - Group hierarchy cache and its TTL stores
//! - `event_bus` - In-process fan-out of delivered admin events
//! - `consumers` - Event consumers (cache invalidation)
//! - `error` - Error types

pub mod consumers;
pub mod directory;
pub mod domain;
pub mod error;
pub mod event_bus;
pub mod listener;
pub mod service;
pub mod transport;

// Re-export commonly used types
pub use domain::*;
pub use error::{DirectoryError, ListenerError, TransportError};

pub use consumers::{GroupCacheInvalidator, Invalidation};
pub use directory::{DirectoryResult, GroupDirectory};
pub use event_bus::{create_shared_event_bus, EventBus, EventReceiver, EventSender, SharedEventBus};
pub use listener::{handler_fn, BusHandler, EventHandler, EventListener};
pub use service::{GroupCache, GroupCacheStats, TtlStore};
pub use transport::{Acknowledger, Delivery, MessageTransport, Subscription, Topology};
