//! Group cache invalidation from admin events
//!
//! Membership events carry the affected group as their representation, so
//! the group's path (and its ancestors) can be invalidated precisely. Group
//! create/update/delete events, and membership events whose representation
//! has no usable path, fall back to clearing all membership.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::event_bus::EventReceiver;
use crate::listener::EventHandler;
use crate::service::GroupCache;
use crate::{AdminEvent, OperationType, ResourceType};

/// What an event means for cached membership
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invalidation {
    /// Event doesn't affect group membership
    None,
    /// Drop this group and its ancestors
    Path(String),
    /// Drop all membership
    All,
}

impl Invalidation {
    pub fn for_event(event: &AdminEvent) -> Self {
        match event.resource_type {
            Some(ResourceType::GroupMembership) => event
                .representation
                .as_ref()
                .and_then(|r| r.as_value().get("path"))
                .and_then(|path| path.as_str())
                .filter(|path| !path.is_empty())
                .map_or(Self::All, |path| Self::Path(path.to_string())),
            Some(ResourceType::Group) => Self::All,
            Some(ResourceType::User) if event.operation_type == Some(OperationType::Delete) => {
                Self::All
            }
            _ => Self::None,
        }
    }
}

/// Keeps a `GroupCache` consistent with admin events
pub struct GroupCacheInvalidator {
    cache: Arc<GroupCache>,
}

impl GroupCacheInvalidator {
    pub fn new(cache: Arc<GroupCache>) -> Self {
        Self { cache }
    }

    /// Apply an event to the cache, returning what was done
    pub fn apply(&self, event: &AdminEvent) -> Invalidation {
        let invalidation = Invalidation::for_event(event);
        match &invalidation {
            Invalidation::None => {
                debug!(event_kind = %event.kind(), "[CacheInvalidator] Ignoring event");
            }
            Invalidation::Path(path) => self.cache.invalidate(Some(path)),
            Invalidation::All => self.cache.invalidate(None),
        }
        invalidation
    }

    /// Start consuming events from the bus
    pub fn start(self: Arc<Self>, mut events: EventReceiver) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("[CacheInvalidator] Started listening for admin events");

            while let Some(event) = events.recv().await {
                self.apply(&event);
            }

            info!("[CacheInvalidator] Stopped listening for admin events");
        })
    }
}

#[async_trait]
impl EventHandler for GroupCacheInvalidator {
    async fn handle(&self, event: AdminEvent) -> anyhow::Result<()> {
        self.apply(&event);
        Ok(())
    }
}
