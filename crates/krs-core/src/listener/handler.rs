//! Event handler contract

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

use crate::event_bus::EventSender;
use crate::AdminEvent;

/// Receives decoded admin events from the listener
///
/// Errors (and panics) are logged by the listener and never propagate; the
/// message is acknowledged either way.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: AdminEvent) -> anyhow::Result<()>;
}

/// Adapter turning an async closure into an `EventHandler`
pub struct FnHandler<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> EventHandler for FnHandler<F>
where
    F: Fn(AdminEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn handle(&self, event: AdminEvent) -> anyhow::Result<()> {
        (self.f)(event).await
    }
}

/// Wrap an async closure as a shared handler
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn EventHandler>
where
    F: Fn(AdminEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(FnHandler { f })
}

/// Handler that forwards every event onto the event bus
pub struct BusHandler {
    sender: EventSender,
}

impl BusHandler {
    pub fn new(sender: EventSender) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl EventHandler for BusHandler {
    async fn handle(&self, event: AdminEvent) -> anyhow::Result<()> {
        self.sender.emit(event);
        Ok(())
    }
}
