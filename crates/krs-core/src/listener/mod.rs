//! Admin Event Listener
//!
//! Keeps one subscription on a topic exchange and hands every admin event to
//! a caller-supplied handler.
//!
//! **Delivery modes:**
//! - **Direct** (no dedup window): each message is decoded and handled on its
//!   own task; the broker's prefetch limit bounds how many run at once.
//! - **Coalescing** (dedup window set): messages accumulate in a burst; the
//!   first one schedules a timer, and when it fires only the most recent
//!   message is handled. The superseded ones are acknowledged at that point.
//!
//! Every message is acknowledged after processing, whatever the handler did.
//! Decode failures, handler errors and handler panics are logged and
//! swallowed.

mod burst;
mod handler;

pub use handler::{handler_fn, BusHandler, EventHandler, FnHandler};

use futures::FutureExt;
use parking_lot::Mutex;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::domain::ListenerConfig;
use crate::error::ListenerError;
use crate::transport::{Delivery, MessageTransport, Subscription};
use crate::AdminEvent;

use burst::BurstState;

/// Handle to the running consume loop
struct Running {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Deduplicating admin event listener
pub struct EventListener {
    config: ListenerConfig,
    transport: Arc<dyn MessageTransport>,
    handler: Arc<dyn EventHandler>,
    burst: Arc<Mutex<BurstState>>,
    running: tokio::sync::Mutex<Option<Running>>,
}

impl EventListener {
    pub fn new(
        config: ListenerConfig,
        transport: Arc<dyn MessageTransport>,
        handler: Arc<dyn EventHandler>,
    ) -> Self {
        Self {
            config,
            transport,
            handler,
            burst: Arc::new(Mutex::new(BurstState::Idle)),
            running: tokio::sync::Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ListenerConfig {
        &self.config
    }

    /// Open the subscription and start consuming
    ///
    /// Fails with `AlreadyStarted` if the listener is running.
    pub async fn start(&self) -> Result<(), ListenerError> {
        let mut running = self.running.lock().await;
        if let Some(current) = running.as_ref() {
            if !current.task.is_finished() {
                return Err(ListenerError::AlreadyStarted);
            }
            // Subscription ended on its own; clear it before reopening
            *running = None;
            self.abort_burst();
        }

        let topology = self.config.topology();
        info!(
            exchange = %topology.exchange,
            routing_key = %topology.routing_key,
            prefetch = topology.prefetch_count,
            dedup_secs = self.config.dedup.map(|d| d.as_secs_f64()),
            "[EventListener] Starting"
        );

        let subscription = self.transport.open(&topology).await?;

        let cancel = CancellationToken::new();
        let dispatcher = Dispatcher {
            handler: self.handler.clone(),
            dedup: self.config.dedup,
            burst: self.burst.clone(),
        };
        let task = tokio::spawn(consume(subscription, dispatcher, cancel.clone()));

        *running = Some(Running { cancel, task });
        Ok(())
    }

    /// Stop consuming and close the connection
    ///
    /// No-op if the listener isn't running. A pending burst is dropped
    /// unacknowledged and left to the broker's redelivery.
    pub async fn stop(&self) {
        let Some(running) = self.running.lock().await.take() else {
            return;
        };

        info!("[EventListener] Stopping");
        running.cancel.cancel();
        if let Err(e) = running.task.await {
            warn!(error = %e, "[EventListener] Consume loop ended abnormally");
        }

        self.abort_burst();
    }

    /// True while the consume loop is alive
    ///
    /// Turns false on its own if the subscription ends, without `stop`.
    pub async fn is_running(&self) -> bool {
        self.running
            .lock()
            .await
            .as_ref()
            .is_some_and(|running| !running.task.is_finished())
    }

    fn abort_burst(&self) {
        let dropped = self.burst.lock().abort();
        if dropped > 0 {
            debug!(dropped, "[EventListener] Dropped pending burst");
        }
    }
}

async fn consume(
    mut subscription: Box<dyn Subscription>,
    dispatcher: Dispatcher,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            delivery = subscription.next_delivery() => match delivery {
                Some(delivery) => dispatcher.dispatch(delivery),
                None => {
                    warn!("[EventListener] Subscription ended");
                    break;
                }
            },
        }
    }

    if let Err(e) = subscription.close().await {
        warn!(error = %e, "[EventListener] Failed to close subscription");
    }
    debug!("[EventListener] Consume loop finished");
}

/// Routes deliveries to the direct or coalescing path
#[derive(Clone)]
struct Dispatcher {
    handler: Arc<dyn EventHandler>,
    dedup: Option<Duration>,
    burst: Arc<Mutex<BurstState>>,
}

impl Dispatcher {
    fn dispatch(&self, delivery: Delivery) {
        match self.dedup {
            None => {
                let handler = self.handler.clone();
                tokio::spawn(async move { process(handler.as_ref(), delivery).await });
            }
            Some(window) => self.enqueue(delivery, window),
        }
    }

    fn enqueue(&self, delivery: Delivery, window: Duration) {
        let mut burst = self.burst.lock();
        if let Some(first) = burst.push(delivery) {
            let timer = tokio::spawn(self.clone().flush_after(window));
            burst.begin(first, timer);
        }
    }

    async fn flush_after(self, window: Duration) {
        tokio::time::sleep(window).await;

        let Some(burst) = self.burst.lock().take() else {
            return;
        };

        if !burst.discarded.is_empty() {
            debug!(
                discarded = burst.discarded.len(),
                "[EventListener] Coalesced burst"
            );
        }
        for superseded in burst.discarded {
            if let Err(e) = superseded.ack().await {
                warn!(error = %e, "[EventListener] Failed to ack superseded message");
            }
        }

        process(self.handler.as_ref(), burst.latest).await;
    }
}

/// Decode, handle and acknowledge one delivery
async fn process(handler: &dyn EventHandler, delivery: Delivery) {
    match AdminEvent::decode(delivery.body()) {
        Ok(event) => {
            let kind = event.kind();
            match AssertUnwindSafe(handler.handle(event)).catch_unwind().await {
                Ok(Ok(())) => {
                    debug!(event_kind = %kind, "[EventListener] Event handled");
                }
                Ok(Err(e)) => {
                    warn!(
                        event_kind = %kind,
                        error = %e,
                        "[EventListener] Error processing message"
                    );
                }
                Err(_) => {
                    error!(event_kind = %kind, "[EventListener] Handler panicked");
                }
            }
        }
        Err(e) => {
            warn!(
                routing_key = delivery.routing_key(),
                error = %e,
                "[EventListener] Error decoding message"
            );
        }
    }

    if let Err(e) = delivery.ack().await {
        warn!(error = %e, "[EventListener] Failed to ack message");
    }
}
