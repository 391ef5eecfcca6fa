//! Message transport traits
//!
//! The listener talks to the broker through these traits so the AMQP client
//! can be swapped for an in-memory transport in tests.
//!
//! Reconnection is the transport's job: a `Subscription` keeps yielding
//! deliveries across connection losses and only returns `None` once it has
//! been closed or can't continue.

use async_trait::async_trait;
use std::fmt;

use crate::error::TransportError;

/// Broker-side topology for a subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    /// Durable topic exchange
    pub exchange: String,
    /// Binding pattern for the exclusive, server-named queue
    pub routing_key: String,
    /// Max unacknowledged deliveries in flight
    pub prefetch_count: u16,
}

/// Positive acknowledgment of one delivery
#[async_trait]
pub trait Acknowledger: Send + Sync {
    async fn ack(&self) -> Result<(), TransportError>;
}

/// A message received from the broker
pub struct Delivery {
    routing_key: String,
    body: Vec<u8>,
    acker: Box<dyn Acknowledger>,
}

impl Delivery {
    pub fn new(routing_key: impl Into<String>, body: Vec<u8>, acker: Box<dyn Acknowledger>) -> Self {
        Self {
            routing_key: routing_key.into(),
            body,
            acker,
        }
    }

    pub fn routing_key(&self) -> &str {
        &self.routing_key
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Acknowledge and consume the delivery
    pub async fn ack(self) -> Result<(), TransportError> {
        self.acker.ack().await
    }
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delivery")
            .field("routing_key", &self.routing_key)
            .field("body_len", &self.body.len())
            .finish()
    }
}

/// Active consumer on a bound queue
#[async_trait]
pub trait Subscription: Send {
    /// Next delivery; `None` once the subscription has ended
    async fn next_delivery(&mut self) -> Option<Delivery>;

    /// Close the underlying connection
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Factory for subscriptions
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Connect, declare the topology and start consuming
    async fn open(&self, topology: &Topology) -> Result<Box<dyn Subscription>, TransportError>;
}
