//! AMQP transport
//!
//! Each subscription owns one connection with one channel:
//! prefetch limit, durable topic exchange, exclusive server-named queue bound
//! with the routing key, and a consumer on that queue.
//!
//! When the connection drops the subscription reconnects with exponential
//! backoff and declares the topology again. Deliveries received before the
//! drop can no longer be acknowledged; the broker redelivers them.

use async_trait::async_trait;
use futures::StreamExt;
use lapin::acker::Acker;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicQosOptions, ExchangeDeclareOptions,
    QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{Connection, ConnectionProperties, Consumer, ExchangeKind};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use krs_core::{Acknowledger, Delivery, MessageTransport, Subscription, Topology, TransportError};

/// Reconnect delays: start at `initial`, double up to `max`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(30),
        }
    }
}

impl Backoff {
    pub fn next(&self, current: Duration) -> Duration {
        (current * 2).min(self.max)
    }
}

pub struct AmqpTransport {
    address: String,
    backoff: Backoff,
}

impl AmqpTransport {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            backoff: Backoff::default(),
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }
}

#[async_trait]
impl MessageTransport for AmqpTransport {
    async fn open(&self, topology: &Topology) -> Result<Box<dyn Subscription>, TransportError> {
        let consumer_tag = format!("krs-{}", Uuid::new_v4());
        let session = Session::connect(&self.address, topology, &consumer_tag).await?;
        info!(
            exchange = %topology.exchange,
            routing_key = %topology.routing_key,
            consumer_tag = %consumer_tag,
            "[AmqpTransport] Subscribed"
        );

        Ok(Box::new(AmqpSubscription {
            address: self.address.clone(),
            topology: topology.clone(),
            consumer_tag,
            backoff: self.backoff,
            session: Some(session),
            closed: false,
        }))
    }
}

fn channel_error(err: lapin::Error) -> TransportError {
    TransportError::Channel(err.to_string())
}

/// Live connection plus its consumer
struct Session {
    connection: Connection,
    consumer: Consumer,
}

impl Session {
    async fn connect(
        address: &str,
        topology: &Topology,
        consumer_tag: &str,
    ) -> Result<Self, TransportError> {
        let connection = Connection::connect(address, ConnectionProperties::default())
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        let channel = connection.create_channel().await.map_err(channel_error)?;
        channel
            .basic_qos(topology.prefetch_count, BasicQosOptions::default())
            .await
            .map_err(channel_error)?;
        channel
            .exchange_declare(
                &topology.exchange,
                ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(channel_error)?;

        let queue = channel
            .queue_declare(
                "",
                QueueDeclareOptions {
                    exclusive: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(channel_error)?;
        channel
            .queue_bind(
                queue.name().as_str(),
                &topology.exchange,
                &topology.routing_key,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(channel_error)?;

        let consumer = channel
            .basic_consume(
                queue.name().as_str(),
                consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(channel_error)?;

        debug!(queue = %queue.name().as_str(), "[AmqpTransport] Queue bound");
        Ok(Self {
            connection,
            consumer,
        })
    }
}

struct AmqpSubscription {
    address: String,
    topology: Topology,
    consumer_tag: String,
    backoff: Backoff,
    session: Option<Session>,
    closed: bool,
}

impl AmqpSubscription {
    /// Connect again, retrying until it works
    async fn reconnect(&self) -> Session {
        let mut delay = self.backoff.initial;
        loop {
            match Session::connect(&self.address, &self.topology, &self.consumer_tag).await {
                Ok(session) => {
                    info!("[AmqpTransport] Reconnected");
                    return session;
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        retry_in_secs = delay.as_secs(),
                        "[AmqpTransport] Reconnect failed"
                    );
                    tokio::time::sleep(delay).await;
                    delay = self.backoff.next(delay);
                }
            }
        }
    }
}

#[async_trait]
impl Subscription for AmqpSubscription {
    async fn next_delivery(&mut self) -> Option<Delivery> {
        loop {
            if self.closed {
                return None;
            }

            let Some(session) = self.session.as_mut() else {
                let session = self.reconnect().await;
                self.session = Some(session);
                continue;
            };

            let next = session.consumer.next().await;
            match next {
                Some(Ok(delivery)) => {
                    return Some(Delivery::new(
                        delivery.routing_key.as_str(),
                        delivery.data,
                        Box::new(AmqpAcker(delivery.acker)),
                    ));
                }
                Some(Err(e)) => {
                    warn!(error = %e, "[AmqpTransport] Connection lost");
                    self.session = None;
                }
                None => {
                    warn!("[AmqpTransport] Consumer cancelled by broker");
                    self.session = None;
                }
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.closed = true;
        if let Some(session) = self.session.take() {
            info!("[AmqpTransport] Closing connection");
            session
                .connection
                .close(200, "OK")
                .await
                .map_err(|e| TransportError::Connect(e.to_string()))?;
        }
        Ok(())
    }
}

struct AmqpAcker(Acker);

#[async_trait]
impl Acknowledger for AmqpAcker {
    async fn ack(&self) -> Result<(), TransportError> {
        self.0
            .ack(BasicAckOptions::default())
            .await
            .map_err(|e| TransportError::Ack(e.to_string()))
    }
}
