//! # KRS AMQP
//!
//! - `transport` - lapin-backed `MessageTransport` with transparent reconnect
//! - `management` - RabbitMQ management API (user provisioning)

mod error;
mod management;
mod transport;

pub use error::{AmqpError, AmqpResult};
pub use management::{RabbitMqAdmin, RabbitMqConfig};
pub use transport::{AmqpTransport, Backoff};
