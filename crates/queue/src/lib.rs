//! Work-queue consumption for injectors.
//!
//! An injector receives execution orders over AMQP. [`QueueConsumer`] owns the
//! connection, acknowledges each delivery as soon as it arrives, hands the
//! decoded JSON object to a handler and reconnects after any failure.

pub mod amqp;
pub mod consumer;
pub mod error;
pub mod listener;
pub mod parser;
pub mod tls;

pub use amqp::{AmqpConfig, AmqpConnector, PREFETCH_COUNT};
pub use consumer::{BrokerConnector, BrokerSession, ConsumerState, QueueMessage};
pub use error::QueueError;
pub use listener::{ConsumerHandle, MessageHandler, QueueConsumer, DEFAULT_RECONNECT_BACKOFF};
pub use parser::{parse_message, MessagePayload};
pub use tls::{mq_tls_hints, MqTlsConfig, TlsMaterial};
