//! Broker abstraction and delivery types.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::QueueError;

/// A raw delivery received from the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    /// Broker-assigned tag used to acknowledge this delivery.
    pub delivery_tag: u64,
    /// Raw message body (JSON bytes).
    pub body: Vec<u8>,
    /// Whether the broker delivered this message before.
    pub redelivered: bool,
    pub received_at: DateTime<Utc>,
}

impl QueueMessage {
    pub fn new(delivery_tag: u64, body: impl Into<Vec<u8>>) -> Self {
        Self {
            delivery_tag,
            body: body.into(),
            redelivered: false,
            received_at: Utc::now(),
        }
    }
}

/// Lifecycle of a [`QueueConsumer`](crate::QueueConsumer).
///
/// `Stopped` is terminal and only reached through `stop()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Disconnected,
    Connecting,
    Consuming,
    Stopped,
}

impl fmt::Display for ConsumerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Consuming => "consuming",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Opens consuming sessions against a broker.
///
/// A successful `connect` returns a session that is already consuming the
/// configured queue with a prefetch of one.
#[async_trait]
pub trait BrokerConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn BrokerSession>, QueueError>;

    /// Short description for logs (e.g. `host:port/queue`).
    fn describe(&self) -> String;
}

/// One open connection consuming one queue.
#[async_trait]
pub trait BrokerSession: Send {
    /// Wait for the next delivery. `Ok(None)` means the broker ended the
    /// consumer stream.
    async fn next_delivery(&mut self) -> Result<Option<QueueMessage>, QueueError>;

    async fn ack(&mut self, delivery_tag: u64) -> Result<(), QueueError>;

    /// Close the underlying connection.
    async fn close(&mut self) -> Result<(), QueueError>;
}
