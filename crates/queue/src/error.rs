//! Queue error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("broker error: {0}")]
    Amqp(#[from] lapin::Error),

    #[error("message parse error: {0}")]
    Parse(String),

    #[error("acknowledge error: {0}")]
    Ack(String),

    #[error("TLS configuration error: {0}")]
    Tls(String),

    #[error("configuration error: {0}")]
    Config(#[from] bas_core::BasError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
