//! Daemon error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("this daemon has no configured callback")]
    MissingCallback,

    #[error("API error: {0}")]
    Client(#[from] bas_client::ClientError),

    #[error("configuration error: {0}")]
    Config(#[from] bas_core::BasError),

    #[error("queue error: {0}")]
    Queue(#[from] bas_queue::QueueError),
}
