//! Signature error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("invalid match policy: {0}")]
    InvalidPolicy(String),
}
