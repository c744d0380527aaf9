//! Decode queue message bodies.

use serde_json::{Map, Value};

use crate::consumer::QueueMessage;
use crate::error::QueueError;

/// A decoded message body: always a JSON object.
pub type MessagePayload = Map<String, Value>;

/// Parse a delivery body into a JSON object.
///
/// Only rejects bodies that are not valid JSON or not a JSON object.
pub fn parse_message(msg: &QueueMessage) -> Result<MessagePayload, QueueError> {
    let json: Value = serde_json::from_slice(&msg.body).map_err(|e| {
        QueueError::Parse(format!("Invalid JSON in message {}: {}", msg.delivery_tag, e))
    })?;

    match json {
        Value::Object(obj) => Ok(obj),
        _ => Err(QueueError::Parse(format!(
            "Message {} body is not a JSON object",
            msg.delivery_tag
        ))),
    }
}
