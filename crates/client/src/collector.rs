//! Collector registration and bookkeeping.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::client::{BasClient, FileAttachment};
use crate::error::ClientError;

const PATH: &str = "/collectors";

/// What a collector declares about itself on registration and on every
/// heartbeat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectorConfig {
    pub collector_id: String,
    pub collector_name: String,
    pub collector_type: String,
    pub collector_period: u64,
    /// Sent as `null` when the collector is not tied to a platform.
    #[serde(default)]
    pub collector_security_platform: Option<String>,
}

pub struct CollectorApi<'a> {
    client: &'a BasClient,
}

impl<'a> CollectorApi<'a> {
    pub(crate) fn new(client: &'a BasClient) -> Self {
        Self { client }
    }

    /// Register (or re-register) a collector. Idempotent on the server, so it
    /// doubles as the heartbeat when called without an icon.
    pub async fn create(
        &self,
        config: &CollectorConfig,
        icon: Option<&FileAttachment>,
    ) -> Result<Value, ClientError> {
        let files: Vec<(&str, &FileAttachment)> = icon.map(|i| ("icon", i)).into_iter().collect();
        self.client.http_post_multipart(PATH, config, &files).await
    }

    pub async fn update(&self, collector_id: &str, body: &Value) -> Result<Value, ClientError> {
        self.client
            .http_put(&format!("{PATH}/{collector_id}"), body)
            .await
    }

    /// Record when the collector last completed a run.
    pub async fn update_last_execution(
        &self,
        collector_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), ClientError> {
        let body = json!({
            "collector_last_execution": at.to_rfc3339_opts(SecondsFormat::Millis, true),
        });
        let _: IgnoredAny = self
            .client
            .http_put(&format!("{PATH}/{collector_id}"), &body)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_security_platform_is_sent_as_null() {
        let config = CollectorConfig {
            collector_id: "c-1".into(),
            collector_name: "EDR".into(),
            collector_type: "edr".into(),
            collector_period: 60,
            collector_security_platform: None,
        };

        let body = serde_json::to_value(&config).unwrap();
        let fields = body.as_object().unwrap();
        assert!(fields.contains_key("collector_security_platform"));
        assert_eq!(body["collector_security_platform"], Value::Null);
    }
}
