//! Injector registration.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::{BasClient, FileAttachment};
use crate::contracts::{prepare_contracts, Contract};
use crate::error::ClientError;

const PATH: &str = "/injectors";

/// What an injector declares about itself on registration and on every
/// heartbeat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InjectorConfig {
    pub injector_id: String,
    pub injector_name: String,
    pub injector_type: String,
    /// Registration envelopes, see [`prepare_contracts`].
    pub injector_contracts: Value,
    #[serde(default)]
    pub injector_custom_contracts: bool,
    #[serde(default)]
    pub injector_category: Option<String>,
    #[serde(default)]
    pub injector_executor_commands: Option<Value>,
    #[serde(default)]
    pub injector_executor_clear_commands: Option<Value>,
}

impl InjectorConfig {
    /// Replace the declared contracts with `contracts`.
    pub fn with_contracts(mut self, contracts: &[Contract]) -> Result<Self, ClientError> {
        self.injector_contracts = prepare_contracts(contracts)?;
        Ok(self)
    }
}

/// Broker coordinates handed out by the platform.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectorConnection {
    pub host: String,
    pub port: u16,
    pub vhost: String,
    pub use_ssl: bool,
    pub user: String,
    pub pass: String,
}

impl fmt::Debug for InjectorConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectorConnection")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("vhost", &self.vhost)
            .field("use_ssl", &self.use_ssl)
            .field("user", &self.user)
            .field("pass", &"<redacted>")
            .finish()
    }
}

/// Server reply to an injector registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectorRegistration {
    pub connection: InjectorConnection,
    /// Queue this injector consumes.
    pub listen: String,
}

pub struct InjectorApi<'a> {
    client: &'a BasClient,
}

impl<'a> InjectorApi<'a> {
    pub(crate) fn new(client: &'a BasClient) -> Self {
        Self { client }
    }

    /// Register (or re-register) an injector and receive its broker
    /// coordinates.
    pub async fn create(
        &self,
        config: &InjectorConfig,
        icon: Option<&FileAttachment>,
    ) -> Result<InjectorRegistration, ClientError> {
        let files: Vec<(&str, &FileAttachment)> = icon.map(|i| ("icon", i)).into_iter().collect();
        self.client.http_post_multipart(PATH, config, &files).await
    }
}
