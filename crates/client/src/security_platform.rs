//! Security platform assets (the products a collector reads alerts from).

use serde::{Deserialize, Serialize};

use crate::client::BasClient;
use crate::error::ClientError;

const PATH: &str = "/security_platforms";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityPlatformInput {
    pub asset_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_external_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_description: Option<String>,
    pub security_platform_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_platform_logo_light: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_platform_logo_dark: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityPlatform {
    pub asset_id: String,
    #[serde(default)]
    pub asset_name: Option<String>,
}

pub struct SecurityPlatformApi<'a> {
    client: &'a BasClient,
}

impl<'a> SecurityPlatformApi<'a> {
    pub(crate) fn new(client: &'a BasClient) -> Self {
        Self { client }
    }

    pub async fn upsert(
        &self,
        input: &SecurityPlatformInput,
    ) -> Result<SecurityPlatform, ClientError> {
        self.client
            .http_post(&format!("{PATH}/upsert"), input)
            .await
    }
}
