//! Document storage.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::client::{BasClient, FileAttachment};
use crate::error::ClientError;

const PATH: &str = "/documents";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub document_id: String,
    #[serde(default)]
    pub document_name: Option<String>,
}

pub struct DocumentApi<'a> {
    client: &'a BasClient,
}

impl<'a> DocumentApi<'a> {
    pub(crate) fn new(client: &'a BasClient) -> Self {
        Self { client }
    }

    /// Create the document, or replace the one with the same file name.
    pub async fn upsert(&self, file: &FileAttachment) -> Result<Document, ClientError> {
        self.client
            .http_post_multipart(&format!("{PATH}/upsert"), &json!({}), &[("file", file)])
            .await
    }
}
