//! HTTP transport for the platform REST API.
//!
//! Every path is resolved against `{url}/api`. Requests carry a bearer token
//! and a `bas-client/<version>` user agent. Redirects are never followed: a
//! 3xx answer is reported as [`ClientError::Redirect`] so that a stale URL
//! cannot silently turn a write into a `GET`.

use std::path::Path;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, LOCATION, USER_AGENT};
use reqwest::multipart::{Form, Part};
use reqwest::redirect::Policy;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::collector::CollectorApi;
use crate::document::DocumentApi;
use crate::error::ClientError;
use crate::inject_expectation::InjectExpectationApi;
use crate::injector::InjectorApi;
use crate::security_platform::SecurityPlatformApi;

/// Token value shipped in sample configs; never accepted.
pub const PLACEHOLDER_TOKEN: &str = "ChangeMe";

const CLIENT_USER_AGENT: &str = concat!("bas-client/", env!("CARGO_PKG_VERSION"));

/// Keys checked, in order, for a human-readable error in a JSON error body.
const ERROR_MESSAGE_KEYS: &[&str] = &["error", "message", "execution_message"];

/// A file sent as one part of a multipart request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttachment {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl FileAttachment {
    pub fn new(file_name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    pub fn png(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::new(file_name, "image/png", bytes)
    }

    /// Read `path` into an attachment named `file_name`.
    pub fn from_path(
        path: impl AsRef<Path>,
        file_name: impl Into<String>,
        mime: impl Into<String>,
    ) -> Result<Self, ClientError> {
        let bytes = std::fs::read(path)?;
        Ok(Self::new(file_name, mime, bytes))
    }

    fn to_part(&self) -> Result<Part, ClientError> {
        Ok(Part::bytes(self.bytes.clone())
            .file_name(self.file_name.clone())
            .mime_str(&self.mime)?)
    }
}

/// Fluent configuration for [`BasClient`].
pub struct BasClientBuilder {
    url: String,
    token: String,
    timeout: Option<Duration>,
    accept_invalid_certs: bool,
}

impl BasClientBuilder {
    /// Per-request timeout (default: none).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Skip TLS certificate verification for the platform endpoint.
    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Validate the URL and token and build the client.
    pub fn build(self) -> Result<BasClient, ClientError> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(ClientError::InvalidConfig("a platform URL must be set".into()));
        }
        if self.token.is_empty() || self.token == PLACEHOLDER_TOKEN {
            return Err(ClientError::InvalidConfig("a platform token must be set".into()));
        }
        Url::parse(url)
            .map_err(|e| ClientError::InvalidConfig(format!("invalid platform URL {url}: {e}")))?;

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", self.token))
            .map_err(|e| ClientError::InvalidConfig(format!("invalid token: {e}")))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .redirect(Policy::none())
            .danger_accept_invalid_certs(self.accept_invalid_certs);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(BasClient {
            base_url: url.trim_end_matches('/').to_string(),
            http: builder.build()?,
        })
    }
}

/// Authenticated client for the platform REST API.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct BasClient {
    base_url: String,
    http: reqwest::Client,
}

impl BasClient {
    /// Build a client with default settings.
    ///
    /// Fails when `url` is empty or unparseable, or when `token` is empty or
    /// the `ChangeMe` placeholder.
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder(url, token).build()
    }

    pub fn builder(url: impl Into<String>, token: impl Into<String>) -> BasClientBuilder {
        BasClientBuilder {
            url: url.into(),
            token: token.into(),
            timeout: None,
            accept_invalid_certs: false,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn collectors(&self) -> CollectorApi<'_> {
        CollectorApi::new(self)
    }

    pub fn injectors(&self) -> InjectorApi<'_> {
        InjectorApi::new(self)
    }

    pub fn documents(&self) -> DocumentApi<'_> {
        DocumentApi::new(self)
    }

    pub fn security_platforms(&self) -> SecurityPlatformApi<'_> {
        SecurityPlatformApi::new(self)
    }

    pub fn inject_expectations(&self) -> InjectExpectationApi<'_> {
        InjectExpectationApi::new(self)
    }

    /// Full URL for an API path. Absolute URLs pass through unchanged.
    pub fn endpoint(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}/api{}", self.base_url, path)
    }

    pub async fn http_get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ClientError> {
        let mut request = self.http.get(self.endpoint(path));
        if !query.is_empty() {
            request = request.query(query);
        }
        self.execute("GET", path, request).await
    }

    pub async fn http_post<T, B>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = self.http.post(self.endpoint(path)).json(body);
        self.execute("POST", path, request).await
    }

    pub async fn http_put<T, B>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = self.http.put(self.endpoint(path)).json(body);
        self.execute("PUT", path, request).await
    }

    /// POST a multipart form: `input` holds the JSON-encoded body, followed by
    /// one part per `(field, file)` pair.
    pub async fn http_post_multipart<T, B>(
        &self,
        path: &str,
        input: &B,
        files: &[(&str, &FileAttachment)],
    ) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let input = Part::text(serde_json::to_string(input)?).mime_str("application/json")?;
        let mut form = Form::new().part("input", input);
        for (field, file) in files {
            form = form.part(field.to_string(), file.to_part()?);
        }

        let request = self.http.post(self.endpoint(path)).multipart(form);
        self.execute("POST", path, request).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        method: &str,
        path: &str,
        request: RequestBuilder,
    ) -> Result<T, ClientError> {
        debug!(method, path, "platform request");
        let response = check_response(request.send().await?).await?;
        let bytes = response.bytes().await?;
        decode_body(&bytes)
    }
}

async fn check_response(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status.is_redirection() {
        let target = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("<unknown>")
            .to_string();
        warn!(
            status = status.as_u16(),
            source = %response.url(),
            target = %target,
            "platform URL redirected"
        );
        return Err(ClientError::Redirect(target));
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body);
    warn!(status = status.as_u16(), message = %message, "platform request failed");
    Err(ClientError::Status {
        status: status.as_u16(),
        message,
    })
}

/// Decode a response body. An empty body decodes as JSON `null`.
pub(crate) fn decode_body<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ClientError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::from_value(Value::Null)?);
    }
    Ok(serde_json::from_slice(bytes)?)
}

/// Human-readable message from an error body, falling back to the raw body.
pub(crate) fn error_message(body: &str) -> String {
    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return body.to_string();
    };

    json.pointer("/error/message")
        .and_then(Value::as_str)
        .or_else(|| {
            ERROR_MESSAGE_KEYS
                .iter()
                .find_map(|key| json.get(*key).and_then(Value::as_str))
        })
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use serde::de::IgnoredAny;

    use super::*;

    #[test]
    fn rejects_missing_url_and_placeholder_token() {
        assert!(matches!(
            BasClient::new("", "token"),
            Err(ClientError::InvalidConfig(_))
        ));
        assert!(matches!(
            BasClient::new("http://localhost:8080", ""),
            Err(ClientError::InvalidConfig(_))
        ));
        assert!(matches!(
            BasClient::new("http://localhost:8080", PLACEHOLDER_TOKEN),
            Err(ClientError::InvalidConfig(_))
        ));
        assert!(matches!(
            BasClient::new("not a url", "token"),
            Err(ClientError::InvalidConfig(_))
        ));
    }

    #[test]
    fn endpoint_prefixes_api() {
        let client = BasClient::new("http://localhost:8080/", "token").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");
        assert_eq!(client.endpoint("/collectors"), "http://localhost:8080/api/collectors");
        assert_eq!(client.endpoint("https://other/x"), "https://other/x");
    }

    #[test]
    fn error_message_checks_known_keys() {
        assert_eq!(error_message(r#"{"error":{"message":"nested"}}"#), "nested");
        assert_eq!(error_message(r#"{"error":"flat"}"#), "flat");
        assert_eq!(error_message(r#"{"message":"msg"}"#), "msg");
        assert_eq!(error_message(r#"{"execution_message":"exec"}"#), "exec");
        assert_eq!(error_message(r#"{"other":1}"#), r#"{"other":1}"#);
        assert_eq!(error_message("plain failure"), "plain failure");
    }

    #[test]
    fn empty_body_decodes_as_null() {
        let value: Value = decode_body(b"").unwrap();
        assert_eq!(value, Value::Null);
        let _: IgnoredAny = decode_body(b"  \n").unwrap();
        let _: IgnoredAny = decode_body(br#"{"ok":true}"#).unwrap();
        let list: Vec<u32> = decode_body(b"[1,2]").unwrap();
        assert_eq!(list, vec![1, 2]);
    }
}
