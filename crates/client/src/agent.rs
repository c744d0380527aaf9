//! The slice of the REST API that agent daemons depend on.

use async_trait::async_trait;
use bas_signatures::{Expectation, ExpectationReporter, ExpectationResult};
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::client::{BasClient, FileAttachment};
use crate::collector::CollectorConfig;
use crate::document::Document;
use crate::error::ClientError;
use crate::injector::{InjectorConfig, InjectorRegistration};
use crate::security_platform::{SecurityPlatform, SecurityPlatformInput};

/// Registration and bookkeeping calls made by daemons.
///
/// [`BasClient`] is the production implementation; tests substitute fakes.
#[async_trait]
pub trait AgentApi: Send + Sync {
    async fn register_collector(
        &self,
        config: &CollectorConfig,
        icon: Option<&FileAttachment>,
    ) -> Result<Value, ClientError>;

    async fn register_injector(
        &self,
        config: &InjectorConfig,
        icon: Option<&FileAttachment>,
    ) -> Result<InjectorRegistration, ClientError>;

    async fn collector_last_execution(
        &self,
        collector_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), ClientError>;

    async fn upsert_document(&self, file: &FileAttachment) -> Result<Document, ClientError>;

    async fn upsert_security_platform(
        &self,
        input: &SecurityPlatformInput,
    ) -> Result<SecurityPlatform, ClientError>;

    /// Expectations `source_id` still has to report on.
    async fn pending_expectations(
        &self,
        source_id: &str,
        expiration_time: Option<u64>,
    ) -> Result<Vec<Expectation>, ClientError>;

    async fn report_expectation(
        &self,
        expectation_id: Uuid,
        result: &ExpectationResult,
    ) -> Result<(), ClientError>;
}

/// Lets callbacks holding an `Arc<dyn AgentApi>` pass it to
/// [`Expectation::update`].
#[async_trait]
impl<'a> ExpectationReporter for dyn AgentApi + 'a {
    type Error = ClientError;

    async fn update_expectation(
        &self,
        expectation_id: Uuid,
        result: &ExpectationResult,
    ) -> Result<(), ClientError> {
        self.report_expectation(expectation_id, result).await
    }
}

#[async_trait]
impl AgentApi for BasClient {
    async fn register_collector(
        &self,
        config: &CollectorConfig,
        icon: Option<&FileAttachment>,
    ) -> Result<Value, ClientError> {
        self.collectors().create(config, icon).await
    }

    async fn register_injector(
        &self,
        config: &InjectorConfig,
        icon: Option<&FileAttachment>,
    ) -> Result<InjectorRegistration, ClientError> {
        self.injectors().create(config, icon).await
    }

    async fn collector_last_execution(
        &self,
        collector_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), ClientError> {
        self.collectors().update_last_execution(collector_id, at).await
    }

    async fn upsert_document(&self, file: &FileAttachment) -> Result<Document, ClientError> {
        self.documents().upsert(file).await
    }

    async fn upsert_security_platform(
        &self,
        input: &SecurityPlatformInput,
    ) -> Result<SecurityPlatform, ClientError> {
        self.security_platforms().upsert(input).await
    }

    async fn pending_expectations(
        &self,
        source_id: &str,
        expiration_time: Option<u64>,
    ) -> Result<Vec<Expectation>, ClientError> {
        self.inject_expectations()
            .expectations_for_source(source_id, expiration_time)
            .await
    }

    async fn report_expectation(
        &self,
        expectation_id: Uuid,
        result: &ExpectationResult,
    ) -> Result<(), ClientError> {
        self.update_expectation(expectation_id, result).await
    }
}
