//! In-memory [`AgentApi`] used by the daemon tests.

use std::sync::Mutex;

use async_trait::async_trait;
use bas_client::{
    AgentApi, ClientError, CollectorConfig, Document, FileAttachment, InjectorConfig,
    InjectorConnection, InjectorRegistration, SecurityPlatform, SecurityPlatformInput,
};
use bas_signatures::{Expectation, ExpectationResult};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    RegisterCollector {
        config: CollectorConfig,
        icon: Option<String>,
    },
    RegisterInjector {
        config: InjectorConfig,
        icon: Option<String>,
    },
    LastExecution {
        collector_id: String,
        at: DateTime<Utc>,
    },
    UpsertDocument(String),
    UpsertSecurityPlatform(SecurityPlatformInput),
    PendingExpectations(String),
    ReportExpectation {
        id: Uuid,
        result: ExpectationResult,
    },
}

#[derive(Default)]
pub struct FakeApi {
    pub calls: Mutex<Vec<Call>>,
    pub fail_registration: bool,
    pub fail_last_execution: bool,
    pub pending: Vec<Expectation>,
}

impl FakeApi {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn unavailable() -> ClientError {
        ClientError::Status {
            status: 503,
            message: "platform unavailable".into(),
        }
    }
}

#[async_trait]
impl AgentApi for FakeApi {
    async fn register_collector(
        &self,
        config: &CollectorConfig,
        icon: Option<&FileAttachment>,
    ) -> Result<Value, ClientError> {
        self.record(Call::RegisterCollector {
            config: config.clone(),
            icon: icon.map(|i| i.file_name.clone()),
        });
        if self.fail_registration {
            return Err(Self::unavailable());
        }
        Ok(json!({"collector_id": config.collector_id}))
    }

    async fn register_injector(
        &self,
        config: &InjectorConfig,
        icon: Option<&FileAttachment>,
    ) -> Result<InjectorRegistration, ClientError> {
        self.record(Call::RegisterInjector {
            config: config.clone(),
            icon: icon.map(|i| i.file_name.clone()),
        });
        if self.fail_registration {
            return Err(Self::unavailable());
        }
        Ok(InjectorRegistration {
            connection: InjectorConnection {
                host: "mq.local".into(),
                port: 5672,
                vhost: "/".into(),
                use_ssl: false,
                user: "injector".into(),
                pass: "s3cret".into(),
            },
            listen: format!("{}_queue", config.injector_id),
        })
    }

    async fn collector_last_execution(
        &self,
        collector_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), ClientError> {
        self.record(Call::LastExecution {
            collector_id: collector_id.to_string(),
            at,
        });
        if self.fail_last_execution {
            return Err(Self::unavailable());
        }
        Ok(())
    }

    async fn upsert_document(&self, file: &FileAttachment) -> Result<Document, ClientError> {
        self.record(Call::UpsertDocument(file.file_name.clone()));
        Ok(Document {
            document_id: "doc-1".into(),
            document_name: Some(file.file_name.clone()),
        })
    }

    async fn upsert_security_platform(
        &self,
        input: &SecurityPlatformInput,
    ) -> Result<SecurityPlatform, ClientError> {
        self.record(Call::UpsertSecurityPlatform(input.clone()));
        Ok(SecurityPlatform {
            asset_id: "platform-1".into(),
            asset_name: Some(input.asset_name.clone()),
        })
    }

    async fn pending_expectations(
        &self,
        source_id: &str,
        _expiration_time: Option<u64>,
    ) -> Result<Vec<Expectation>, ClientError> {
        self.record(Call::PendingExpectations(source_id.to_string()));
        Ok(self.pending.clone())
    }

    async fn report_expectation(
        &self,
        expectation_id: Uuid,
        result: &ExpectationResult,
    ) -> Result<(), ClientError> {
        self.record(Call::ReportExpectation {
            id: expectation_id,
            result: result.clone(),
        });
        Ok(())
    }
}
