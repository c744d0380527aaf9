//! Expectations and outcome reporting.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::alert::AlertData;
use crate::matching::ExpectationMatchingEngine;
use crate::signature_type::SignatureType;
use crate::types::SignatureLabel;

/// The kind of outcome an expectation asserts. Each kind has its own verdict
/// labels.
///
/// Wire values come from `inject_expectation_type`. Anything other than
/// `DETECTION` is treated as prevention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ExpectationKind {
    Detection,
    #[default]
    Prevention,
}

impl ExpectationKind {
    pub fn success_label(&self) -> &'static str {
        match self {
            Self::Detection => "Detected",
            Self::Prevention => "Prevented",
        }
    }

    pub fn failure_label(&self) -> &'static str {
        match self {
            Self::Detection => "Not Detected",
            Self::Prevention => "Not Prevented",
        }
    }

    pub fn result_label(&self, success: bool) -> &'static str {
        if success {
            self.success_label()
        } else {
            self.failure_label()
        }
    }

    pub fn as_wire(&self) -> &'static str {
        match self {
            Self::Detection => "DETECTION",
            Self::Prevention => "PREVENTION",
        }
    }
}

impl From<String> for ExpectationKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "DETECTION" => Self::Detection,
            _ => Self::Prevention,
        }
    }
}

impl From<ExpectationKind> for String {
    fn from(kind: ExpectationKind) -> Self {
        kind.as_wire().to_string()
    }
}

/// A marker an attack step is expected to leave in security-tool alerts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectationSignature {
    #[serde(rename = "type")]
    pub label: SignatureLabel,
    pub value: String,
}

impl ExpectationSignature {
    pub fn new(label: impl Into<SignatureLabel>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// An expected outcome of a simulated attack step, as served by the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expectation {
    #[serde(rename = "inject_expectation_id")]
    pub id: Uuid,
    #[serde(rename = "inject_expectation_signatures", default)]
    pub signatures: Vec<ExpectationSignature>,
    #[serde(rename = "inject_expectation_type", default)]
    pub kind: ExpectationKind,
}

/// Body of an outcome report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectationResult {
    pub collector_id: String,
    pub result: String,
    pub is_success: bool,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Sink for expectation outcomes, usually the platform REST client.
#[async_trait]
pub trait ExpectationReporter: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn update_expectation(
        &self,
        expectation_id: Uuid,
        result: &ExpectationResult,
    ) -> Result<(), Self::Error>;
}

impl Expectation {
    pub fn new(id: Uuid, kind: ExpectationKind, signatures: Vec<ExpectationSignature>) -> Self {
        Self {
            id,
            signatures,
            kind,
        }
    }

    pub fn success_label(&self) -> &'static str {
        self.kind.success_label()
    }

    pub fn failure_label(&self) -> &'static str {
        self.kind.failure_label()
    }

    /// Whether an alert belongs to this expectation.
    /// See [`ExpectationMatchingEngine::matches`].
    pub fn match_alert(&self, relevant_types: &[SignatureType], alert_data: &AlertData) -> bool {
        ExpectationMatchingEngine::matches(self, relevant_types, alert_data)
    }

    /// Build the outcome report for this expectation.
    pub fn result(
        &self,
        success: bool,
        sender_id: &str,
        metadata: HashMap<String, String>,
    ) -> ExpectationResult {
        ExpectationResult {
            collector_id: sender_id.to_string(),
            result: self.kind.result_label(success).to_string(),
            is_success: success,
            metadata,
        }
    }

    /// Report the outcome to the platform. Issues exactly one call to the
    /// reporter; failures are returned, not retried.
    pub async fn update<R>(
        &self,
        reporter: &R,
        success: bool,
        sender_id: &str,
        metadata: HashMap<String, String>,
    ) -> Result<(), R::Error>
    where
        R: ExpectationReporter + ?Sized,
    {
        let result = self.result(success, sender_id, metadata);
        tracing::debug!(
            expectation_id = %self.id,
            result = %result.result,
            "reporting expectation outcome"
        );
        reporter.update_expectation(self.id, &result).await
    }
}
