//! Alert-side matching descriptors.
//!
//! Wire format, keyed by signature label:
//!
//! ```json
//! {
//!   "parent_process_name": {"type": "fuzzy", "data": ["svc.exe"], "score": 90},
//!   "hostname": {"type": "simple", "data": "ws-042"}
//! }
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{MatchKind, SignatureLabel};

/// Alert evidence for each signature label a caller can judge.
pub type AlertData = HashMap<SignatureLabel, AlertSignature>;

/// Observed values for one signature: a single string or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AlertValues {
    One(String),
    Many(Vec<String>),
}

impl AlertValues {
    /// Candidates as a slice; a single string is a one-element slice.
    pub fn as_slice(&self) -> &[String] {
        match self {
            Self::One(value) => std::slice::from_ref(value),
            Self::Many(values) => values,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.as_slice().iter().map(String::as_str)
    }
}

impl From<String> for AlertValues {
    fn from(value: String) -> Self {
        Self::One(value)
    }
}

impl From<&str> for AlertValues {
    fn from(value: &str) -> Self {
        Self::One(value.to_string())
    }
}

impl From<Vec<String>> for AlertValues {
    fn from(values: Vec<String>) -> Self {
        Self::Many(values)
    }
}

impl From<Vec<&str>> for AlertValues {
    fn from(values: Vec<&str>) -> Self {
        Self::Many(values.into_iter().map(String::from).collect())
    }
}

/// Observed values for one signature plus the policy to compare them with.
///
/// A fuzzy entry always carries its score; an entry of `"type": "fuzzy"`
/// without `"score"` does not deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AlertSignature {
    Simple { data: AlertValues },
    Fuzzy { data: AlertValues, score: u8 },
}

impl AlertSignature {
    pub fn kind(&self) -> MatchKind {
        match self {
            Self::Simple { .. } => MatchKind::Exact,
            Self::Fuzzy { .. } => MatchKind::Fuzzy,
        }
    }

    pub fn data(&self) -> &AlertValues {
        match self {
            Self::Simple { data } | Self::Fuzzy { data, .. } => data,
        }
    }

    pub fn score(&self) -> Option<u8> {
        match self {
            Self::Simple { .. } => None,
            Self::Fuzzy { score, .. } => Some(*score),
        }
    }
}
