//! Signature labels and match kinds.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How a signature value is compared to alert data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchKind {
    /// Case-sensitive, byte-exact membership.
    #[serde(rename = "simple")]
    Exact,
    /// Similarity ratio compared against a threshold.
    #[serde(rename = "fuzzy")]
    Fuzzy,
}

impl MatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "simple",
            Self::Fuzzy => "fuzzy",
        }
    }
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of observable marker a signature describes.
///
/// Labels this crate does not know are preserved in [`SignatureLabel::Other`]
/// so that expectations from newer servers still deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SignatureLabel {
    ParentProcessName,
    ProcessName,
    CommandLine,
    Hostname,
    FileName,
    Ipv4Address,
    Other(String),
}

impl SignatureLabel {
    pub fn as_str(&self) -> &str {
        match self {
            Self::ParentProcessName => "parent_process_name",
            Self::ProcessName => "process_name",
            Self::CommandLine => "command_line",
            Self::Hostname => "hostname",
            Self::FileName => "file_name",
            Self::Ipv4Address => "ipv4_address",
            Self::Other(label) => label,
        }
    }
}

impl From<&str> for SignatureLabel {
    fn from(label: &str) -> Self {
        match label {
            "parent_process_name" => Self::ParentProcessName,
            "process_name" => Self::ProcessName,
            "command_line" => Self::CommandLine,
            "hostname" => Self::Hostname,
            "file_name" => Self::FileName,
            "ipv4_address" => Self::Ipv4Address,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for SignatureLabel {
    fn from(label: String) -> Self {
        Self::from(label.as_str())
    }
}

impl From<SignatureLabel> for String {
    fn from(label: SignatureLabel) -> Self {
        match label {
            SignatureLabel::Other(label) => label,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for SignatureLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
