//! Per-signature-type matching policy.

use serde::Serialize;

use crate::error::SignatureError;
use crate::types::MatchKind;

/// Highest similarity score a fuzzy threshold may ask for.
pub const MAX_SCORE: u8 = 100;

/// How one signature type is compared: exact, or fuzzy with a threshold.
///
/// Invalid combinations are rejected at construction, never defaulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SignatureMatchPolicy {
    kind: MatchKind,
    threshold: Option<u8>,
}

impl SignatureMatchPolicy {
    /// Build a policy.
    ///
    /// Fails when `kind` is fuzzy and `threshold` is `None`, when `kind` is
    /// exact and a threshold is given, or when the threshold exceeds 100.
    /// A threshold of `Some(0)` is a valid fuzzy threshold.
    pub fn new(kind: MatchKind, threshold: Option<u8>) -> Result<Self, SignatureError> {
        match (kind, threshold) {
            (MatchKind::Fuzzy, None) => Err(SignatureError::InvalidPolicy(format!(
                "match type {kind} requires a score, found none"
            ))),
            (MatchKind::Exact, Some(score)) => Err(SignatureError::InvalidPolicy(format!(
                "match type {kind} does not take a score, found {score}"
            ))),
            (_, Some(score)) if score > MAX_SCORE => Err(SignatureError::InvalidPolicy(format!(
                "score must be between 0 and {MAX_SCORE}, found {score}"
            ))),
            _ => Ok(Self { kind, threshold }),
        }
    }

    pub fn exact() -> Self {
        Self {
            kind: MatchKind::Exact,
            threshold: None,
        }
    }

    pub fn fuzzy(threshold: u8) -> Result<Self, SignatureError> {
        Self::new(MatchKind::Fuzzy, Some(threshold))
    }

    pub fn kind(&self) -> MatchKind {
        self.kind
    }

    /// Present iff the policy is fuzzy.
    pub fn threshold(&self) -> Option<u8> {
        self.threshold
    }
}

impl Default for SignatureMatchPolicy {
    fn default() -> Self {
        Self::exact()
    }
}
