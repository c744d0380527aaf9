//! A signature kind bound to its matching policy.

use serde::Serialize;

use crate::alert::{AlertSignature, AlertValues};
use crate::error::SignatureError;
use crate::policy::SignatureMatchPolicy;
use crate::types::{MatchKind, SignatureLabel};

/// A signature kind a collector can observe, with the policy used to match it.
///
/// Built once at agent startup and reused for every matching call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignatureType {
    pub label: SignatureLabel,
    pub policy: SignatureMatchPolicy,
}

impl SignatureType {
    pub fn new(label: impl Into<SignatureLabel>, policy: SignatureMatchPolicy) -> Self {
        Self {
            label: label.into(),
            policy,
        }
    }

    pub fn exact(label: impl Into<SignatureLabel>) -> Self {
        Self::new(label, SignatureMatchPolicy::exact())
    }

    pub fn fuzzy(label: impl Into<SignatureLabel>, threshold: u8) -> Result<Self, SignatureError> {
        Ok(Self::new(label, SignatureMatchPolicy::fuzzy(threshold)?))
    }

    /// Wrap observed `data` into the descriptor the matching engine expects
    /// for this signature type: `{type, data, score?}`, with `score` present
    /// iff the policy is fuzzy.
    pub fn describe_for_matching(&self, data: impl Into<AlertValues>) -> AlertSignature {
        let data = data.into();
        match (self.policy.kind(), self.policy.threshold()) {
            (MatchKind::Fuzzy, Some(score)) => AlertSignature::Fuzzy { data, score },
            _ => AlertSignature::Simple { data },
        }
    }
}
