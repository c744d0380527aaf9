//! Correlates an expectation against alert payloads.

use tracing::debug;

use crate::alert::{AlertData, AlertSignature};
use crate::expectation::{Expectation, ExpectationSignature};
use crate::fuzzy::{match_fuzzy, match_simple};
use crate::signature_type::SignatureType;

/// Stateless matcher. Every relevant signature must match; no partial credit.
pub struct ExpectationMatchingEngine;

impl ExpectationMatchingEngine {
    /// Whether `alert_data` satisfies `expectation`.
    ///
    /// Only signatures whose label appears in `relevant_types` are judged.
    /// Returns false when none are relevant, when a relevant signature has no
    /// alert entry, or as soon as one relevant signature fails.
    pub fn matches(
        expectation: &Expectation,
        relevant_types: &[SignatureType],
        alert_data: &AlertData,
    ) -> bool {
        let relevant: Vec<&ExpectationSignature> = expectation
            .signatures
            .iter()
            .filter(|sig| relevant_types.iter().any(|t| t.label == sig.label))
            .collect();

        if relevant.is_empty() {
            debug!(expectation_id = %expectation.id, "no relevant signatures");
            return false;
        }

        relevant.into_iter().all(|sig| {
            let Some(entry) = alert_data.get(&sig.label) else {
                debug!(
                    expectation_id = %expectation.id,
                    label = %sig.label,
                    "alert has no data for signature"
                );
                return false;
            };
            let matched = Self::signature_matches(sig, entry);
            if !matched {
                debug!(
                    expectation_id = %expectation.id,
                    label = %sig.label,
                    "signature did not match"
                );
            }
            matched
        })
    }

    fn signature_matches(sig: &ExpectationSignature, entry: &AlertSignature) -> bool {
        match entry {
            AlertSignature::Fuzzy { data, score } => match_fuzzy(data.iter(), &sig.value, *score),
            AlertSignature::Simple { data } => match_simple(data.iter(), &sig.value),
        }
    }
}
