//! Expectation signatures and alert matching.
//!
//! An [`Expectation`] lists the markers (process names, hostnames, command
//! lines...) that a simulated attack step should leave behind. A collector
//! describes what it can observe as a set of [`SignatureType`]s, turns each
//! security-tool alert into [`AlertData`], and asks the
//! [`ExpectationMatchingEngine`] whether the alert belongs to the expectation.

pub mod alert;
pub mod error;
pub mod expectation;
pub mod fuzzy;
pub mod matching;
pub mod policy;
pub mod signature_type;
pub mod types;

pub use alert::{AlertData, AlertSignature, AlertValues};
pub use error::SignatureError;
pub use expectation::{
    Expectation, ExpectationKind, ExpectationReporter, ExpectationResult, ExpectationSignature,
};
pub use fuzzy::{match_fuzzy, match_simple, ratio};
pub use matching::ExpectationMatchingEngine;
pub use policy::SignatureMatchPolicy;
pub use signature_type::SignatureType;
pub use types::{MatchKind, SignatureLabel};
