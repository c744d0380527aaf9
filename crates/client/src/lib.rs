//! REST client for the BAS platform.
//!
//! [`BasClient`] wraps an authenticated `reqwest` client. Resource groups are
//! reached through accessor handles (`client.collectors()`,
//! `client.inject_expectations()`...). Daemons depend on the narrower
//! [`AgentApi`] trait, and the matching engine reports outcomes through the
//! [`ExpectationReporter`](bas_signatures::ExpectationReporter) impl.

pub mod agent;
pub mod client;
pub mod collector;
pub mod contracts;
pub mod document;
pub mod error;
pub mod inject_expectation;
pub mod injector;
pub mod security_platform;

pub use agent::AgentApi;
pub use client::{BasClient, BasClientBuilder, FileAttachment, PLACEHOLDER_TOKEN};
pub use collector::{CollectorApi, CollectorConfig};
pub use contracts::{prepare_contracts, Contract, ContractBuilder, ContractElement};
pub use document::{Document, DocumentApi};
pub use error::ClientError;
pub use inject_expectation::InjectExpectationApi;
pub use injector::{InjectorApi, InjectorConfig, InjectorConnection, InjectorRegistration};
pub use security_platform::{SecurityPlatform, SecurityPlatformApi, SecurityPlatformInput};
