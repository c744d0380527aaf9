//! Injector contracts.
//!
//! A contract describes one kind of inject an injector can execute: its
//! labels, the form fields an operator fills in, and the variables available
//! to templates. Injectors declare their contracts on registration through
//! [`prepare_contracts`], which wraps each serialized [`Contract`] in the
//! envelope the platform stores.
//!
//! Field names follow the platform's camelCase form model (`mandatoryGroups`,
//! `linkedFields`, `readOnly`...).

mod builder;
pub mod variables;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::ClientError;

pub use builder::ContractBuilder;
pub use variables::{ContractCardinality, ContractVariable, VariableType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupportedLanguage {
    Fr,
    En,
}

/// Labels keyed by language.
pub type Labels = BTreeMap<SupportedLanguage, String>;

/// English and French labels in one call.
pub fn labels(en: impl Into<String>, fr: impl Into<String>) -> Labels {
    BTreeMap::from([(SupportedLanguage::En, en.into()), (SupportedLanguage::Fr, fr.into())])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContractType {
    Text,
    Number,
    Tuple,
    Checkbox,
    Textarea,
    Select,
    Article,
    Challenge,
    DependencySelect,
    Attachment,
    Team,
    Expectation,
    Asset,
    AssetGroup,
    Payload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpectationType {
    Text,
    Document,
    Article,
    Challenge,
    Manual,
    Technical,
}

/// Expectation pre-filled in an expectations field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredefinedExpectation {
    pub expectation_type: ExpectationType,
    pub expectation_name: String,
    pub expectation_description: String,
    pub expectation_score: i64,
    pub expectation_expectation_group: bool,
}

// ── Form fields ──────────────────────────────────────────────────────

/// Per-type part of a form field; serialized with its `type` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ElementKind {
    Text {
        cardinality: ContractCardinality,
        default_value: String,
    },
    Textarea {
        cardinality: ContractCardinality,
        default_value: String,
        rich_text: bool,
    },
    Checkbox {
        default_value: bool,
    },
    Tuple {
        cardinality: ContractCardinality,
        default_value: Vec<String>,
        attachment_key: Option<String>,
        contract_attachment: bool,
        tuple_file_prefix: String,
    },
    Select {
        cardinality: ContractCardinality,
        default_value: Vec<String>,
        choices: Option<BTreeMap<String, String>>,
    },
    Attachment {
        cardinality: ContractCardinality,
        default_value: Vec<String>,
    },
    Team {
        cardinality: ContractCardinality,
        default_value: Vec<String>,
    },
    Expectation {
        cardinality: ContractCardinality,
        default_value: Vec<String>,
        predefined_expectations: Vec<PredefinedExpectation>,
    },
    Asset {
        cardinality: ContractCardinality,
        default_value: Vec<String>,
    },
    AssetGroup {
        cardinality: ContractCardinality,
        default_value: Vec<String>,
    },
    Payload {
        cardinality: ContractCardinality,
        default_value: Vec<String>,
    },
}

impl ElementKind {
    pub fn contract_type(&self) -> ContractType {
        match self {
            Self::Text { .. } => ContractType::Text,
            Self::Textarea { .. } => ContractType::Textarea,
            Self::Checkbox { .. } => ContractType::Checkbox,
            Self::Tuple { .. } => ContractType::Tuple,
            Self::Select { .. } => ContractType::Select,
            Self::Attachment { .. } => ContractType::Attachment,
            Self::Team { .. } => ContractType::Team,
            Self::Expectation { .. } => ContractType::Expectation,
            Self::Asset { .. } => ContractType::Asset,
            Self::AssetGroup { .. } => ContractType::AssetGroup,
            Self::Payload { .. } => ContractType::Payload,
        }
    }
}

/// One field of a contract form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractElement {
    pub key: String,
    pub label: String,
    #[serde(flatten)]
    pub kind: ElementKind,
    /// Keys of the group this field belongs to; one of them must be filled.
    pub mandatory_groups: Option<Vec<String>>,
    /// Fields whose values control whether this one is shown.
    pub linked_fields: Vec<ContractElement>,
    pub linked_values: Vec<String>,
    pub mandatory: bool,
    pub read_only: bool,
}

impl ContractElement {
    pub fn new(key: impl Into<String>, label: impl Into<String>, kind: ElementKind) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            kind,
            mandatory_groups: None,
            linked_fields: Vec::new(),
            linked_values: Vec::new(),
            mandatory: false,
            read_only: false,
        }
    }

    pub fn text(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(
            key,
            label,
            ElementKind::Text {
                cardinality: ContractCardinality::One,
                default_value: String::new(),
            },
        )
    }

    pub fn textarea(key: impl Into<String>, label: impl Into<String>, rich_text: bool) -> Self {
        Self::new(
            key,
            label,
            ElementKind::Textarea {
                cardinality: ContractCardinality::One,
                default_value: String::new(),
                rich_text,
            },
        )
    }

    pub fn checkbox(key: impl Into<String>, label: impl Into<String>, default_value: bool) -> Self {
        Self::new(key, label, ElementKind::Checkbox { default_value })
    }

    /// Key/value list; always multiple.
    pub fn tuple(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(
            key,
            label,
            ElementKind::Tuple {
                cardinality: ContractCardinality::Multiple,
                default_value: Vec::new(),
                attachment_key: None,
                contract_attachment: false,
                tuple_file_prefix: "file :: ".to_string(),
            },
        )
    }

    /// Drop-down over `choices` (value to label).
    pub fn select<K, V>(
        key: impl Into<String>,
        label: impl Into<String>,
        choices: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let choices = choices
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::new(
            key,
            label,
            ElementKind::Select {
                cardinality: ContractCardinality::One,
                default_value: Vec::new(),
                choices: Some(choices),
            },
        )
    }

    pub fn attachment(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(
            key,
            label,
            ElementKind::Attachment {
                cardinality: ContractCardinality::One,
                default_value: Vec::new(),
            },
        )
    }

    pub fn team(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(
            key,
            label,
            ElementKind::Team {
                cardinality: ContractCardinality::One,
                default_value: Vec::new(),
            },
        )
    }

    pub fn expectations(
        key: impl Into<String>,
        label: impl Into<String>,
        predefined: Vec<PredefinedExpectation>,
    ) -> Self {
        Self::new(
            key,
            label,
            ElementKind::Expectation {
                cardinality: ContractCardinality::Multiple,
                default_value: Vec::new(),
                predefined_expectations: predefined,
            },
        )
    }

    pub fn asset(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(
            key,
            label,
            ElementKind::Asset {
                cardinality: ContractCardinality::One,
                default_value: Vec::new(),
            },
        )
    }

    pub fn asset_group(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(
            key,
            label,
            ElementKind::AssetGroup {
                cardinality: ContractCardinality::One,
                default_value: Vec::new(),
            },
        )
    }

    pub fn payload(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(
            key,
            label,
            ElementKind::Payload {
                cardinality: ContractCardinality::One,
                default_value: Vec::new(),
            },
        )
    }

    pub fn contract_type(&self) -> ContractType {
        self.kind.contract_type()
    }

    /// Set the cardinality. Checkboxes have none and are left unchanged.
    pub fn cardinality(mut self, value: ContractCardinality) -> Self {
        match &mut self.kind {
            ElementKind::Checkbox { .. } => {}
            ElementKind::Text { cardinality, .. }
            | ElementKind::Textarea { cardinality, .. }
            | ElementKind::Tuple { cardinality, .. }
            | ElementKind::Select { cardinality, .. }
            | ElementKind::Attachment { cardinality, .. }
            | ElementKind::Team { cardinality, .. }
            | ElementKind::Expectation { cardinality, .. }
            | ElementKind::Asset { cardinality, .. }
            | ElementKind::AssetGroup { cardinality, .. }
            | ElementKind::Payload { cardinality, .. } => *cardinality = value,
        }
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Show this field only when `field` holds one of `values`.
    pub fn linked_to<I, S>(mut self, field: ContractElement, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.linked_fields.push(field);
        self.linked_values.extend(values.into_iter().map(Into::into));
        self
    }
}

// ── Contracts ────────────────────────────────────────────────────────

/// Display settings shared by all contracts of an injector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractConfig {
    #[serde(rename = "type")]
    pub contract_type: String,
    pub expose: bool,
    pub label: Labels,
    pub color_dark: String,
    pub color_light: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub contract_id: String,
    pub label: Labels,
    pub fields: Vec<ContractElement>,
    pub config: ContractConfig,
    pub manual: bool,
    pub variables: Vec<ContractVariable>,
    pub contract_attack_patterns_external_ids: Vec<String>,
    pub is_atomic_testing: bool,
    pub platforms: Vec<String>,
}

impl Contract {
    /// Contract with the standard template variables, usable in atomic
    /// testing.
    pub fn new(
        contract_id: impl Into<String>,
        label: Labels,
        config: ContractConfig,
        fields: Vec<ContractElement>,
    ) -> Self {
        Self {
            contract_id: contract_id.into(),
            label,
            fields,
            config,
            manual: false,
            variables: variables::default_variables(),
            contract_attack_patterns_external_ids: Vec::new(),
            is_atomic_testing: true,
            platforms: Vec::new(),
        }
    }

    pub fn add_attack_pattern(&mut self, external_id: impl Into<String>) {
        self.contract_attack_patterns_external_ids.push(external_id.into());
    }

    pub fn add_variable(&mut self, variable: ContractVariable) {
        self.variables.push(variable);
    }

    pub fn platforms<I, S>(mut self, platforms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.platforms = platforms.into_iter().map(Into::into).collect();
        self
    }

    /// Registration envelope; the full contract travels as a JSON string.
    pub fn to_registration(&self) -> Result<Value, ClientError> {
        Ok(json!({
            "contract_id": self.contract_id,
            "contract_labels": self.label,
            "contract_attack_patterns_external_ids": self.contract_attack_patterns_external_ids,
            "contract_content": serde_json::to_string(self)?,
            "contract_platforms": self.platforms,
        }))
    }
}

/// The `injector_contracts` payload for a set of contracts.
pub fn prepare_contracts(contracts: &[Contract]) -> Result<Value, ClientError> {
    contracts
        .iter()
        .map(Contract::to_registration)
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}
