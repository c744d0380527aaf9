//! Template variables exposed to every contract.

use serde::{Deserialize, Serialize};

pub const USER: &str = "user";
pub const EXERCISE: &str = "exercise";
pub const TEAMS: &str = "teams";
pub const COMCHECK: &str = "comcheck";
pub const PLAYER_URI: &str = "player_uri";
pub const CHALLENGES_URI: &str = "challenges_uri";
pub const SCOREBOARD_URI: &str = "scoreboard_uri";
pub const LESSONS_URI: &str = "lessons_uri";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractCardinality {
    #[serde(rename = "1")]
    One,
    #[serde(rename = "n")]
    Multiple,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariableType {
    String,
    Object,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractVariable {
    pub key: String,
    pub label: String,
    #[serde(rename = "type")]
    pub variable_type: VariableType,
    pub cardinality: ContractCardinality,
    #[serde(default)]
    pub children: Vec<ContractVariable>,
}

impl ContractVariable {
    /// Single-valued string variable.
    pub fn string(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            variable_type: VariableType::String,
            cardinality: ContractCardinality::One,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<ContractVariable>) -> Self {
        self.children = children;
        self
    }
}

fn child(parent: &str, field: &str, label: &str) -> ContractVariable {
    ContractVariable::string(format!("{parent}.{field}"), label)
}

/// The user receiving the inject.
pub fn user_variable() -> ContractVariable {
    ContractVariable::string(USER, "User that will receive the injection").with_children(vec![
        child(USER, "id", "Id of the user in the platform"),
        child(USER, "email", "Email of the user"),
        child(USER, "firstname", "Firstname of the user"),
        child(USER, "lastname", "Lastname of the user"),
        child(USER, "lang", "Lang of the user"),
    ])
}

pub fn exercise_variable() -> ContractVariable {
    ContractVariable {
        variable_type: VariableType::Object,
        ..ContractVariable::string(EXERCISE, "Exercise of the current injection")
    }
    .with_children(vec![
        child(EXERCISE, "id", "Id of the exercise in the platform"),
        child(EXERCISE, "name", "Name of the exercise"),
        child(EXERCISE, "description", "Description of the exercise"),
    ])
}

pub fn team_variable() -> ContractVariable {
    ContractVariable {
        cardinality: ContractCardinality::Multiple,
        ..ContractVariable::string(TEAMS, "List of team name for the injection")
    }
}

/// Links into the platform's player-facing pages.
pub fn uri_variables() -> Vec<ContractVariable> {
    vec![
        ContractVariable::string(PLAYER_URI, "Player interface platform link"),
        ContractVariable::string(CHALLENGES_URI, "Challenges interface platform link"),
        ContractVariable::string(SCOREBOARD_URI, "Scoreboard interface platform link"),
        ContractVariable::string(LESSONS_URI, "Lessons learned interface platform link"),
    ]
}

/// Variables every new contract starts with.
pub fn default_variables() -> Vec<ContractVariable> {
    let mut variables = vec![user_variable(), exercise_variable(), team_variable()];
    variables.extend(uri_variables());
    variables
}
