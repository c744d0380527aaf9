//! Layered agent configuration.
//!
//! Every configuration key is described by a [`ConfigHint`] saying where its
//! value may be found. Lookup precedence is:
//!
//! 1. `data`: an explicit override set in code (or via [`Configuration::set`])
//! 2. `env`: an environment variable (a `.env` file is loaded first)
//! 3. `file_path`: a nested key path into the YAML config file
//! 4. `default`
//!
//! Empty strings count as absent at every level. String values are coerced:
//! `yes`/`true` become booleans, `no`/`false` too, and keys hinted as numbers
//! are parsed into integers.

use std::collections::HashMap;
use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::BasError;

/// Config file looked up by [`Configuration::load`], relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.yml";

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Whether a string spells a true value (`yes`, `true`, any case).
pub fn is_truthy(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "yes" | "true")
}

/// Whether a string spells a false value (`no`, `false`, any case).
pub fn is_falsy(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "no" | "false")
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

// ── Hints ─────────────────────────────────────────────────────

/// Where to find the value of one configuration key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigHint {
    /// Override value; wins over every other source.
    #[serde(default)]
    pub data: Option<Value>,
    /// Environment variable to read.
    #[serde(default)]
    pub env: Option<String>,
    /// Nested key path into the config file, e.g. `["mq", "use_ssl_ca"]`.
    #[serde(default)]
    pub file_path: Option<Vec<String>>,
    /// Interpret the value as an integer.
    #[serde(default)]
    pub is_number: bool,
    /// Fallback when no source has a value.
    #[serde(default)]
    pub default: Option<Value>,
}

impl ConfigHint {
    /// Hint reading the given environment variable.
    pub fn from_env(var: impl Into<String>) -> Self {
        Self {
            env: Some(var.into()),
            ..Self::default()
        }
    }

    /// Hint with a fixed value.
    pub fn value(data: impl Into<Value>) -> Self {
        Self {
            data: Some(data.into()),
            ..Self::default()
        }
    }

    /// Hint that only carries a default.
    pub fn default_value(default: impl Into<Value>) -> Self {
        Self {
            default: Some(default.into()),
            ..Self::default()
        }
    }

    pub fn with_file_path(mut self, path: &[&str]) -> Self {
        self.file_path = Some(path.iter().map(|p| p.to_string()).collect());
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn number(mut self) -> Self {
        self.is_number = true;
        self
    }
}

// ── Configuration ─────────────────────────────────────────────

/// Key/value configuration resolved through [`ConfigHint`]s.
#[derive(Debug, Clone, Default)]
pub struct Configuration {
    hints: HashMap<String, ConfigHint>,
    values: Map<String, Value>,
}

impl Configuration {
    /// Build a configuration with no file values.
    pub fn new<I, K>(hints: I) -> Self
    where
        I: IntoIterator<Item = (K, ConfigHint)>,
        K: Into<String>,
    {
        Self {
            hints: hints.into_iter().map(|(k, h)| (k.into(), h)).collect(),
            values: Map::new(),
        }
    }

    /// Preload file-style values. Top-level keys replace existing ones.
    pub fn with_values(mut self, values: Value) -> Self {
        if let Value::Object(map) = values {
            self.values.extend(map);
        }
        self
    }

    /// Build a configuration from hints, optional preloaded values and a YAML
    /// file. A missing file is not an error; the file's top-level keys win
    /// over the preloaded values.
    pub fn from_file<I, K>(
        hints: I,
        values: Option<Value>,
        path: impl AsRef<Path>,
    ) -> Result<Self, BasError>
    where
        I: IntoIterator<Item = (K, ConfigHint)>,
        K: Into<String>,
    {
        let mut config = Self::new(hints);
        if let Some(values) = values {
            config = config.with_values(values);
        }

        let path = path.as_ref();
        if path.is_file() {
            let content = std::fs::read_to_string(path)?;
            let file_values: Value = serde_yaml::from_str(&content)?;
            tracing::debug!(path = %path.display(), "loaded config file");
            config = config.with_values(file_values);
        }

        Ok(config)
    }

    /// Load `.env`, then build from hints and `./config.yml`.
    pub fn load<I, K>(hints: I) -> Result<Self, BasError>
    where
        I: IntoIterator<Item = (K, ConfigHint)>,
        K: Into<String>,
    {
        load_dotenv();
        Self::from_file(hints, None, DEFAULT_CONFIG_FILE)
    }

    /// Resolve a key. Unknown keys resolve to `None`.
    pub fn get(&self, key: &str) -> Result<Option<Value>, BasError> {
        let Some(hint) = self.hints.get(key) else {
            return Ok(None);
        };

        let raw = match hint.data.as_ref().filter(|v| !is_blank(v)) {
            Some(data) => Some(data.clone()),
            None => self.dig(hint),
        };

        match raw {
            Some(value) => coerce(key, value, hint.is_number),
            None => Ok(None),
        }
    }

    /// Resolve a key as a string. Numbers and booleans are rendered.
    pub fn get_str(&self, key: &str) -> Result<Option<String>, BasError> {
        Ok(self.get(key)?.map(|v| match v {
            Value::String(s) => s,
            other => other.to_string(),
        }))
    }

    pub fn get_i64(&self, key: &str) -> Result<Option<i64>, BasError> {
        match self.get(key)? {
            None => Ok(None),
            Some(Value::Number(n)) => n.as_i64().map(Some).ok_or_else(|| invalid(key, "not an integer")),
            Some(Value::String(s)) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| invalid(key, &format!("'{s}' is not an integer"))),
            Some(other) => Err(invalid(key, &format!("expected an integer, found {other}"))),
        }
    }

    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, BasError> {
        match self.get(key)? {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(b)),
            Some(Value::Number(n)) => Ok(Some(n.as_i64().unwrap_or_default() != 0)),
            Some(other) => Err(invalid(key, &format!("expected a boolean, found {other}"))),
        }
    }

    /// Resolve a key that must be present.
    pub fn require_str(&self, key: &str) -> Result<String, BasError> {
        self.get_str(key)?.ok_or_else(|| BasError::Missing(key.to_string()))
    }

    /// First non-empty string among `keys`, in order.
    pub fn first_str(&self, keys: &[&str]) -> Result<Option<String>, BasError> {
        for key in keys {
            if let Some(v) = self.get_str(key)? {
                return Ok(Some(v));
            }
        }
        Ok(None)
    }

    /// Override a key at runtime. Unknown keys are added.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.hints.entry(key.to_string()).or_default().data = Some(value.into());
    }

    /// Whether a hint exists for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.hints.contains_key(key)
    }

    /// Register extra hints. Keys that already have a hint keep it.
    pub fn add_hints<I, K>(&mut self, hints: I)
    where
        I: IntoIterator<Item = (K, ConfigHint)>,
        K: Into<String>,
    {
        for (key, hint) in hints {
            self.hints.entry(key.into()).or_insert(hint);
        }
    }

    fn dig(&self, hint: &ConfigHint) -> Option<Value> {
        if let Some(v) = hint.env.as_deref().and_then(env_opt) {
            return Some(Value::String(v));
        }

        if let Some(v) = hint.file_path.as_deref().and_then(|path| self.lookup(path)) {
            return Some(v);
        }

        hint.default.clone().filter(|v| !is_blank(v))
    }

    fn lookup(&self, path: &[String]) -> Option<Value> {
        let (first, rest) = path.split_first()?;
        let mut current = self.values.get(first)?;
        for segment in rest {
            current = current.as_object()?.get(segment)?;
        }
        Some(current.clone()).filter(|v| !is_blank(v))
    }
}

fn invalid(key: &str, reason: &str) -> BasError {
    BasError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn coerce(key: &str, value: Value, is_number: bool) -> Result<Option<Value>, BasError> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) if is_number => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .map(|i| Some(Value::from(i)))
            .ok_or_else(|| invalid(key, "not a number")),
        Value::Bool(b) if is_number => Ok(Some(Value::from(i64::from(b)))),
        Value::String(s) => {
            if is_number {
                return s
                    .trim()
                    .parse::<i64>()
                    .map(|i| Some(Value::from(i)))
                    .map_err(|_| invalid(key, &format!("'{s}' is not a number")));
            }
            if is_truthy(&s) {
                Ok(Some(Value::Bool(true)))
            } else if is_falsy(&s) {
                Ok(Some(Value::Bool(false)))
            } else if s.is_empty() {
                Ok(None)
            } else {
                Ok(Some(Value::String(s)))
            }
        }
        other => Ok(Some(other)),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serde_json::json;

    use super::*;

    #[test]
    fn truthy_and_falsy_are_case_insensitive() {
        assert!(is_truthy("Yes"));
        assert!(is_truthy("TRUE"));
        assert!(is_falsy("no"));
        assert!(is_falsy("False"));
        assert!(!is_truthy("1"));
    }

    #[test]
    fn unknown_key_is_none() {
        let config = Configuration::new(Vec::<(String, ConfigHint)>::new());
        assert_eq!(config.get("nope").unwrap(), None);
    }

    #[test]
    fn data_wins_over_env_and_default() {
        std::env::set_var("BAS_TEST_DATA_WINS", "from-env");
        let config = Configuration::new([(
            "key",
            ConfigHint {
                data: Some(json!("from-data")),
                env: Some("BAS_TEST_DATA_WINS".into()),
                default: Some(json!("from-default")),
                ..ConfigHint::default()
            },
        )]);
        assert_eq!(config.get_str("key").unwrap().as_deref(), Some("from-data"));
    }

    #[test]
    fn env_wins_over_file() {
        std::env::set_var("BAS_TEST_ENV_WINS", "from-env");
        let config = Configuration::new([(
            "key",
            ConfigHint::from_env("BAS_TEST_ENV_WINS").with_file_path(&["section", "key"]),
        )])
        .with_values(json!({"section": {"key": "from-file"}}));
        assert_eq!(config.get_str("key").unwrap().as_deref(), Some("from-env"));
    }

    #[test]
    fn empty_env_falls_through_to_default() {
        std::env::set_var("BAS_TEST_EMPTY_ENV", "");
        let config = Configuration::new([(
            "key",
            ConfigHint::from_env("BAS_TEST_EMPTY_ENV").with_default("fallback"),
        )]);
        assert_eq!(config.get_str("key").unwrap().as_deref(), Some("fallback"));
    }

    #[test]
    fn file_values_are_read_from_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bas:\n  url: http://bas.local\n  token: secret\ncollector:\n  period: '120'").unwrap();

        let config = Configuration::from_file(
            [
                ("url", ConfigHint::from_env("BAS_TEST_UNSET_URL").with_file_path(&["bas", "url"])),
                ("period", ConfigHint::default().with_file_path(&["collector", "period"]).number()),
            ],
            None,
            file.path(),
        )
        .unwrap();

        assert_eq!(config.get_str("url").unwrap().as_deref(), Some("http://bas.local"));
        assert_eq!(config.get_i64("period").unwrap(), Some(120));
    }

    #[test]
    fn file_overrides_preloaded_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "mq:\n  host: file-host").unwrap();

        let config = Configuration::from_file(
            [("host", ConfigHint::default().with_file_path(&["mq", "host"]))],
            Some(json!({"mq": {"host": "preloaded-host"}})),
            file.path(),
        )
        .unwrap();
        assert_eq!(config.get_str("host").unwrap().as_deref(), Some("file-host"));
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let config = Configuration::from_file(
            [("k", ConfigHint::default_value("v"))],
            None,
            "/definitely/not/here/config.yml",
        )
        .unwrap();
        assert_eq!(config.get_str("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn strings_are_coerced() {
        let config = Configuration::new([
            ("yes", ConfigHint::value("yes")),
            ("off", ConfigHint::value("False")),
            ("num", ConfigHint::value("42").number()),
            ("plain", ConfigHint::value("hello")),
        ]);
        assert_eq!(config.get_bool("yes").unwrap(), Some(true));
        assert_eq!(config.get_bool("off").unwrap(), Some(false));
        assert_eq!(config.get("num").unwrap(), Some(json!(42)));
        assert_eq!(config.get("plain").unwrap(), Some(json!("hello")));
    }

    #[test]
    fn bad_number_is_an_error() {
        let config = Configuration::new([("num", ConfigHint::value("forty").number())]);
        assert!(matches!(config.get("num"), Err(BasError::InvalidValue { .. })));
    }

    #[test]
    fn set_overrides_and_adds() {
        let mut config = Configuration::new([("period", ConfigHint::default_value(60))]);
        config.set("period", 30);
        config.set("extra", "added");
        assert_eq!(config.get_i64("period").unwrap(), Some(30));
        assert_eq!(config.get_str("extra").unwrap().as_deref(), Some("added"));
    }

    #[test]
    fn first_str_takes_first_present() {
        let config = Configuration::new([
            ("collector_id", ConfigHint::value("c-1")),
            ("injector_id", ConfigHint::value("i-1")),
        ]);
        assert_eq!(
            config.first_str(&["id", "collector_id", "injector_id"]).unwrap().as_deref(),
            Some("c-1")
        );
    }

    #[test]
    fn add_hints_keeps_existing() {
        let mut config = Configuration::new([("host", ConfigHint::value("mine"))]);
        config.add_hints([
            ("host", ConfigHint::value("theirs")),
            ("port", ConfigHint::default_value(5672)),
        ]);
        assert_eq!(config.get_str("host").unwrap().as_deref(), Some("mine"));
        assert_eq!(config.get_i64("port").unwrap(), Some(5672));
    }

    #[test]
    fn require_str_reports_missing_key() {
        let config = Configuration::new([("url", ConfigHint::default())]);
        assert!(matches!(config.require_str("url"), Err(BasError::Missing(k)) if k == "url"));
    }
}
