use thiserror::Error;

#[derive(Error, Debug)]
pub enum BasError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config file error: {0}")]
    ConfigFile(#[from] serde_yaml::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Invalid value for configuration '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Missing required configuration: {0}")]
    Missing(String),
}
