//! Error types for NetDoc.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetDocError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid test profile: {0}")]
    InvalidProfile(String),

    #[error("Contract violation: {0}")]
    ContractViolation(String),

    #[error("Network backend error: {0}")]
    Backend(String),

    #[error("Report error: {0}")]
    Report(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, NetDocError>;
