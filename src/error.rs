use thiserror::Error;

use crate::models::task::TaskStatus;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Task '{0}' already exists")]
    DuplicateName(String),

    #[error("Task '{0}' not found")]
    NotFound(String),

    #[error("Task '{name}' cannot move from {from} to {to}")]
    IllegalTransition {
        name: String,
        from: TaskStatus,
        to: TaskStatus,
    },
}

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {code}: {body}")]
    Status { code: u16, body: String },

    #[error("Empty response")]
    EmptyResponse,

    #[error("API key variable {0} not set")]
    MissingApiKey(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IngestError {
    #[error("Input queue is full. Please try again later.")]
    Full,

    #[error("Input queue is closed")]
    Closed,
}

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
