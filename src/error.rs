//! Error types for prover-watch

use thiserror::Error;

/// Result type for prover-watch operations
pub type Result<T> = std::result::Result<T, WatchError>;

/// prover-watch error types
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Prover roster is empty")]
    EmptyRoster,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid prover id {id:?}: {reason}")]
    InvalidId { id: String, reason: String },

    #[error("Discovery error: {0}")]
    Discovery(String),

    #[error("Runtime error: {op} {id} failed: {message}")]
    Runtime {
        op: &'static str,
        id: String,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl WatchError {
    /// Whether this error comes from bad configuration rather than from
    /// the runtime or discovery boundaries
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            WatchError::EmptyRoster
                | WatchError::InvalidConfig(_)
                | WatchError::InvalidId { .. }
                | WatchError::Yaml(_)
        )
    }
}
