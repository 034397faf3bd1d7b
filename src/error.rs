use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("No home directory")]
    NoHomeDir,

    #[error("Planning failed: {0}")]
    Planning(String),

    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    #[error("Execution failed: {0}")]
    Execution(String),

    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("A run is already in progress")]
    RunInProgress,

    #[error("Node not found: {0}")]
    NodeNotFound(crate::core::NodeId),

    #[error("Node {0} is not awaiting approval")]
    NotAwaitingApproval(crate::core::NodeId),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },
}

pub type Result<T> = std::result::Result<T, Error>;
