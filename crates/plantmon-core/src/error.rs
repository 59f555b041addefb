//! Error types for plantmon-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Duplicate node id: {0}")]
    DuplicateId(String),

    #[error("Empty node id (parent: {parent})")]
    EmptyId { parent: String },

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Hierarchy parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
