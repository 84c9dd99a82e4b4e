use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("required input file missing: {0}")]
    MissingRequiredFile(String),

    #[error("invalid node ID: {node_id} - {reason}")]
    InvalidNodeId { node_id: String, reason: String },

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
}

impl From<qkg_core::NodeIdError> for StorageError {
    fn from(err: qkg_core::NodeIdError) -> Self {
        StorageError::InvalidNodeId {
            node_id: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
