use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Broad classes of failure, used by transports to pick a status code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required collaborator is not available; every request fails
    Unavailable,
    /// The caller sent something we cannot score
    ClientInput,
    /// A defect inside the pipeline
    Internal,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Scoring model not loaded: {0}")]
    ModelUnavailable(String),

    #[error("Malformed {source_name} table: {reason}")]
    MalformedInput { source_name: String, reason: String },

    #[error("No {source_name} rows for RUC {key}")]
    NoDataForEntity { source_name: String, key: String },

    #[error("Duplicate rows for RUC {key} in {source_name} table: {count}")]
    DuplicateEntityRows {
        source_name: String,
        key: String,
        count: usize,
    },

    #[error("Row count mismatch: feature block has {tabular} rows, counterpart has {embedding}")]
    RowCountMismatch { tabular: usize, embedding: usize },

    #[error("Invalid row width: expected {expected}, got {actual}")]
    InvalidRowWidth { expected: usize, actual: usize },

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn malformed(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::MalformedInput {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ModelUnavailable(_) => ErrorKind::Unavailable,
            Error::MalformedInput { .. }
            | Error::NoDataForEntity { .. }
            | Error::DuplicateEntityRows { .. } => ErrorKind::ClientInput,
            Error::RowCountMismatch { .. }
            | Error::InvalidRowWidth { .. }
            | Error::Schema(_)
            | Error::Embedding(_)
            | Error::Inference(_)
            | Error::Io(_)
            | Error::Serialization(_) => ErrorKind::Internal,
        }
    }
}
