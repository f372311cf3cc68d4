use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Artifact exists but cannot be read or has an unexpected structure.
    #[error("Corrupt artifact: {0}")]
    Corrupt(String),

    #[error("Knowledge base not loaded")]
    NotReady,

    #[error("Invalid value for '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Vector search failed: {0}")]
    Search(String),
}

impl Error {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation { field: field.into(), message: message.into() }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
