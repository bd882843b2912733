use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Item or message absent from both the standalone and batch tables.
    #[error("Item not found")]
    NotFound,

    /// No batch resolves to the given name.
    #[error("Batch '{0}' not found")]
    BatchNotFound(String),

    /// A batch with a case-insensitively matching name already exists.
    #[error("Batch '{0}' already exists")]
    DuplicateBatch(String),

    /// A creator-only mutation was attempted by someone else.
    #[error("Only the batch creator may do that")]
    Forbidden,

    /// Empty required field, malformed date, bad token, and the like.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
