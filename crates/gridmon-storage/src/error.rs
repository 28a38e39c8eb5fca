/// Errors that can occur within the storage layer.
///
/// # Examples
///
/// ```rust
/// use gridmon_storage::error::StorageError;
///
/// let err = StorageError::NotFound {
///     entity: "connection",
///     id: "conn-42".to_string(),
/// };
/// assert!(err.to_string().contains("connection"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A required record was not found in the database.
    #[error("Storage: {entity} not found (id={id})")]
    NotFound { entity: &'static str, id: String },

    /// An underlying SQLite error.
    #[error("Storage: SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// JSON serialization or deserialization failure (prediction payloads).
    #[error("Storage: JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A column contained a string that does not parse as its domain enum.
    #[error("Storage: invalid value '{value}' in column '{column}'")]
    InvalidEnum { column: &'static str, value: String },

    /// Generic storage error for cases not covered by other variants.
    #[error("Storage: {0}")]
    Other(String),
}

/// Convenience `Result` alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
