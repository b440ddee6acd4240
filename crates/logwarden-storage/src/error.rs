/// Errors that can occur within the storage layer.
///
/// Trait methods return `anyhow::Result` at the collaborator boundary;
/// these variants travel inside it and stay downcastable where a caller
/// cares (alert validation in particular).
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A required record was not found.
    #[error("Storage: {entity} not found (id={id})")]
    NotFound { entity: &'static str, id: String },

    /// Alert configuration failed validation.
    #[error("Storage: invalid alert configuration: {reason}")]
    InvalidAlert { reason: String },

    /// An underlying SQLite error.
    #[error("Storage: SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// JSON serialization or deserialization failure (trigger_data,
    /// notifications_sent, channel config columns).
    #[error("Storage: JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience `Result` alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
