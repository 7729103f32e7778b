use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// Another operation under the same key is still running.
    #[error("{0} already in progress")]
    Conflict(String),

    #[error("{0} not found")]
    NotFound(String),

    /// Caller input the sheet layer cannot act on.
    #[error("{0}")]
    Invalid(String),

    #[error("sheets gateway error: {0}")]
    Remote(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl SyncError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, SyncError::Conflict(_))
    }
}
