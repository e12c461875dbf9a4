use uuid::Uuid;

/// Errors produced by the store layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("attempt {0} is already complete")]
    AlreadyComplete(Uuid),

    /// A versioned write lost the race against another writer.
    #[error("attempt {0} was modified concurrently")]
    Conflict(Uuid),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database connection lock poisoned")]
    Poisoned,

    /// The worker running the store call panicked or was cancelled.
    #[error("store task failed: {0}")]
    Task(String),
}

impl StoreError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::AlreadyComplete(_) => "already_complete",
            Self::Conflict(_) => "conflict",
            Self::Validation(_) => "validation",
            Self::Sqlite(_) => "database",
            Self::Json(_) => "serialization",
            Self::Poisoned | Self::Task(_) => "database",
        }
    }
}
