use thiserror::Error;

/// Errors that can occur when interacting with the record store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An insert collided with a unique constraint.
    #[error("Duplicate value violates unique constraint {constraint} on {table}")]
    UniqueViolation {
        table: &'static str,
        constraint: String,
    },

    /// A row references, or is still referenced by, a row that blocks the operation.
    #[error("Foreign key violation on {table}: {detail}")]
    ForeignKeyViolation { table: &'static str, detail: String },

    /// The store refused or could not serve the request.
    #[error("Record store unavailable: {0}")]
    Unavailable(String),

    /// A stored row could not be mapped back into the domain model.
    #[error("Corrupt row in {table}: {reason}")]
    CorruptRow { table: &'static str, reason: String },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    /// True when the error is the store's uniqueness guard firing.
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StoreError::UniqueViolation { .. })
    }
}

/// Result type for record store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
