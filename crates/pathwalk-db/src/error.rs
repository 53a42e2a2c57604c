//! Error types for the data layer.
//!
//! [`DbError`] wraps the underlying [`sqlx`] errors. At the engine seam it
//! is converted into a [`StoreError`] so the engine never sees `sqlx`
//! types.

use pathwalk_core::StoreError;

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A row held a value the engine cannot represent.
    #[error("invalid row: {0}")]
    InvalidRow(String),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DbError {
    /// Convert into a selection-side [`StoreError`].
    pub fn into_unavailable(self) -> StoreError {
        StoreError::Unavailable {
            message: self.to_string(),
        }
    }

    /// Convert into a commit-side [`StoreError`].
    pub fn into_commit(self) -> StoreError {
        StoreError::Commit {
            message: self.to_string(),
        }
    }
}
