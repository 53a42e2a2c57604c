//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure that can stop the process, so `main`
//! can propagate with `?` and exit non-zero.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: pathwalk_core::ConfigError,
    },

    /// Database connection or migration failed.
    #[error("database error: {source}")]
    Db {
        /// The underlying database error.
        #[from]
        source: pathwalk_db::DbError,
    },

    /// A single pass could not select walkers.
    #[error("pass error: {source}")]
    Pass {
        /// The underlying pass error.
        #[from]
        source: pathwalk_core::PassError,
    },

    /// NATS connection or publishing failed.
    #[error("NATS error: {message}")]
    Nats {
        /// Description of the NATS failure.
        message: String,
    },

    /// Logging could not be initialized.
    #[error("logging error: {message}")]
    Logging {
        /// Description of the failure.
        message: String,
    },
}
