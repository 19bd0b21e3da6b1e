//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure mode during startup, the run, and
//! shutdown so `main` can propagate with `?`.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: starhold_core::ConfigError,
    },

    /// The scheduler could not be built or its final save failed.
    #[error("scheduler error: {source}")]
    Scheduler {
        /// The underlying scheduler error.
        #[from]
        source: starhold_core::SchedulerError,
    },

    /// Connecting to `Dragonfly` failed.
    #[error("database error: {source}")]
    Db {
        /// The underlying database error.
        #[from]
        source: starhold_db::DbError,
    },

    /// The session gateway failed to start or serve.
    #[error("gateway error: {source}")]
    Gateway {
        /// The underlying server error.
        #[from]
        source: starhold_gateway::ServerError,
    },

    /// Installing the Ctrl-C handler failed.
    #[error("signal error: {source}")]
    Signal {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// A background task panicked or was cancelled.
    #[error("task error: {message}")]
    Task {
        /// Description of the task failure.
        message: String,
    },

    /// Seeding the starting world failed.
    #[error("seed error: {message}")]
    Seed {
        /// Description of the seeding failure.
        message: String,
    },
}
