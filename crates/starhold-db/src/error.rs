//! Error types for `Dragonfly` storage.

/// Errors from reading or writing world documents.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// The connection URL was rejected.
    #[error("invalid Dragonfly URL {url:?}: {reason}")]
    InvalidUrl {
        /// The URL as configured.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A command failed on the connection.
    #[error("Dragonfly command failed: {source}")]
    Command {
        /// The underlying client error.
        #[from]
        source: fred::error::Error,
    },

    /// A document could not be encoded for writing.
    #[error("failed to encode {key}: {source}")]
    Encode {
        /// Key being written.
        key: String,
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// A stored document could not be decoded.
    #[error("failed to decode {key}: {source}")]
    Decode {
        /// Key being read.
        key: String,
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// No document is stored at the key.
    #[error("no document at {key}")]
    Missing {
        /// The key that was read.
        key: String,
    },
}
