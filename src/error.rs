//! Error types for the daemon library

use thiserror::Error;

/// Errors that cross module boundaries inside the daemon.
///
/// Per-request filesystem failures never show up here: those are marshalled
/// into `(success = false, error)` response fields. This type is for the
/// failures that end a session (stream I/O, schema verification) or abort
/// startup.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Stream or filesystem I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Wire schema verification failure; fatal to the session it occurs on
    #[error("schema verification failed: {0}")]
    Codec(#[from] bincode::Error),

    /// Daemon startup/configuration problem
    #[error("configuration error: {0}")]
    Config(String),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, DaemonError>;
