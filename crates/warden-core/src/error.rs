//! Core error types for warden-core

use thiserror::Error;
use warden_exec::ExecError;

/// Errors raised while setting up a supervisor
#[derive(Error, Debug, Clone)]
pub enum CoreError {
    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigError(String),
}

/// Errors from the host collaborator layer (queries and actions)
#[derive(Error, Debug, Clone)]
pub enum HostError {
    /// The command could not be run or did not finish in time
    #[error("execution error: {0}")]
    Exec(#[from] ExecError),

    /// Command ran but reported failure
    #[error("command failed: {status} - {stderr}")]
    CommandFailed {
        /// Exit status
        status: i32,
        /// Stderr output
        stderr: String,
    },

    /// Command output could not be interpreted
    #[error("parse error: {0}")]
    ParseError(String),
}

impl HostError {
    /// Check if the underlying call ran out of time
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, HostError::Exec(e) if e.is_timeout())
    }
}

/// Errors from the restart ledger
#[derive(Error, Debug, Clone)]
pub enum LedgerError {
    /// Persisted entry is malformed; callers treat it as absent
    #[error("corrupt ledger entry: {0:?}")]
    Corrupt(String),

    /// Entry could not be written; the pending action must be skipped
    #[error("failed to persist ledger entry {target}: {reason}")]
    Persistence {
        /// Location that could not be written
        target: String,
        /// Underlying error
        reason: String,
    },
}
