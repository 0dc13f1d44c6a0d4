//! Error types for fleetaudit-exec

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while running a pipeline
#[derive(Error, Debug, Clone)]
pub enum ExecError {
    /// Failed to spawn the shell process
    #[error("failed to spawn process: {0}")]
    SpawnError(String),

    /// I/O error while waiting for the process
    #[error("I/O error: {0}")]
    IoError(String),

    /// Pipeline exceeded its deadline
    #[error("command timed out after {timeout:?}")]
    Timeout {
        /// Timeout duration that was exceeded
        timeout: Duration,
    },
}
