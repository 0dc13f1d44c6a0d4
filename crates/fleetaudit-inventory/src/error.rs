//! Error types for fleetaudit-inventory

use thiserror::Error;

/// Errors that can occur while resolving targets or collecting facts
#[derive(Error, Debug, Clone)]
pub enum InventoryError {
    /// Directory enumeration failed; this is the one fatal error of a run
    #[error("directory query failed: {0}")]
    DirectoryQuery(String),

    /// A remote class-instance query failed on one machine
    #[error("query failed on {machine}: {cause}")]
    QueryFailed {
        /// Target machine name
        machine: String,
        /// Underlying cause
        cause: String,
    },

    /// Both the primary and the legacy transport failed for one retrieval
    #[error("all transports failed on {machine}: primary: {primary}; legacy: {legacy}")]
    AllTransportsFailed {
        /// Target machine name
        machine: String,
        /// Primary transport failure
        primary: String,
        /// Legacy transport failure
        legacy: String,
    },

    /// A query succeeded but returned no usable rows
    #[error("no data returned: {0}")]
    NoData(String),

    /// Failed to parse pipeline JSON output
    #[error("JSON parse error: {0}")]
    ParseError(String),

    /// Shell-level execution error (spawn failure, timeout)
    #[error("execution error: {0}")]
    ExecutionError(String),

    /// Invalid caller-supplied parameters
    #[error("invalid configuration: {0}")]
    ConfigError(String),
}
