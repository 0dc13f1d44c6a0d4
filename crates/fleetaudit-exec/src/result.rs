//! Result types for command execution

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Result of a pipeline execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult {
    /// Exit status code (0 for success)
    pub status: i32,
    /// stdout output
    pub stdout: String,
    /// stderr output
    pub stderr: String,
    /// Time taken to execute
    pub duration: Duration,
}

impl CommandResult {
    /// Check if the pipeline succeeded (exit code 0)
    #[must_use]
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// First non-empty stderr line, for use in warning messages.
    ///
    /// Cmdlet errors arrive as multi-line blocks with positional context;
    /// only the first line carries the actual failure.
    #[must_use]
    pub fn stderr_excerpt(&self) -> String {
        self.stderr
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or("no error output")
            .to_string()
    }
}
