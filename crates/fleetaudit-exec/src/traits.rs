//! Command runner trait

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ExecError;
use crate::result::CommandResult;

/// Runs a shell pipeline to completion and reports its outcome.
///
/// Implemented by the real PowerShell runner and by scripted fakes in tests.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a pipeline to completion.
    async fn run(&self, cmd: &str) -> Result<CommandResult, ExecError>;

    /// Run a pipeline, failing with [`ExecError::Timeout`] if it exceeds `timeout`.
    async fn run_with_timeout(
        &self,
        cmd: &str,
        timeout: Duration,
    ) -> Result<CommandResult, ExecError>;

    /// Short identifier for logging
    fn runner_type(&self) -> &'static str;
}
