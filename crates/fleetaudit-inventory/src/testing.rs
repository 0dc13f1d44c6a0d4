//! Test doubles shared across unit tests

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use fleetaudit_exec::{CommandResult, CommandRunner, ExecError};

/// Runner that answers pipelines from canned responses.
///
/// Responses are matched by substring against the command, first match wins.
/// Commands with no matching response fail with a non-zero exit.
pub(crate) struct ScriptedRunner {
    responses: Vec<(String, CommandResult)>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self {
            responses: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Register a response for commands containing `needle`
    pub fn on(mut self, needle: &str, result: CommandResult) -> Self {
        self.responses.push((needle.to_string(), result));
        self
    }

    /// Commands seen so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Successful result with the given stdout
    pub fn ok(stdout: &str) -> CommandResult {
        CommandResult {
            status: 0,
            stdout: stdout.to_string(),
            stderr: String::new(),
            duration: Duration::ZERO,
        }
    }

    /// Failed result with the given stderr
    pub fn fail(stderr: &str) -> CommandResult {
        CommandResult {
            status: 1,
            stdout: String::new(),
            stderr: stderr.to_string(),
            duration: Duration::ZERO,
        }
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, cmd: &str) -> Result<CommandResult, ExecError> {
        self.calls.lock().unwrap().push(cmd.to_string());

        for (needle, result) in &self.responses {
            if cmd.contains(needle) {
                return Ok(result.clone());
            }
        }
        Ok(Self::fail("no scripted response for command"))
    }

    async fn run_with_timeout(
        &self,
        cmd: &str,
        _timeout: Duration,
    ) -> Result<CommandResult, ExecError> {
        self.run(cmd).await
    }

    fn runner_type(&self) -> &'static str {
        "scripted"
    }
}
