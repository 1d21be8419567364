//! Executor trait

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ExecError;
use crate::result::CommandResult;

/// Runs shell commands and reports their exit status and captured output.
///
/// A non-zero exit status is not an error: callers inspect
/// [`CommandResult::success`]. `Err` is reserved for commands that could not
/// be run to completion at all.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Run a command to completion
    async fn run(&self, cmd: &str) -> Result<CommandResult, ExecError>;

    /// Run a command, giving up after `timeout`
    async fn run_with_timeout(
        &self,
        cmd: &str,
        timeout: Duration,
    ) -> Result<CommandResult, ExecError>;

    /// Short label used in logs
    fn executor_type(&self) -> &'static str;
}
