//! External compile/program tool invocation.
//!
//! The pipeline does not compile anything itself; it hands the task file
//! to an external tool and records success or failure. [`Toolchain`] is
//! the collaborator seam, [`SubprocessToolchain`] the real subprocess
//! implementation with a bounded deadline per invocation.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::ToolchainConfig;
use crate::error::ToolError;

/// Compile/program collaborator invoked by the provisioning pipeline.
#[async_trait]
pub trait Toolchain: Send + Sync {
    /// Compile the task file. Ok means the tool reported success.
    async fn compile(&self, task_file: &Path) -> Result<(), ToolError>;

    /// Program the compiled task onto the hardware.
    async fn program(&self, task_file: &Path) -> Result<(), ToolError>;
}

/// [`Toolchain`] that runs configured external commands.
///
/// Each command is invoked as `<command> <task-file>` with captured
/// output. An unset command makes that stage a successful no-op.
pub struct SubprocessToolchain {
    compile_command: Option<PathBuf>,
    program_command: Option<PathBuf>,
    timeout: Duration,
}

impl SubprocessToolchain {
    pub fn new(config: &ToolchainConfig) -> Self {
        Self {
            compile_command: config.compile_command.clone(),
            program_command: config.program_command.clone(),
            timeout: config.timeout(),
        }
    }

    async fn invoke(
        &self,
        tool: &str,
        command: Option<&Path>,
        task_file: &Path,
    ) -> Result<(), ToolError> {
        let Some(command) = command else {
            debug!(tool, "no command configured, stage is a no-op");
            return Ok(());
        };

        info!(tool, command = %command.display(), task_file = %task_file.display(), "invoking tool");

        let mut cmd = Command::new(command);
        cmd.arg(task_file)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // A runaway tool is killed when the timeout drops the wait
            // future below.
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| ToolError::Spawn {
            tool: tool.to_string(),
            source: e,
        })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| ToolError::Wait {
                tool: tool.to_string(),
                source: e,
            })?,
            Err(_) => {
                return Err(ToolError::Timeout {
                    tool: tool.to_string(),
                    timeout_secs: self.timeout.as_secs(),
                });
            }
        };

        if output.status.success() {
            debug!(tool, "tool reported success");
            Ok(())
        } else {
            Err(ToolError::Failed {
                tool: tool.to_string(),
                status: output.status.to_string(),
                detail: failure_detail(&output.stderr, &output.stdout),
            })
        }
    }
}

#[async_trait]
impl Toolchain for SubprocessToolchain {
    async fn compile(&self, task_file: &Path) -> Result<(), ToolError> {
        self.invoke("compile", self.compile_command.as_deref(), task_file)
            .await
    }

    async fn program(&self, task_file: &Path) -> Result<(), ToolError> {
        self.invoke("program", self.program_command.as_deref(), task_file)
            .await
    }
}

/// Last line of stderr, falling back to stdout, for the failure message.
fn failure_detail(stderr: &[u8], stdout: &[u8]) -> String {
    let pick = |bytes: &[u8]| -> Option<String> {
        let text = String::from_utf8_lossy(bytes);
        text.lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
    };
    pick(stderr)
        .or_else(|| pick(stdout))
        .unwrap_or_else(|| "no output".to_string())
}
