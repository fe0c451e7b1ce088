//! Ordered provisioning pipeline: validate → compile → program.
//!
//! Fail-fast: each stage runs only if the previous one succeeded, and
//! every stage error is normalized into a [`PipelineOutcome`] here. The
//! pipeline never propagates a raw error to its caller; the outcome's
//! status text is what the operator sees.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::descriptor::{self, InstrumentProfile};
use crate::toolchain::Toolchain;

/// One stage of the provisioning sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validate,
    Compile,
    Program,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Validate => write!(f, "validate"),
            Stage::Compile => write!(f, "compile"),
            Stage::Program => write!(f, "program"),
        }
    }
}

/// Result of one full pipeline run, produced once per mount cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Success {
        task_file: PathBuf,
    },
    Failure {
        stage: Stage,
        reason: String,
    },
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PipelineOutcome::Success { .. })
    }

    /// Operator-facing status text for this outcome.
    pub fn status_text(&self) -> String {
        match self {
            PipelineOutcome::Success { task_file } => {
                format!("Successfully programmed task from {}", task_file.display())
            }
            PipelineOutcome::Failure { stage: Stage::Validate, reason } => {
                format!("Failed to validate the task file. {reason}")
            }
            PipelineOutcome::Failure { stage: Stage::Compile, reason } => {
                format!("Failed to compile task. {reason}")
            }
            PipelineOutcome::Failure { stage: Stage::Program, reason } => {
                format!("Failed to program task. {reason}")
            }
        }
    }
}

/// Runs the validate → compile → program sequence for one task file.
pub struct ProvisioningPipeline<T: Toolchain> {
    toolchain: T,
}

impl<T: Toolchain> ProvisioningPipeline<T> {
    pub fn new(toolchain: T) -> Self {
        Self { toolchain }
    }

    /// Run the full sequence, yielding exactly one outcome.
    pub async fn run(&self, task_file: &Path, profile: &InstrumentProfile) -> PipelineOutcome {
        let descriptor = match descriptor::validate(task_file, profile) {
            Ok(d) => d,
            Err(e) => {
                return PipelineOutcome::Failure {
                    stage: Stage::Validate,
                    reason: e.to_string(),
                };
            }
        };
        debug!(
            task_file = %task_file.display(),
            instruments = descriptor.discovered_instruments.len(),
            "task descriptor validated"
        );

        if let Err(e) = self.toolchain.compile(task_file).await {
            return PipelineOutcome::Failure {
                stage: Stage::Compile,
                reason: e.to_string(),
            };
        }

        if let Err(e) = self.toolchain.program(task_file).await {
            return PipelineOutcome::Failure {
                stage: Stage::Program,
                reason: e.to_string(),
            };
        }

        PipelineOutcome::Success {
            task_file: descriptor.file_path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts invocations and fails on demand.
    struct MockToolchain {
        compile_calls: AtomicUsize,
        program_calls: AtomicUsize,
        compile_fails: bool,
        program_fails: bool,
    }

    impl MockToolchain {
        fn new(compile_fails: bool, program_fails: bool) -> Self {
            Self {
                compile_calls: AtomicUsize::new(0),
                program_calls: AtomicUsize::new(0),
                compile_fails,
                program_fails,
            }
        }

        fn fail(&self, tool: &str) -> Result<(), ToolError> {
            Err(ToolError::Failed {
                tool: tool.to_string(),
                status: "exit status: 1".to_string(),
                detail: "mock failure".to_string(),
            })
        }
    }

    #[async_trait]
    impl Toolchain for &MockToolchain {
        async fn compile(&self, _task_file: &Path) -> Result<(), ToolError> {
            self.compile_calls.fetch_add(1, Ordering::SeqCst);
            if self.compile_fails { self.fail("compile") } else { Ok(()) }
        }

        async fn program(&self, _task_file: &Path) -> Result<(), ToolError> {
            self.program_calls.fetch_add(1, Ordering::SeqCst);
            if self.program_fails { self.fail("program") } else { Ok(()) }
        }
    }

    fn profile() -> InstrumentProfile {
        InstrumentProfile::new(HashMap::from([("X".to_string(), 1)])).unwrap()
    }

    fn descriptor_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            b"<Xidml><Instrumentation><InstrumentSet>\
              <Instrument><Manufacturer><PartReference>X</PartReference></Manufacturer></Instrument>\
              </InstrumentSet></Instrumentation></Xidml>",
        )
        .unwrap();
        file
    }

    #[tokio::test]
    async fn test_all_stages_succeed() {
        let file = descriptor_file();
        let tools = MockToolchain::new(false, false);
        let outcome = ProvisioningPipeline::new(&tools).run(file.path(), &profile()).await;
        assert!(outcome.is_success());
        assert!(outcome.status_text().contains("Successfully programmed task from"));
        assert_eq!(tools.compile_calls.load(Ordering::SeqCst), 1);
        assert_eq!(tools.program_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_validation_failure_skips_tools() {
        let tools = MockToolchain::new(false, false);
        let outcome = ProvisioningPipeline::new(&tools)
            .run(Path::new("/mnt/usbkey/absent.xidml"), &profile())
            .await;
        match &outcome {
            PipelineOutcome::Failure { stage, reason } => {
                assert_eq!(*stage, Stage::Validate);
                assert!(reason.contains("could not find expected task file"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
        // Fail-fast: neither tool was ever invoked.
        assert_eq!(tools.compile_calls.load(Ordering::SeqCst), 0);
        assert_eq!(tools.program_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_compile_failure_skips_program() {
        let file = descriptor_file();
        let tools = MockToolchain::new(true, false);
        let outcome = ProvisioningPipeline::new(&tools).run(file.path(), &profile()).await;
        assert_eq!(
            outcome,
            PipelineOutcome::Failure {
                stage: Stage::Compile,
                reason: "compile failed (exit status: 1): mock failure".to_string(),
            }
        );
        assert_eq!(tools.program_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_program_failure_reported() {
        let file = descriptor_file();
        let tools = MockToolchain::new(false, true);
        let outcome = ProvisioningPipeline::new(&tools).run(file.path(), &profile()).await;
        match &outcome {
            PipelineOutcome::Failure { stage, .. } => assert_eq!(*stage, Stage::Program),
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(outcome.status_text().starts_with("Failed to program task."));
        assert_eq!(tools.compile_calls.load(Ordering::SeqCst), 1);
        assert_eq!(tools.program_calls.load(Ordering::SeqCst), 1);
    }
}
