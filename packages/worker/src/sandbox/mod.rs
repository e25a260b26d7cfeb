pub mod error;
pub mod isolate;
pub mod process;

use async_trait::async_trait;
use common::{SandboxBackend, SandboxConfig};
use error::SandboxError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::language::Toolchains;
pub use isolate::IsolateSandbox;
pub use process::ProcessSandbox;

/// Limits applied to one sandbox invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionLimits {
    /// Wall-clock limit of the run step.
    pub timeout: Duration,
    /// Wall-clock limit of the compile step, if the language has one.
    pub compile_timeout: Duration,
    /// Memory ceiling of the run step, in kilobytes.
    pub memory_limit_kb: u64,
    /// Bytes of stdout and stderr retained each; the rest is discarded.
    pub max_output_bytes: usize,
}

/// Which step of an invocation produced a [`RawExecution`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionPhase {
    Compile,
    Run,
}

/// Raw observations of one sandbox invocation. Classification happens in the harness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawExecution {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
    pub elapsed_ms: u64,
    pub peak_memory_kb: u64,
    pub timed_out: bool,
    pub memory_exceeded: bool,
    /// `Compile` only when the compile step failed or timed out.
    pub phase: ExecutionPhase,
}

impl RawExecution {
    pub fn new(phase: ExecutionPhase) -> Self {
        Self {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: None,
            signal: None,
            elapsed_ms: 0,
            peak_memory_kb: 0,
            timed_out: false,
            memory_exceeded: false,
            phase,
        }
    }

    /// The program exited on its own with status zero.
    pub fn succeeded(&self) -> bool {
        !self.timed_out && !self.memory_exceeded && self.signal.is_none() && self.exit_code == Some(0)
    }

    /// The compile step rejected the source (as opposed to running out of time).
    pub fn compile_failed(&self) -> bool {
        self.phase == ExecutionPhase::Compile && !self.timed_out && !self.succeeded()
    }

    /// Diagnostic text of a failed compile: stderr, or stdout for tools that report there.
    pub fn diagnostics(&self) -> &str {
        if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        }
    }
}

/// Executes one program against one input in a fresh, isolated context.
///
/// Implementations must leave nothing behind once `run` returns, and must
/// tear the program down promptly when `cancel` fires.
#[async_trait]
pub trait SandboxRunner: Send + Sync {
    async fn run(
        &self,
        language: &str,
        source: &str,
        input: &str,
        limits: &ExecutionLimits,
        cancel: &CancellationToken,
    ) -> Result<RawExecution, SandboxError>;

    fn supports_language(&self, language: &str) -> bool;

    fn requires_compile(&self, language: &str) -> bool;

    /// Check once at startup that the host can provide the isolation this
    /// backend promises.
    async fn verify(&self) -> Result<(), SandboxError> {
        Ok(())
    }
}

/// Build the configured backend. `slots` is the maximum number of concurrent runs.
pub fn build_sandbox(
    config: &SandboxConfig,
    toolchains: Toolchains,
    slots: usize,
) -> Arc<dyn SandboxRunner> {
    match config.backend {
        SandboxBackend::Process => Arc::new(ProcessSandbox::new(toolchains, config.clone())),
        SandboxBackend::Isolate => {
            Arc::new(IsolateSandbox::new(toolchains, config.clone(), slots))
        }
    }
}

/// Keep at most `cap` bytes, cutting on a char boundary.
pub(crate) fn truncate_output(mut text: String, cap: usize) -> String {
    if text.len() > cap {
        let mut end = cap;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
    }
    text
}
