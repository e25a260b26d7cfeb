pub mod compare;
pub mod harness;
pub mod language;
pub mod sandbox;

pub use harness::{EvaluationJob, HarnessOutcome, HarnessSettings, TestHarness};
pub use language::{LanguageSpec, Toolchains};
pub use sandbox::error::SandboxError;
pub use sandbox::{
    ExecutionLimits, ExecutionPhase, RawExecution, SandboxRunner, build_sandbox,
};
