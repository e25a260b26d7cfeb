use common::{CaseOutcome, CaseResult, EngineConfig, TestCase};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::compare::outputs_match;
use crate::sandbox::error::SandboxError;
use crate::sandbox::{ExecutionLimits, RawExecution, SandboxRunner};

/// Limits the harness derives per-case sandbox limits from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarnessSettings {
    pub case_timeout: Duration,
    pub compile_timeout: Duration,
    pub memory_limit_kb: u64,
    pub max_output_bytes: usize,
    pub aggregate_overhead: Duration,
    /// Fixed per-submission budget; computed from the cases when `None`.
    pub submission_timeout: Option<Duration>,
}

impl From<&EngineConfig> for HarnessSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            case_timeout: config.case_timeout(),
            compile_timeout: config.compile_timeout(),
            memory_limit_kb: config.memory_limit_kb,
            max_output_bytes: config.max_output_bytes,
            aggregate_overhead: config.aggregate_overhead(),
            submission_timeout: config.submission_timeout(),
        }
    }
}

/// What the harness needs to evaluate a submission.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationJob<'a> {
    pub submission_id: Uuid,
    pub language: &'a str,
    pub source_code: &'a str,
    /// In the problem's declared order.
    pub test_cases: &'a [TestCase],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarnessOutcome {
    /// Every case has a result, in declared order.
    Evaluated {
        case_results: Vec<CaseResult>,
        aggregate_timed_out: bool,
    },
    /// The source did not compile; no case was evaluated.
    CompileError { output: String },
    Cancelled,
    /// The sandbox could not be used. Detail is for logs only.
    Fault(String),
}

/// Drives a [`SandboxRunner`] across every test case of a submission.
#[derive(Clone)]
pub struct TestHarness {
    sandbox: Arc<dyn SandboxRunner>,
    settings: HarnessSettings,
}

impl TestHarness {
    pub fn new(sandbox: Arc<dyn SandboxRunner>, settings: HarnessSettings) -> Self {
        Self { sandbox, settings }
    }

    pub fn sandbox(&self) -> &Arc<dyn SandboxRunner> {
        &self.sandbox
    }

    fn case_timeout(&self, case: &TestCase) -> Duration {
        case.timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(self.settings.case_timeout)
    }

    /// Wall-clock budget of a whole submission.
    pub fn submission_budget(&self, language: &str, test_cases: &[TestCase]) -> Duration {
        if let Some(fixed) = self.settings.submission_timeout {
            return fixed;
        }
        let compile = if self.sandbox.requires_compile(language) {
            self.settings.compile_timeout
        } else {
            Duration::ZERO
        };
        test_cases
            .iter()
            .map(|case| self.case_timeout(case) + compile)
            .sum::<Duration>()
            + self.settings.aggregate_overhead
    }

    #[instrument(skip_all, fields(submission_id = %job.submission_id, language = job.language))]
    pub async fn evaluate(&self, job: EvaluationJob<'_>, cancel: &CancellationToken) -> HarnessOutcome {
        let deadline = Instant::now() + self.submission_budget(job.language, job.test_cases);
        let mut case_results = Vec::with_capacity(job.test_cases.len());
        let mut aggregate_timed_out = false;

        for case in job.test_cases {
            if cancel.is_cancelled() {
                return HarnessOutcome::Cancelled;
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                aggregate_timed_out = true;
                case_results.push(CaseResult::new(case, CaseOutcome::Timeout));
                continue;
            }

            let case_timeout = self.case_timeout(case);
            let limits = ExecutionLimits {
                timeout: case_timeout.min(remaining),
                compile_timeout: self.settings.compile_timeout.min(remaining),
                memory_limit_kb: self.settings.memory_limit_kb,
                max_output_bytes: self.settings.max_output_bytes,
            };

            let raw = match self
                .sandbox
                .run(job.language, job.source_code, &case.input, &limits, cancel)
                .await
            {
                Ok(raw) => raw,
                Err(SandboxError::Cancelled) => return HarnessOutcome::Cancelled,
                Err(SandboxError::Execution(detail)) => {
                    warn!(test_case_id = %case.id, detail = %detail, "Sandbox execution failed");
                    case_results.push(CaseResult::new(case, CaseOutcome::InternalError));
                    continue;
                }
                Err(err) => return HarnessOutcome::Fault(err.to_string()),
            };

            if raw.compile_failed() {
                return HarnessOutcome::CompileError {
                    output: raw.diagnostics().trim_end().to_string(),
                };
            }
            if raw.timed_out && limits.timeout < case_timeout {
                aggregate_timed_out = true;
            }

            let outcome = classify(&raw, &case.expected_output);
            debug!(test_case_id = %case.id, outcome = ?outcome, elapsed_ms = raw.elapsed_ms, "Case evaluated");
            case_results.push(
                CaseResult::new(case, outcome)
                    .with_output(raw.stdout.trim_end())
                    .with_usage(raw.elapsed_ms, raw.peak_memory_kb)
                    .with_stderr(Some(raw.stderr)),
            );
        }

        HarnessOutcome::Evaluated {
            case_results,
            aggregate_timed_out,
        }
    }
}

/// Classify a finished run. A timeout wins over any partial output.
pub fn classify(raw: &RawExecution, expected_output: &str) -> CaseOutcome {
    if raw.timed_out {
        CaseOutcome::Timeout
    } else if !raw.succeeded() {
        CaseOutcome::RuntimeError
    } else if outputs_match(&raw.stdout, expected_output) {
        CaseOutcome::Pass
    } else {
        CaseOutcome::WrongAnswer
    }
}
