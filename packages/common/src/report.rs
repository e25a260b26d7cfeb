use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::problem::TestCase;
use crate::submission_status::SubmissionState;

/// Classification of a single test case run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "PascalCase")]
pub enum CaseOutcome {
    Pass,
    WrongAnswer,
    RuntimeError,
    CompileError,
    Timeout,
    InternalError,
}

impl CaseOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }

    /// Used to pick the headline outcome of a report. Higher is worse.
    pub fn severity(&self) -> u8 {
        match self {
            Self::Pass => 0,
            Self::WrongAnswer => 1,
            Self::Timeout => 2,
            Self::RuntimeError => 3,
            Self::CompileError => 4,
            Self::InternalError => 5,
        }
    }
}

/// Outcome of running one test case against a submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CaseResult {
    pub test_case_id: String,
    /// Program stdout with trailing whitespace removed.
    pub actual_output: String,
    pub passed: bool,
    pub elapsed_ms: u64,
    pub peak_memory_kb: u64,
    pub outcome: CaseOutcome,
    pub hidden: bool,
    pub weight: u32,
    /// Program stderr, if any was produced.
    pub stderr: Option<String>,
}

impl CaseResult {
    pub fn new(test_case: &TestCase, outcome: CaseOutcome) -> Self {
        Self {
            test_case_id: test_case.id.clone(),
            actual_output: String::new(),
            passed: outcome.is_pass(),
            elapsed_ms: 0,
            peak_memory_kb: 0,
            outcome,
            hidden: test_case.hidden,
            weight: test_case.weight,
            stderr: None,
        }
    }

    pub fn with_output(mut self, actual_output: impl Into<String>) -> Self {
        self.actual_output = actual_output.into();
        self
    }

    pub fn with_usage(mut self, elapsed_ms: u64, peak_memory_kb: u64) -> Self {
        self.elapsed_ms = elapsed_ms;
        self.peak_memory_kb = peak_memory_kb;
        self
    }

    pub fn with_stderr(mut self, stderr: Option<String>) -> Self {
        self.stderr = stderr.filter(|s| !s.is_empty());
        self
    }
}

/// Sealed evaluation report of one submission.
///
/// Only constructed through [`SubmissionReport::seal`]; there are no mutating
/// accessors, so a report can be shared freely once finalized.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SubmissionReport {
    submission_id: Uuid,
    status: SubmissionState,
    case_results: Vec<CaseResult>,
    passed_count: usize,
    total_count: usize,
    finalized: bool,
    earned_weight: u32,
    total_weight: u32,
    max_elapsed_ms: u64,
    max_memory_kb: u64,
    compile_output: Option<String>,
    aggregate_timed_out: bool,
}

impl SubmissionReport {
    /// Seal case results into a finalized report.
    ///
    /// `status` must be a graded terminal state.
    pub fn seal(
        submission_id: Uuid,
        status: SubmissionState,
        case_results: Vec<CaseResult>,
        compile_output: Option<String>,
        aggregate_timed_out: bool,
    ) -> Self {
        debug_assert!(status.is_graded(), "reports are sealed only for graded states");

        let passed_count = case_results.iter().filter(|r| r.outcome.is_pass()).count();
        let earned_weight = case_results
            .iter()
            .filter(|r| r.outcome.is_pass())
            .map(|r| r.weight)
            .sum();
        let total_weight = case_results.iter().map(|r| r.weight).sum();
        let max_elapsed_ms = case_results.iter().map(|r| r.elapsed_ms).max().unwrap_or(0);
        let max_memory_kb = case_results
            .iter()
            .map(|r| r.peak_memory_kb)
            .max()
            .unwrap_or(0);

        Self {
            submission_id,
            status,
            total_count: case_results.len(),
            case_results,
            passed_count,
            finalized: true,
            earned_weight,
            total_weight,
            max_elapsed_ms,
            max_memory_kb,
            compile_output,
            aggregate_timed_out,
        }
    }

    pub fn submission_id(&self) -> Uuid {
        self.submission_id
    }

    pub fn status(&self) -> SubmissionState {
        self.status
    }

    pub fn case_results(&self) -> &[CaseResult] {
        &self.case_results
    }

    pub fn passed_count(&self) -> usize {
        self.passed_count
    }

    pub fn total_count(&self) -> usize {
        self.total_count
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn earned_weight(&self) -> u32 {
        self.earned_weight
    }

    pub fn total_weight(&self) -> u32 {
        self.total_weight
    }

    pub fn max_elapsed_ms(&self) -> u64 {
        self.max_elapsed_ms
    }

    pub fn max_memory_kb(&self) -> u64 {
        self.max_memory_kb
    }

    pub fn compile_output(&self) -> Option<&str> {
        self.compile_output.as_deref()
    }

    /// True if the per-submission budget ran out before every case ran.
    pub fn aggregate_timed_out(&self) -> bool {
        self.aggregate_timed_out
    }

    pub fn all_passed(&self) -> bool {
        self.total_count > 0 && self.passed_count == self.total_count
    }

    /// Most severe case outcome, or `None` if no case was evaluated.
    pub fn worst_outcome(&self) -> Option<CaseOutcome> {
        self.case_results
            .iter()
            .map(|r| r.outcome)
            .max_by_key(|o| o.severity())
    }
}
