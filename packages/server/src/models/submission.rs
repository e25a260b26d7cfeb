use chrono::{DateTime, Utc};
use common::{CaseOutcome, FeedbackAssessment, Problem, Submission, SubmissionReport, SubmissionState};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::CancelOutcome;

/// Request body for submitting a solution.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateSubmissionRequest {
    /// Language identifier, one of the problem's supported languages.
    #[schema(example = "python")]
    pub language: String,
    /// Complete program. Reads test input from stdin, writes the answer to stdout.
    #[schema(example = "import json\nnums = json.loads(input())\n")]
    pub source_code: String,
    /// Candidate's historical pass rate (0-100), blended into interview readiness.
    #[schema(example = 60)]
    pub historical_pass_rate: Option<u8>,
}

/// Returned when a submission is accepted into the queue.
#[derive(Serialize, utoipa::ToSchema)]
pub struct SubmissionAccepted {
    pub id: Uuid,
    pub state: SubmissionState,
}

/// Query parameters for reading a submission.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SubmissionStatusQuery {
    /// Long-poll: wait up to this many milliseconds for a terminal state.
    /// Capped by the server's `max_wait_ms`.
    #[param(example = 5000)]
    pub wait_ms: Option<u64>,
}

/// Result of one test case. Hidden cases never carry input or output.
#[derive(Serialize, utoipa::ToSchema)]
pub struct CaseResultResponse {
    #[schema(example = "two-sum-1")]
    pub test_case_id: String,
    pub outcome: CaseOutcome,
    pub passed: bool,
    pub hidden: bool,
    pub weight: u32,
    pub elapsed_ms: u64,
    pub peak_memory_kb: u64,
    pub input: Option<String>,
    pub expected_output: Option<String>,
    pub actual_output: Option<String>,
    pub stderr: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ReportResponse {
    pub status: SubmissionState,
    pub passed_count: usize,
    pub total_count: usize,
    pub earned_weight: u32,
    pub total_weight: u32,
    pub max_elapsed_ms: u64,
    pub max_memory_kb: u64,
    /// True if the per-submission time budget ran out.
    pub aggregate_timed_out: bool,
    /// Most severe case outcome.
    pub worst_outcome: Option<CaseOutcome>,
    /// Compiler diagnostics, for `CompileError` reports.
    pub compile_output: Option<String>,
    pub case_results: Vec<CaseResultResponse>,
}

impl ReportResponse {
    fn new(report: &SubmissionReport, problem: Option<&Problem>) -> Self {
        let case_results = report
            .case_results()
            .iter()
            .map(|result| {
                if result.hidden {
                    return CaseResultResponse {
                        test_case_id: result.test_case_id.clone(),
                        outcome: result.outcome,
                        passed: result.passed,
                        hidden: true,
                        weight: result.weight,
                        elapsed_ms: result.elapsed_ms,
                        peak_memory_kb: result.peak_memory_kb,
                        input: None,
                        expected_output: None,
                        actual_output: None,
                        stderr: None,
                    };
                }
                let case = problem.and_then(|p| {
                    p.test_cases
                        .iter()
                        .find(|tc| tc.id == result.test_case_id)
                });
                CaseResultResponse {
                    test_case_id: result.test_case_id.clone(),
                    outcome: result.outcome,
                    passed: result.passed,
                    hidden: false,
                    weight: result.weight,
                    elapsed_ms: result.elapsed_ms,
                    peak_memory_kb: result.peak_memory_kb,
                    input: case.map(|tc| tc.input.clone()),
                    expected_output: case.map(|tc| tc.expected_output.clone()),
                    actual_output: Some(result.actual_output.clone()),
                    stderr: result.stderr.clone(),
                }
            })
            .collect();

        Self {
            status: report.status(),
            passed_count: report.passed_count(),
            total_count: report.total_count(),
            earned_weight: report.earned_weight(),
            total_weight: report.total_weight(),
            max_elapsed_ms: report.max_elapsed_ms(),
            max_memory_kb: report.max_memory_kb(),
            aggregate_timed_out: report.aggregate_timed_out(),
            worst_outcome: report.worst_outcome(),
            compile_output: report.compile_output().map(str::to_string),
            case_results,
        }
    }
}

/// Submission snapshot.
#[derive(Serialize, utoipa::ToSchema)]
pub struct SubmissionResponse {
    pub id: Uuid,
    #[schema(example = "two-sum")]
    pub problem_id: String,
    #[schema(example = "python")]
    pub language: String,
    pub state: SubmissionState,
    pub submitted_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Present once the submission is `Completed` or `CompileError`.
    pub report: Option<ReportResponse>,
    /// Present once the submission is `Completed`.
    pub assessment: Option<FeedbackAssessment>,
}

impl SubmissionResponse {
    /// `problem` supplies the input and expected output of visible cases.
    pub fn new(submission: Submission, problem: Option<&Problem>) -> Self {
        Self {
            report: submission
                .report
                .as_deref()
                .map(|report| ReportResponse::new(report, problem)),
            id: submission.id,
            problem_id: submission.problem_id,
            language: submission.language,
            state: submission.state,
            submitted_at: submission.submitted_at,
            started_at: submission.started_at,
            finished_at: submission.finished_at,
            assessment: submission.assessment,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CancelResponse {
    pub id: Uuid,
    pub outcome: CancelOutcome,
    /// State after the cancel request.
    pub state: SubmissionState,
}
