use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::feedback::FeedbackAssessment;
use crate::report::SubmissionReport;
use crate::submission_status::SubmissionState;

/// Caller input for a new submission.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewSubmission {
    pub problem_id: String,
    pub language: String,
    pub source_code: String,
    /// Candidate's historical pass rate in percent, blended into readiness.
    #[serde(default)]
    pub historical_pass_rate: Option<u8>,
}

impl NewSubmission {
    pub fn new(
        problem_id: impl Into<String>,
        language: impl Into<String>,
        source_code: impl Into<String>,
    ) -> Self {
        Self {
            problem_id: problem_id.into(),
            language: language.into(),
            source_code: source_code.into(),
            historical_pass_rate: None,
        }
    }

    pub fn with_historical_pass_rate(mut self, pass_rate: u8) -> Self {
        self.historical_pass_rate = Some(pass_rate.min(100));
        self
    }
}

/// One candidate's code attempt for one problem.
///
/// Owned and advanced by the engine; callers receive snapshots.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    pub problem_id: String,
    pub language: String,
    pub source_code: String,
    pub submitted_at: DateTime<Utc>,
    pub state: SubmissionState,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub historical_pass_rate: Option<u8>,
    /// Present iff `state` is a graded terminal state.
    pub report: Option<Arc<SubmissionReport>>,
    /// Present iff `state` is `Completed`.
    pub assessment: Option<FeedbackAssessment>,
}

impl Submission {
    pub fn new(request: NewSubmission) -> Self {
        Self {
            id: Uuid::now_v7(),
            problem_id: request.problem_id,
            language: request.language,
            source_code: request.source_code,
            submitted_at: Utc::now(),
            state: SubmissionState::Queued,
            started_at: None,
            finished_at: None,
            historical_pass_rate: request.historical_pass_rate,
            report: None,
            assessment: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}
