use std::collections::HashSet;
use std::sync::Arc;

use common::{CaseResult, SubmissionReport, SubmissionState};
use uuid::Uuid;

use super::error::EngineError;

/// Seals case results into reports, at most once per submission.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    sealed: HashSet<Uuid>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Finalize the report of `submission_id`. A second call for the same
    /// submission fails with [`EngineError::AlreadyFinalized`].
    pub fn finalize(
        &mut self,
        submission_id: Uuid,
        status: SubmissionState,
        case_results: Vec<CaseResult>,
        compile_output: Option<String>,
        aggregate_timed_out: bool,
    ) -> Result<Arc<SubmissionReport>, EngineError> {
        let report = Self::seal(
            submission_id,
            status,
            case_results,
            compile_output,
            aggregate_timed_out,
        )?;
        self.accept(report)
    }

    /// Build a report without recording it. Pure, so callers can seal and
    /// assess outside the engine lock and [`accept`](Self::accept) later.
    pub fn seal(
        submission_id: Uuid,
        status: SubmissionState,
        case_results: Vec<CaseResult>,
        compile_output: Option<String>,
        aggregate_timed_out: bool,
    ) -> Result<SubmissionReport, EngineError> {
        if !status.is_graded() {
            return Err(EngineError::Internal(format!(
                "cannot seal a report for state {status}"
            )));
        }
        Ok(SubmissionReport::seal(
            submission_id,
            status,
            case_results,
            compile_output,
            aggregate_timed_out,
        ))
    }

    /// Record a sealed report as final. At most once per submission.
    pub fn accept(&mut self, report: SubmissionReport) -> Result<Arc<SubmissionReport>, EngineError> {
        let submission_id = report.submission_id();
        if !self.sealed.insert(submission_id) {
            return Err(EngineError::AlreadyFinalized(submission_id));
        }
        Ok(Arc::new(report))
    }

    /// Drop bookkeeping for an evicted submission.
    pub fn forget(&mut self, submission_id: &Uuid) {
        self.sealed.remove(submission_id);
    }
}
