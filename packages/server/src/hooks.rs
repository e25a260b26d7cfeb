use anyhow::Result;
use async_trait::async_trait;
use common::event::{SubmissionEvent, topics};
use common::hook::{Hook, HookAction};
use tracing::info;

/// Writes one log line per lifecycle transition.
pub struct LoggingHook;

#[async_trait]
impl Hook<SubmissionEvent> for LoggingHook {
    fn id(&self) -> &str {
        "submission-logger"
    }

    fn topics(&self) -> &[&str] {
        &[
            topics::SUBMISSION_QUEUED,
            topics::SUBMISSION_STARTED,
            topics::SUBMISSION_FINISHED,
        ]
    }

    async fn on_event(&self, event: &SubmissionEvent) -> Result<HookAction> {
        match event {
            SubmissionEvent::Queued {
                submission_id,
                problem_id,
            } => info!(%submission_id, %problem_id, "Submission queued"),
            SubmissionEvent::Started {
                submission_id,
                worker,
            } => info!(%submission_id, worker, "Submission started"),
            SubmissionEvent::Finished { submission } => {
                let passed = submission.report.as_ref().map(|r| r.passed_count());
                let score = submission.assessment.as_ref().map(|a| a.score);
                info!(
                    submission_id = %submission.id,
                    state = %submission.state,
                    passed,
                    score,
                    "Submission finished"
                );
            }
        }
        Ok(HookAction::Pass)
    }
}
