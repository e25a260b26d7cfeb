use std::sync::Arc;

use common::event::SubmissionEvent;
use common::{FeedbackAssessment, Problem, Submission, SubmissionReport, SubmissionState};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use uuid::Uuid;
use ::worker::{EvaluationJob, HarnessOutcome};

use super::Inner;
use super::aggregator::ResultAggregator;
use super::record::Store;
use crate::feedback;

/// Worker loop: take the oldest queued submission, evaluate it, repeat.
pub(crate) async fn run(inner: Arc<Inner>, worker: usize) {
    debug!(worker, "Worker started");

    loop {
        if inner.shutdown.is_cancelled() {
            break;
        }

        let next = inner.store().dispatch();
        match next {
            Some((submission, problem, cancel)) => {
                process(&inner, worker, submission, problem, cancel).await;
            }
            None => {
                tokio::select! {
                    _ = inner.work_ready.notified() => {}
                    _ = inner.shutdown.cancelled() => break,
                }
            }
        }
    }

    debug!(worker, "Worker stopped");
}

async fn process(
    inner: &Inner,
    worker: usize,
    submission: Submission,
    problem: Arc<Problem>,
    cancel: CancellationToken,
) {
    let submission_id = submission.id;
    info!(
        %submission_id,
        problem_id = %problem.id,
        language = %submission.language,
        worker,
        "Evaluating submission"
    );
    inner
        .emit(SubmissionEvent::Started {
            submission_id,
            worker,
        })
        .await;

    let outcome = inner
        .harness
        .evaluate(
            EvaluationJob {
                submission_id,
                language: &submission.language,
                source_code: &submission.source_code,
                test_cases: &problem.test_cases,
            },
            &cancel,
        )
        .await;

    let verdict = prepare(&submission, &problem, outcome);
    let finished = complete(&mut inner.store(), submission_id, verdict);
    if let Some(submission) = finished {
        info!(
            %submission_id,
            worker,
            outcome = %submission.state,
            "Submission finished"
        );
        inner
            .emit(SubmissionEvent::Finished { submission })
            .await;
    }
}

/// Harness outcome with the report sealed and the rubric applied.
enum Verdict {
    Graded {
        report: SubmissionReport,
        assessment: FeedbackAssessment,
    },
    CompileError(String),
    Cancelled,
    InternalError,
}

/// Seal and assess a harness outcome. Runs before the engine lock is taken,
/// since source analysis is the slow part of completion.
fn prepare(submission: &Submission, problem: &Problem, outcome: HarnessOutcome) -> Verdict {
    let id = submission.id;
    let sealed = match outcome {
        HarnessOutcome::Evaluated {
            case_results,
            aggregate_timed_out,
        } => ResultAggregator::seal(
            id,
            SubmissionState::Completed,
            case_results,
            None,
            aggregate_timed_out,
        ),
        HarnessOutcome::CompileError { output } => return Verdict::CompileError(output),
        HarnessOutcome::Cancelled => return Verdict::Cancelled,
        HarnessOutcome::Fault(detail) => {
            error!(submission_id = %id, detail = %detail, "Sandbox fault");
            return Verdict::InternalError;
        }
    };

    match sealed {
        Ok(report) => {
            let assessment = feedback::assess(
                &report,
                &submission.source_code,
                &submission.language,
                problem,
                submission.historical_pass_rate,
            );
            Verdict::Graded { report, assessment }
        }
        Err(e) => {
            error!(submission_id = %id, error = %e, "Failed to seal report");
            Verdict::InternalError
        }
    }
}

/// Apply a verdict to the submission's record. Returns the terminal
/// snapshot, or `None` if the submission was already terminal (force-failed
/// or evicted) and the verdict was discarded.
fn complete(store: &mut Store, id: Uuid, verdict: Verdict) -> Option<Submission> {
    store.running = store.running.saturating_sub(1);

    let Store {
        records,
        aggregator,
        ..
    } = store;
    let Some(record) = records.get_mut(&id) else {
        debug!(submission_id = %id, "Record evicted before completion");
        return None;
    };
    if record.submission.is_terminal() {
        debug!(
            submission_id = %id,
            state = %record.submission.state,
            "Submission already terminal, discarding outcome"
        );
        return None;
    }

    let state = match verdict {
        Verdict::Graded { report, assessment } => match aggregator.accept(report) {
            Ok(report) => {
                record.submission.report = Some(report);
                record.submission.assessment = Some(assessment);
                SubmissionState::Completed
            }
            Err(e) => {
                error!(submission_id = %id, error = %e, "Failed to finalize report");
                SubmissionState::InternalError
            }
        },
        Verdict::CompileError(output) => {
            match aggregator.finalize(id, SubmissionState::CompileError, vec![], Some(output), false) {
                Ok(report) => {
                    record.submission.report = Some(report);
                    SubmissionState::CompileError
                }
                Err(e) => {
                    error!(submission_id = %id, error = %e, "Failed to finalize report");
                    SubmissionState::InternalError
                }
            }
        }
        Verdict::Cancelled => SubmissionState::Cancelled,
        Verdict::InternalError => SubmissionState::InternalError,
    };

    record.transition(state);
    Some(record.submission.clone())
}
