use std::time::Duration;

use axum::Json;
use axum::extract::{Path, Query, State};
use tracing::instrument;
use uuid::Uuid;

use crate::error::{AppError, ErrorBody};
use crate::models::submission::*;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Submissions",
    operation_id = "getSubmission",
    summary = "Get submission status",
    description = "Returns the current state of a submission, with its report and assessment once graded. With `wait_ms`, blocks until the submission is terminal or the wait elapses.",
    params(
        ("id" = Uuid, Path, description = "Submission ID"),
        SubmissionStatusQuery,
    ),
    responses(
        (status = 200, description = "Submission details", body = SubmissionResponse),
        (status = 400, description = "Malformed ID (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Submission not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query), fields(id = %id))]
pub async fn get_submission(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<SubmissionStatusQuery>,
) -> Result<Json<SubmissionResponse>, AppError> {
    let submission = match query.wait_ms {
        Some(wait_ms) if wait_ms > 0 => {
            let wait = Duration::from_millis(wait_ms.min(state.config.server.max_wait_ms));
            state.engine.wait(id, wait).await?
        }
        _ => state.engine.status(id)?,
    };

    let problem = state.catalog.get_problem(&submission.problem_id).await.ok();
    Ok(Json(SubmissionResponse::new(submission, problem.as_deref())))
}

#[utoipa::path(
    post,
    path = "/{id}/cancel",
    tag = "Submissions",
    operation_id = "cancelSubmission",
    summary = "Cancel a submission",
    description = "Withdraws a queued submission or stops a running one. Cancelling a finished submission changes nothing and reports `AlreadyTerminal`.",
    params(("id" = Uuid, Path, description = "Submission ID")),
    responses(
        (status = 200, description = "Cancel processed", body = CancelResponse),
        (status = 404, description = "Submission not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(id = %id))]
pub async fn cancel_submission(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CancelResponse>, AppError> {
    let outcome = state.engine.cancel(id).await?;
    let submission = state.engine.status(id)?;

    Ok(Json(CancelResponse {
        id,
        outcome,
        state: submission.state,
    }))
}
