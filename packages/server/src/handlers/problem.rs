use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::NewSubmission;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::json::AppJson;
use crate::models::problem::*;
use crate::models::submission::{CreateSubmissionRequest, SubmissionAccepted};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/",
    tag = "Problems",
    operation_id = "listProblems",
    summary = "List problems",
    description = "Returns the challenge library ordered by id. Supports filtering by difficulty and category, and a case-insensitive search over title and description.",
    params(ProblemListQuery),
    responses(
        (status = 200, description = "List of problems", body = ProblemListResponse),
        (status = 400, description = "Invalid query (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_problems(
    State(state): State<AppState>,
    Query(query): Query<ProblemListQuery>,
) -> Result<Json<ProblemListResponse>, AppError> {
    let data: Vec<ProblemSummary> = state
        .catalog
        .list_problems()
        .await
        .iter()
        .filter(|problem| query.matches(problem))
        .map(|problem| ProblemSummary::from(problem.as_ref()))
        .collect();

    Ok(Json(ProblemListResponse {
        total: data.len(),
        data,
    }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Problems",
    operation_id = "getProblem",
    summary = "Get a problem by ID",
    description = "Returns the full problem statement with examples, constraints and visible test cases. Hidden test cases are only counted.",
    params(("id" = String, Path, description = "Problem ID")),
    responses(
        (status = 200, description = "Problem details", body = ProblemDetail),
        (status = 404, description = "Problem not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(id))]
pub async fn get_problem(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProblemDetail>, AppError> {
    let problem = state
        .catalog
        .get_problem(&id)
        .await
        .map_err(|_| AppError::NotFound(format!("Problem '{id}' not found")))?;
    Ok(Json(ProblemDetail::from(problem.as_ref())))
}

#[utoipa::path(
    get,
    path = "/{id}/languages",
    tag = "Problems",
    operation_id = "listProblemLanguages",
    summary = "List supported languages",
    description = "Returns the languages a solution to this problem may be written in: the problem's declared set, restricted to toolchains installed on this server.",
    params(("id" = String, Path, description = "Problem ID")),
    responses(
        (status = 200, description = "Supported languages", body = LanguagesResponse),
        (status = 404, description = "Problem not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(id))]
pub async fn list_languages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<LanguagesResponse>, AppError> {
    let languages = state.engine.list_supported_languages(&id).await?;
    Ok(Json(LanguagesResponse {
        problem_id: id,
        languages: languages.into_iter().collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/{id}/submissions",
    tag = "Submissions",
    operation_id = "createSubmission",
    summary = "Submit a solution to a problem",
    description = "Validates the submission and places it in the evaluation queue. Returns immediately; poll `GET /submissions/{id}` for the result.",
    params(("id" = String, Path, description = "Problem ID")),
    request_body = CreateSubmissionRequest,
    responses(
        (status = 202, description = "Submission queued", body = SubmissionAccepted),
        (status = 400, description = "Invalid submission (VALIDATION_ERROR, INVALID_SUBMISSION)", body = ErrorBody),
        (status = 404, description = "Problem not found (NOT_FOUND)", body = ErrorBody),
        (status = 503, description = "Queue full, retry later (CAPACITY_EXCEEDED)", body = ErrorBody,
            headers(("Retry-After" = u64, description = "Seconds to wait before retrying"))),
    ),
)]
#[instrument(skip(state, payload), fields(id, language = %payload.language))]
pub async fn create_submission(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<CreateSubmissionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.historical_pass_rate.is_some_and(|rate| rate > 100) {
        return Err(AppError::Validation(
            "historical_pass_rate must be between 0 and 100".into(),
        ));
    }

    let mut request = NewSubmission::new(id, payload.language, payload.source_code);
    if let Some(rate) = payload.historical_pass_rate {
        request = request.with_historical_pass_rate(rate);
    }
    let submission_id = state.engine.submit(request).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmissionAccepted {
            id: submission_id,
            state: common::SubmissionState::Queued,
        }),
    ))
}
