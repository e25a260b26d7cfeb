use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers;
use crate::state::AppState;

pub fn api_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest("/v1", v1_routes())
}

fn v1_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/problems", problem_routes())
        .nest("/submissions", submission_routes())
}

fn problem_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::problem::list_problems))
        .routes(routes!(handlers::problem::get_problem))
        .routes(routes!(handlers::problem::list_languages))
        .routes(routes!(handlers::problem::create_submission))
}

fn submission_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::submission::get_submission))
        .routes(routes!(handlers::submission::cancel_submission))
}
