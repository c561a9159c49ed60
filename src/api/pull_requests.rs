use super::{json_body, ApiErr, AppState};
use crate::models::PullRequest;
use crate::services::Reassignment;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/pullRequest/create", post(create))
        .route("/pullRequest/merge", post(merge))
        .route("/pullRequest/reassign", post(reassign))
}

#[derive(Deserialize)]
struct CreateRequest {
    pull_request_id: String,
    pull_request_name: String,
    author_id: String,
}

#[derive(Deserialize)]
struct MergeRequest {
    pull_request_id: String,
}

#[derive(Deserialize)]
struct ReassignRequest {
    pull_request_id: String,
    old_user_id: String,
}

#[derive(Serialize)]
struct PullRequestResponse {
    pr: PullRequest,
}

/// POST /pullRequest/create — create a PR and assign reviewers.
async fn create(
    State(state): State<AppState>,
    body: Result<Json<CreateRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PullRequestResponse>), ApiErr> {
    let request = json_body(body)?;
    let pr = state
        .engine
        .create_pull_request(
            &request.pull_request_id,
            &request.pull_request_name,
            &request.author_id,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(PullRequestResponse { pr })))
}

/// POST /pullRequest/merge — mark a PR merged (idempotent).
async fn merge(
    State(state): State<AppState>,
    body: Result<Json<MergeRequest>, JsonRejection>,
) -> Result<Json<PullRequestResponse>, ApiErr> {
    let request = json_body(body)?;
    let pr = state.engine.merge_pull_request(&request.pull_request_id).await?;
    Ok(Json(PullRequestResponse { pr }))
}

/// POST /pullRequest/reassign — swap one reviewer for a teammate.
async fn reassign(
    State(state): State<AppState>,
    body: Result<Json<ReassignRequest>, JsonRejection>,
) -> Result<Json<Reassignment>, ApiErr> {
    let request = json_body(body)?;
    let outcome = state
        .engine
        .reassign_reviewer(&request.pull_request_id, &request.old_user_id)
        .await?;
    Ok(Json(outcome))
}
