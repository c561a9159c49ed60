use super::{json_body, required_param, ApiErr, AppState};
use crate::models::Team;
use crate::services::{cascade, directory, DeactivationResult};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/team/add", post(add_team))
        .route("/team/get", get(get_team))
        .route("/team/deactivateMembers", post(deactivate_members))
}

#[derive(Serialize)]
struct TeamResponse {
    team: Team,
}

#[derive(Deserialize)]
struct TeamQuery {
    team_name: Option<String>,
}

#[derive(Deserialize)]
struct DeactivateRequest {
    team_name: String,
    #[serde(default)]
    user_ids: Vec<String>,
}

/// POST /team/add — create a team and its members.
async fn add_team(
    State(state): State<AppState>,
    body: Result<Json<Team>, JsonRejection>,
) -> Result<(StatusCode, Json<TeamResponse>), ApiErr> {
    let team = json_body(body)?;
    let team = directory::add_team(&state.db, &team).await?;
    Ok((StatusCode::CREATED, Json(TeamResponse { team })))
}

/// GET /team/get?team_name=X — a team with its members.
async fn get_team(
    State(state): State<AppState>,
    Query(params): Query<TeamQuery>,
) -> Result<Json<Team>, ApiErr> {
    let team_name = required_param(params.team_name, "team_name")?;
    Ok(Json(directory::get_team(&state.db, &team_name).await?))
}

/// POST /team/deactivateMembers — deactivate members and re-home their work.
async fn deactivate_members(
    State(state): State<AppState>,
    body: Result<Json<DeactivateRequest>, JsonRejection>,
) -> Result<Json<DeactivationResult>, ApiErr> {
    let request = json_body(body)?;
    let result =
        cascade::deactivate_team_members(&state.db, &request.team_name, &request.user_ids).await?;
    Ok(Json(result))
}
