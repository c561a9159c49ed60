use super::{ApiErr, AppState};
use crate::models::Statistics;
use crate::services::statistics;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

pub(super) fn routes() -> Router<AppState> {
    Router::new().route("/statistics", get(get_statistics))
}

/// GET /statistics — aggregate counters.
async fn get_statistics(State(state): State<AppState>) -> Result<Json<Statistics>, ApiErr> {
    Ok(Json(statistics::get_statistics(&state.db).await?))
}
