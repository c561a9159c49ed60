use super::{json_body, required_param, ApiErr, AppState};
use crate::models::User;
use crate::services::directory::{self, UserReviews};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/users/setIsActive", post(set_is_active))
        .route("/users/getReview", get(get_review))
}

#[derive(Deserialize)]
struct SetIsActiveRequest {
    user_id: String,
    is_active: bool,
}

#[derive(Serialize)]
struct UserResponse {
    user: User,
}

#[derive(Deserialize)]
struct ReviewQuery {
    user_id: Option<String>,
}

/// POST /users/setIsActive — flip a user's active flag.
async fn set_is_active(
    State(state): State<AppState>,
    body: Result<Json<SetIsActiveRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, ApiErr> {
    let request = json_body(body)?;
    let user = directory::set_user_active(&state.db, &request.user_id, request.is_active).await?;
    Ok(Json(UserResponse { user }))
}

/// GET /users/getReview?user_id=X — pull requests the user reviews.
async fn get_review(
    State(state): State<AppState>,
    Query(params): Query<ReviewQuery>,
) -> Result<Json<UserReviews>, ApiErr> {
    let user_id = required_param(params.user_id, "user_id")?;
    Ok(Json(directory::get_user_reviews(&state.db, &user_id).await?))
}
