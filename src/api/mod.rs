//! HTTP API.
//!
//! JSON endpoints mapping one-to-one onto the directory, assignment and
//! cascade services. Every failure is rendered as
//! `{"error": {"code": ..., "message": ...}}`.

mod pull_requests;
mod statistics;
mod teams;
mod users;

use crate::db::pool::DbPool;
use crate::error::AppError;
use crate::services::AssignmentEngine;
use axum::extract::rejection::JsonRejection;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::timeout::TimeoutLayer;

/// Shared state for all routes.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub engine: Arc<AssignmentEngine>,
}

impl AppState {
    pub fn new(engine: AssignmentEngine) -> Self {
        Self {
            db: engine.pool().clone(),
            engine: Arc::new(engine),
        }
    }
}

/// Build the full router with request logging and a per-request timeout.
pub fn router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .merge(teams::routes())
        .merge(users::routes())
        .merge(pull_requests::routes())
        .merge(statistics::routes())
        .fallback(not_found)
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(middleware::from_fn(log_requests))
}

// ── Error handling ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

#[derive(Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

/// Wrapper to make AppError usable as an axum error response.
pub(crate) struct ApiErr(AppError);

impl ApiErr {
    fn status(&self) -> StatusCode {
        match &self.0 {
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::PullRequestExists { .. }
            | AppError::PullRequestMerged { .. }
            | AppError::ReviewerNotAssigned { .. }
            | AppError::NoReplacementCandidate { .. } => StatusCode::CONFLICT,
            AppError::TeamExists { .. }
            | AppError::UserNotInTeam { .. }
            | AppError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            AppError::Database { .. } | AppError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiErr {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("[http] {}", self.0);
        }

        (
            status,
            Json(ErrorEnvelope {
                error: ErrorBody {
                    code: self.0.code(),
                    message: self.0.to_string(),
                },
            }),
        )
            .into_response()
    }
}

impl From<AppError> for ApiErr {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiErr {
    fn from(rejection: JsonRejection) -> Self {
        Self(AppError::invalid_input(rejection.body_text()))
    }
}

/// Unwrap a JSON body, turning extractor rejections into `INVALID_REQUEST`.
pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiErr> {
    body.map(|Json(value)| value).map_err(ApiErr::from)
}

/// Require a query parameter to be present and non-blank.
pub(crate) fn required_param(value: Option<String>, name: &str) -> Result<String, ApiErr> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AppError::invalid_input_field(format!("{} is required", name), name).into()),
    }
}

async fn not_found() -> ApiErr {
    AppError::not_found("Route").into()
}

// ── Middleware ───────────────────────────────────────────────────────────────

async fn log_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let started = Instant::now();

    let response = next.run(req).await;

    log::info!(
        "[http] {} {} -> {} in {}ms",
        method,
        path,
        response.status().as_u16(),
        started.elapsed().as_millis()
    );

    response
}
