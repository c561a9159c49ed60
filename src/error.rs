//! Application error types.
//!
//! Every engine failure is a typed variant so the HTTP layer can map it onto
//! a status code and a stable error code without string matching.

use thiserror::Error;

/// Broad category of an [`AppError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Team, user or pull request absent.
    NotFound,
    /// Request collides with current state (duplicate id, reviewer not assigned, no candidate).
    Conflict,
    /// Operation attempted on a merged pull request.
    InvalidState,
    /// Malformed request or membership mismatch.
    InvalidInput,
    /// Infrastructure failure from the store.
    Storage,
}

/// Application-level errors returned by services.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {message}")]
    Database {
        message: String,
        operation: Option<String>,
    },

    /// Requested resource not found.
    #[error("{resource} not found")]
    NotFound {
        resource: String,
        id: Option<String>,
    },

    /// Pull request id is already taken.
    #[error("PR id already exists: {pr_id}")]
    PullRequestExists { pr_id: String },

    /// Team name is already taken.
    #[error("team_name already exists: {team_name}")]
    TeamExists { team_name: String },

    /// Reviewer sets are frozen once a pull request is merged.
    #[error("cannot reassign on merged PR {pr_id}")]
    PullRequestMerged { pr_id: String },

    /// The reviewer to replace is not on the pull request.
    #[error("reviewer {user_id} is not assigned to PR {pr_id}")]
    ReviewerNotAssigned { pr_id: String, user_id: String },

    /// No active teammate is left to take over a review.
    #[error("no active replacement candidate in team {team_name}")]
    NoReplacementCandidate { team_name: String },

    /// A listed user belongs to another team.
    #[error("user {user_id} is not a member of team {team_name}")]
    UserNotInTeam { user_id: String, team_name: String },

    /// Invalid input provided.
    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
        field: Option<String>,
    },

    /// Internal application error.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AppError {
    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            operation: None,
        }
    }

    /// Create a database error with operation context.
    pub fn database_with_op(message: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            operation: Some(operation.into()),
        }
    }

    /// Create a not found error.
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: None,
        }
    }

    /// Create a not found error with ID.
    pub fn not_found_with_id(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: Some(id.into()),
        }
    }

    pub fn team_not_found(team_name: &str) -> Self {
        Self::not_found_with_id("Team", team_name)
    }

    pub fn user_not_found(user_id: &str) -> Self {
        Self::not_found_with_id("User", user_id)
    }

    pub fn author_not_found(author_id: &str) -> Self {
        Self::not_found_with_id("Author", author_id)
    }

    pub fn pull_request_not_found(pr_id: &str) -> Self {
        Self::not_found_with_id("PullRequest", pr_id)
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            field: None,
        }
    }

    /// Create an invalid input error with field name.
    pub fn invalid_input_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Taxonomy bucket of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::PullRequestExists { .. }
            | Self::TeamExists { .. }
            | Self::ReviewerNotAssigned { .. }
            | Self::NoReplacementCandidate { .. } => ErrorKind::Conflict,
            Self::PullRequestMerged { .. } => ErrorKind::InvalidState,
            Self::UserNotInTeam { .. } | Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::Database { .. } | Self::Internal { .. } => ErrorKind::Storage,
        }
    }

    /// Stable error code exposed to API clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::PullRequestExists { .. } => "PR_EXISTS",
            Self::TeamExists { .. } => "TEAM_EXISTS",
            Self::PullRequestMerged { .. } => "PR_MERGED",
            Self::ReviewerNotAssigned { .. } => "NOT_ASSIGNED",
            Self::NoReplacementCandidate { .. } => "NO_CANDIDATE",
            Self::UserNotInTeam { .. } | Self::InvalidInput { .. } => "INVALID_REQUEST",
            Self::Database { .. } | Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

// Conversions from common error types

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::database(err.to_string())
    }
}

impl From<crate::db::DbError> for AppError {
    fn from(err: crate::db::DbError) -> Self {
        Self::database_with_op(err.to_string(), "initialize")
    }
}
