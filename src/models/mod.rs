//! Data models for the application.
//!
//! These models represent the entities stored in the SQLite database and
//! returned over the HTTP API. Row types derive `FromRow` for SQLx queries.

pub mod pull_request;
pub mod statistics;
pub mod team;

// Re-exports for convenient access
pub use pull_request::{PullRequest, PullRequestRow, PullRequestShort, PullRequestStatus};
pub use statistics::{
    PullRequestStats, ReviewAssignmentStats, ReviewerAssignment, Statistics, TeamStats, UserStats,
};
pub use team::{Team, TeamMember, User};
