//! Aggregate service statistics.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamStats {
    pub total: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub total: i64,
    pub active: i64,
    pub inactive: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestStats {
    pub total: i64,
    pub open: i64,
    pub merged: i64,
}

/// Number of pull requests a reviewer is assigned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ReviewerAssignment {
    pub user_id: String,
    pub count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewAssignmentStats {
    pub total: i64,
    /// Ordered by count descending, then user id.
    pub by_reviewer: Vec<ReviewerAssignment>,
}

/// Snapshot of counters across the whole store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub teams: TeamStats,
    pub users: UserStats,
    pub pull_requests: PullRequestStats,
    pub review_assignments: ReviewAssignmentStats,
}
