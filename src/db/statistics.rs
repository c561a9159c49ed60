//! Aggregate counters over the whole store.

use crate::models::{
    PullRequestStats, ReviewAssignmentStats, ReviewerAssignment, Statistics, TeamStats, UserStats,
};
use sqlx::SqliteConnection;

/// Collect store-wide statistics.
///
/// Callers that need a consistent snapshot run this inside a transaction.
pub async fn get_statistics(conn: &mut SqliteConnection) -> Result<Statistics, sqlx::Error> {
    let (teams,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM teams")
        .fetch_one(&mut *conn)
        .await?;

    let (users_total, users_active): (i64, i64) = sqlx::query_as(
        "SELECT COUNT(*), COALESCE(SUM(CASE WHEN is_active = 1 THEN 1 ELSE 0 END), 0) FROM users",
    )
    .fetch_one(&mut *conn)
    .await?;

    let (prs_total, prs_open): (i64, i64) = sqlx::query_as(
        "SELECT COUNT(*), COALESCE(SUM(CASE WHEN status = 'OPEN' THEN 1 ELSE 0 END), 0) FROM pull_requests",
    )
    .fetch_one(&mut *conn)
    .await?;

    let by_reviewer: Vec<ReviewerAssignment> = sqlx::query_as(
        r#"
        SELECT reviewer_id AS user_id, COUNT(*) AS count
        FROM pr_reviewers
        GROUP BY reviewer_id
        ORDER BY count DESC, reviewer_id
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    let assignments_total = by_reviewer.iter().map(|r| r.count).sum();

    Ok(Statistics {
        teams: TeamStats { total: teams },
        users: UserStats {
            total: users_total,
            active: users_active,
            inactive: users_total - users_active,
        },
        pull_requests: PullRequestStats {
            total: prs_total,
            open: prs_open,
            merged: prs_total - prs_open,
        },
        review_assignments: ReviewAssignmentStats {
            total: assignments_total,
            by_reviewer,
        },
    })
}
