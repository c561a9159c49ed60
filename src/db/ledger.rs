//! Pull request ledger queries.
//!
//! Reviewer sets are only ever changed through [`add_reviewer`] and
//! [`remove_reviewer`], so concurrent writers never overwrite each other's
//! whole list.

use crate::models::{PullRequest, PullRequestRow, PullRequestShort, PullRequestStatus};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use std::collections::{BTreeMap, HashMap};

const PR_COLUMNS: &str =
    "pull_request_id, pull_request_name, author_id, status, created_at, merged_at";

/// Input for [`insert_pull_request`].
#[derive(Debug, Clone)]
pub struct NewPullRequest<'a> {
    pub pull_request_id: &'a str,
    pub pull_request_name: &'a str,
    pub author_id: &'a str,
    pub reviewers: &'a [String],
    /// Unix milliseconds.
    pub created_at: i64,
}

pub async fn pull_request_exists(
    conn: &mut SqliteConnection,
    pr_id: &str,
) -> Result<bool, sqlx::Error> {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT 1 FROM pull_requests WHERE pull_request_id = ?")
            .bind(pr_id)
            .fetch_optional(&mut *conn)
            .await?;

    Ok(row.is_some())
}

/// Insert an OPEN pull request together with one assignment row per reviewer.
///
/// Callers run this inside a transaction so the PR never exists with a
/// partially written reviewer set.
pub async fn insert_pull_request(
    conn: &mut SqliteConnection,
    pr: &NewPullRequest<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO pull_requests (pull_request_id, pull_request_name, author_id, status, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(pr.pull_request_id)
    .bind(pr.pull_request_name)
    .bind(pr.author_id)
    .bind(PullRequestStatus::Open.as_str())
    .bind(pr.created_at)
    .execute(&mut *conn)
    .await?;

    for reviewer_id in pr.reviewers {
        add_reviewer(&mut *conn, pr.pull_request_id, reviewer_id, pr.created_at).await?;
    }

    Ok(())
}

/// Reviewer ids of one pull request in assignment order.
pub async fn get_reviewers(
    conn: &mut SqliteConnection,
    pr_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT reviewer_id FROM pr_reviewers WHERE pull_request_id = ? ORDER BY rowid",
    )
    .bind(pr_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}

pub async fn get_pull_request(
    conn: &mut SqliteConnection,
    pr_id: &str,
) -> Result<Option<PullRequest>, sqlx::Error> {
    let row: Option<PullRequestRow> = sqlx::query_as(&format!(
        "SELECT {} FROM pull_requests WHERE pull_request_id = ?",
        PR_COLUMNS
    ))
    .bind(pr_id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let reviewers = get_reviewers(&mut *conn, pr_id).await?;
    Ok(Some(row.with_reviewers(reviewers)))
}

/// Write-touch a pull request row by bumping its version.
///
/// Used as the first statement of a per-PR transaction so the transaction
/// holds SQLite's write lock before the existence, status and membership
/// checks run. Returns `false` if the pull request does not exist.
pub async fn lock_pull_request(
    conn: &mut SqliteConnection,
    pr_id: &str,
) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("UPDATE pull_requests SET version = version + 1 WHERE pull_request_id = ?")
            .bind(pr_id)
            .execute(&mut *conn)
            .await?;

    Ok(result.rows_affected() > 0)
}

/// Transition an OPEN pull request to MERGED.
///
/// Conditional on the current status, so an already merged PR keeps its
/// original `merged_at`. Returns `true` if this call performed the transition.
pub async fn mark_merged(
    conn: &mut SqliteConnection,
    pr_id: &str,
    merged_at: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE pull_requests
        SET status = ?, merged_at = ?, version = version + 1
        WHERE pull_request_id = ? AND status = ?
        "#,
    )
    .bind(PullRequestStatus::Merged.as_str())
    .bind(merged_at)
    .bind(pr_id)
    .bind(PullRequestStatus::Open.as_str())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn reassign_author(
    conn: &mut SqliteConnection,
    pr_id: &str,
    new_author_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE pull_requests SET author_id = ?, version = version + 1 WHERE pull_request_id = ?",
    )
    .bind(new_author_id)
    .bind(pr_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Add one reviewer. Adding a reviewer that is already assigned is a no-op.
pub async fn add_reviewer(
    conn: &mut SqliteConnection,
    pr_id: &str,
    reviewer_id: &str,
    assigned_at: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO pr_reviewers (pull_request_id, reviewer_id, assigned_at)
        VALUES (?, ?, ?)
        ON CONFLICT(pull_request_id, reviewer_id) DO NOTHING
        "#,
    )
    .bind(pr_id)
    .bind(reviewer_id)
    .bind(assigned_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Remove one reviewer. Returns `true` if the reviewer was assigned.
pub async fn remove_reviewer(
    conn: &mut SqliteConnection,
    pr_id: &str,
    reviewer_id: &str,
) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM pr_reviewers WHERE pull_request_id = ? AND reviewer_id = ?")
            .bind(pr_id)
            .bind(reviewer_id)
            .execute(&mut *conn)
            .await?;

    Ok(result.rows_affected() > 0)
}

/// Reviewers for many pull requests at once, keyed by PR id.
async fn load_reviewers(
    conn: &mut SqliteConnection,
    pr_ids: &[String],
) -> Result<HashMap<String, Vec<String>>, sqlx::Error> {
    let mut by_pr: HashMap<String, Vec<String>> = HashMap::new();
    if pr_ids.is_empty() {
        return Ok(by_pr);
    }

    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT pull_request_id, reviewer_id FROM pr_reviewers WHERE pull_request_id IN (",
    );
    let mut separated = query.separated(", ");
    for id in pr_ids {
        separated.push_bind(id);
    }
    separated.push_unseparated(") ORDER BY rowid");

    let rows: Vec<(String, String)> = query.build_query_as().fetch_all(&mut *conn).await?;
    for (pr_id, reviewer_id) in rows {
        by_pr.entry(pr_id).or_default().push(reviewer_id);
    }

    Ok(by_pr)
}

async fn attach_reviewers(
    conn: &mut SqliteConnection,
    rows: Vec<PullRequestRow>,
) -> Result<Vec<PullRequest>, sqlx::Error> {
    let ids: Vec<String> = rows.iter().map(|r| r.pull_request_id.clone()).collect();
    let mut reviewers = load_reviewers(&mut *conn, &ids).await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let assigned = reviewers.remove(&row.pull_request_id).unwrap_or_default();
            row.with_reviewers(assigned)
        })
        .collect())
}

/// OPEN pull requests authored by any of `author_ids`, ordered by PR id.
pub async fn list_open_by_authors(
    conn: &mut SqliteConnection,
    author_ids: &[String],
) -> Result<Vec<PullRequest>, sqlx::Error> {
    if author_ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
        "SELECT {} FROM pull_requests WHERE status = 'OPEN' AND author_id IN (",
        PR_COLUMNS
    ));
    let mut separated = query.separated(", ");
    for id in author_ids {
        separated.push_bind(id);
    }
    separated.push_unseparated(") ORDER BY pull_request_id");

    let rows: Vec<PullRequestRow> = query.build_query_as().fetch_all(&mut *conn).await?;
    attach_reviewers(conn, rows).await
}

/// OPEN pull requests reviewed by any of `reviewer_ids`, grouped by reviewer.
///
/// A pull request reviewed by two listed users appears under both.
pub async fn list_open_by_reviewers(
    conn: &mut SqliteConnection,
    reviewer_ids: &[String],
) -> Result<BTreeMap<String, Vec<PullRequest>>, sqlx::Error> {
    let mut grouped: BTreeMap<String, Vec<PullRequest>> = BTreeMap::new();
    if reviewer_ids.is_empty() {
        return Ok(grouped);
    }

    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
        r#"
        SELECT prr.reviewer_id, pr.pull_request_id
        FROM pr_reviewers prr
        JOIN pull_requests pr ON pr.pull_request_id = prr.pull_request_id
        WHERE pr.status = 'OPEN' AND prr.reviewer_id IN (
        "#,
    );
    let mut separated = query.separated(", ");
    for id in reviewer_ids {
        separated.push_bind(id);
    }
    separated.push_unseparated(") ORDER BY prr.reviewer_id, pr.pull_request_id");

    let pairs: Vec<(String, String)> = query.build_query_as().fetch_all(&mut *conn).await?;
    if pairs.is_empty() {
        return Ok(grouped);
    }

    let mut pr_ids: Vec<String> = pairs.iter().map(|(_, pr_id)| pr_id.clone()).collect();
    pr_ids.sort();
    pr_ids.dedup();

    let mut rows_query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
        "SELECT {} FROM pull_requests WHERE pull_request_id IN (",
        PR_COLUMNS
    ));
    let mut separated = rows_query.separated(", ");
    for id in &pr_ids {
        separated.push_bind(id);
    }
    separated.push_unseparated(")");

    let rows: Vec<PullRequestRow> = rows_query.build_query_as().fetch_all(&mut *conn).await?;
    let by_id: HashMap<String, PullRequest> = attach_reviewers(conn, rows)
        .await?
        .into_iter()
        .map(|pr| (pr.pull_request_id.clone(), pr))
        .collect();

    for (reviewer_id, pr_id) in pairs {
        if let Some(pr) = by_id.get(&pr_id) {
            grouped.entry(reviewer_id).or_default().push(pr.clone());
        }
    }

    Ok(grouped)
}

/// Every pull request (any status) a user is assigned to review.
pub async fn list_by_reviewer(
    conn: &mut SqliteConnection,
    reviewer_id: &str,
) -> Result<Vec<PullRequestShort>, sqlx::Error> {
    sqlx::query_as::<_, PullRequestShort>(
        r#"
        SELECT pr.pull_request_id, pr.pull_request_name, pr.author_id, pr.status
        FROM pr_reviewers prr
        JOIN pull_requests pr ON pr.pull_request_id = prr.pull_request_id
        WHERE prr.reviewer_id = ?
        ORDER BY pr.created_at, pr.pull_request_id
        "#,
    )
    .bind(reviewer_id)
    .fetch_all(&mut *conn)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::directory::{insert_team, upsert_member};
    use crate::db::{initialize, now_millis};
    use crate::models::TeamMember;
    use tempfile::tempdir;

    async fn seed(conn: &mut SqliteConnection) {
        let now = now_millis();
        insert_team(conn, "backend", now).await.unwrap();
        for id in ["a1", "a2", "a3", "a4"] {
            let member = TeamMember {
                user_id: id.into(),
                username: id.into(),
                is_active: true,
            };
            upsert_member(conn, "backend", &member, now).await.unwrap();
        }
    }

    async fn create(conn: &mut SqliteConnection, id: &str, author: &str, reviewers: &[&str]) {
        let reviewers: Vec<String> = reviewers.iter().map(|r| r.to_string()).collect();
        insert_pull_request(
            conn,
            &NewPullRequest {
                pull_request_id: id,
                pull_request_name: "change",
                author_id: author,
                reviewers: &reviewers,
                created_at: now_millis(),
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_reviewers_keep_assignment_order() {
        let dir = tempdir().unwrap();
        let pool = initialize(&dir.path().join("test.db"), 1).await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        seed(&mut conn).await;

        create(&mut conn, "pr-1", "a1", &["a3", "a2"]).await;
        add_reviewer(&mut conn, "pr-1", "a4", now_millis()).await.unwrap();
        // Duplicate add is ignored
        add_reviewer(&mut conn, "pr-1", "a3", now_millis()).await.unwrap();

        let pr = get_pull_request(&mut conn, "pr-1").await.unwrap().unwrap();
        assert_eq!(pr.assigned_reviewers, vec!["a3", "a2", "a4"]);
        assert!(pr.is_open());
        assert!(pr.merged_at.is_none());
    }

    #[tokio::test]
    async fn test_mark_merged_only_once() {
        let dir = tempdir().unwrap();
        let pool = initialize(&dir.path().join("test.db"), 1).await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        seed(&mut conn).await;
        create(&mut conn, "pr-1", "a1", &[]).await;

        assert!(mark_merged(&mut conn, "pr-1", 1000).await.unwrap());
        assert!(!mark_merged(&mut conn, "pr-1", 2000).await.unwrap());

        let pr = get_pull_request(&mut conn, "pr-1").await.unwrap().unwrap();
        assert_eq!(pr.status, PullRequestStatus::Merged);
        assert_eq!(pr.merged_at.map(|t| t.timestamp_millis()), Some(1000));
    }

    #[tokio::test]
    async fn test_open_listings_skip_merged() {
        let dir = tempdir().unwrap();
        let pool = initialize(&dir.path().join("test.db"), 1).await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        seed(&mut conn).await;

        create(&mut conn, "pr-1", "a1", &["a2", "a3"]).await;
        create(&mut conn, "pr-2", "a1", &["a2"]).await;
        create(&mut conn, "pr-3", "a4", &["a3"]).await;
        mark_merged(&mut conn, "pr-2", now_millis()).await.unwrap();

        let authored = list_open_by_authors(&mut conn, &["a1".into()]).await.unwrap();
        assert_eq!(authored.len(), 1);
        assert_eq!(authored[0].pull_request_id, "pr-1");
        assert_eq!(authored[0].assigned_reviewers, vec!["a2", "a3"]);

        let grouped = list_open_by_reviewers(&mut conn, &["a2".into(), "a3".into()])
            .await
            .unwrap();
        let a2: Vec<&str> = grouped["a2"].iter().map(|p| p.pull_request_id.as_str()).collect();
        let a3: Vec<&str> = grouped["a3"].iter().map(|p| p.pull_request_id.as_str()).collect();
        assert_eq!(a2, vec!["pr-1"]);
        assert_eq!(a3, vec!["pr-1", "pr-3"]);

        // Review queue includes merged pull requests
        let queue = list_by_reviewer(&mut conn, "a2").await.unwrap();
        assert_eq!(queue.len(), 2);
    }

    #[tokio::test]
    async fn test_remove_and_reassign() {
        let dir = tempdir().unwrap();
        let pool = initialize(&dir.path().join("test.db"), 1).await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        seed(&mut conn).await;
        create(&mut conn, "pr-1", "a1", &["a2", "a3"]).await;

        assert!(remove_reviewer(&mut conn, "pr-1", "a2").await.unwrap());
        assert!(!remove_reviewer(&mut conn, "pr-1", "a2").await.unwrap());
        reassign_author(&mut conn, "pr-1", "a4").await.unwrap();

        let pr = get_pull_request(&mut conn, "pr-1").await.unwrap().unwrap();
        assert_eq!(pr.author_id, "a4");
        assert_eq!(pr.assigned_reviewers, vec!["a3"]);

        assert!(lock_pull_request(&mut conn, "pr-1").await.unwrap());
        assert!(!lock_pull_request(&mut conn, "missing").await.unwrap());
        assert!(pull_request_exists(&mut conn, "pr-1").await.unwrap());
    }
}
