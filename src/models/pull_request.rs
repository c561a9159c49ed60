//! Pull request model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Status of a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PullRequestStatus {
    Open,
    Merged,
}

impl PullRequestStatus {
    /// Value stored in the `status` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Merged => "MERGED",
        }
    }
}

impl From<&str> for PullRequestStatus {
    fn from(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "MERGED" => Self::Merged,
            _ => Self::Open,
        }
    }
}

impl std::fmt::Display for PullRequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `pull_requests` row without its reviewers.
#[derive(Debug, Clone, FromRow)]
pub struct PullRequestRow {
    pub pull_request_id: String,
    pub pull_request_name: String,
    pub author_id: String,
    pub status: String,
    /// Unix milliseconds.
    pub created_at: i64,
    /// Unix milliseconds, set iff merged.
    pub merged_at: Option<i64>,
}

impl PullRequestRow {
    /// Combine the row with its reviewers (in assignment order).
    pub fn with_reviewers(self, assigned_reviewers: Vec<String>) -> PullRequest {
        PullRequest {
            pull_request_id: self.pull_request_id,
            pull_request_name: self.pull_request_name,
            author_id: self.author_id,
            status: PullRequestStatus::from(self.status.as_str()),
            assigned_reviewers,
            created_at: DateTime::<Utc>::from_timestamp_millis(self.created_at),
            merged_at: self.merged_at.and_then(DateTime::<Utc>::from_timestamp_millis),
        }
    }
}

/// A pull request with its reviewer set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub pull_request_id: String,
    pub pull_request_name: String,
    pub author_id: String,
    pub status: PullRequestStatus,
    /// Reviewer ids in assignment order; never contains the author.
    pub assigned_reviewers: Vec<String>,
    #[serde(rename = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "mergedAt", skip_serializing_if = "Option::is_none")]
    pub merged_at: Option<DateTime<Utc>>,
}

impl PullRequest {
    pub fn is_open(&self) -> bool {
        self.status == PullRequestStatus::Open
    }

    pub fn has_reviewer(&self, user_id: &str) -> bool {
        self.assigned_reviewers.iter().any(|r| r == user_id)
    }
}

/// Compact pull request listing used by review queues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PullRequestShort {
    pub pull_request_id: String,
    pub pull_request_name: String,
    pub author_id: String,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str, merged_at: Option<i64>) -> PullRequestRow {
        PullRequestRow {
            pull_request_id: "pr-1".into(),
            pull_request_name: "Add feature".into(),
            author_id: "u1".into(),
            status: status.into(),
            created_at: 1_700_000_000_000,
            merged_at,
        }
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!(PullRequestStatus::from("OPEN"), PullRequestStatus::Open);
        assert_eq!(PullRequestStatus::from("merged"), PullRequestStatus::Merged);
        assert_eq!(PullRequestStatus::from("unknown"), PullRequestStatus::Open);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(PullRequestStatus::Open.to_string(), "OPEN");
        assert_eq!(PullRequestStatus::Merged.to_string(), "MERGED");
    }

    #[test]
    fn test_open_pr_serialization_omits_merged_at() {
        let pr = row("OPEN", None).with_reviewers(vec!["u2".into(), "u3".into()]);
        let json = serde_json::to_value(&pr).unwrap();

        assert_eq!(json["status"], "OPEN");
        assert_eq!(json["assigned_reviewers"], serde_json::json!(["u2", "u3"]));
        assert!(json.get("createdAt").is_some());
        assert!(json.get("mergedAt").is_none());
    }

    #[test]
    fn test_merged_pr_has_merged_at() {
        let pr = row("MERGED", Some(1_700_000_100_000)).with_reviewers(vec![]);
        assert!(!pr.is_open());
        assert_eq!(
            pr.merged_at.map(|t| t.timestamp_millis()),
            Some(1_700_000_100_000)
        );
    }

    #[test]
    fn test_has_reviewer() {
        let pr = row("OPEN", None).with_reviewers(vec!["u2".into()]);
        assert!(pr.has_reviewer("u2"));
        assert!(!pr.has_reviewer("u1"));
    }
}
