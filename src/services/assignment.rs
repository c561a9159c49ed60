//! Pull request creation, merge and single reviewer reassignment.
//!
//! Every operation runs in one SQLite transaction whose first statement writes
//! the row it guards (the author for create, the pull request for merge and
//! reassign). The write takes the database write lock before any check runs,
//! so concurrent mutators cannot interleave between check and update.
//! Dropping an operation mid-flight drops its transaction, which rolls back.

use crate::db::pool::DbPool;
use crate::db::{directory, ledger, now_millis};
use crate::error::AppError;
use crate::models::PullRequest;
use crate::services::selection::{ReviewerSelector, DEFAULT_REVIEWER_LIMIT};
use serde::Serialize;

/// Result of a successful reviewer swap.
#[derive(Debug, Clone, Serialize)]
pub struct Reassignment {
    pub pr: PullRequest,
    pub replaced_by: String,
}

/// Owns the store handle and the random source used to pick reviewers.
pub struct AssignmentEngine {
    pool: DbPool,
    selector: ReviewerSelector,
}

impl AssignmentEngine {
    pub fn new(pool: DbPool, selector: ReviewerSelector) -> Self {
        Self { pool, selector }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Create an OPEN pull request and assign up to two reviewers.
    ///
    /// Reviewers are drawn from the active members of the author's team,
    /// never the author. The author itself does not have to be active.
    ///
    /// # Errors
    /// * `PullRequestExists` if the id is taken by a PR in any status
    /// * `NotFound` (Author) if the author is unknown
    pub async fn create_pull_request(
        &self,
        pr_id: &str,
        pr_name: &str,
        author_id: &str,
    ) -> Result<PullRequest, AppError> {
        require("pull_request_id", pr_id)?;
        require("pull_request_name", pr_name)?;
        require("author_id", author_id)?;

        let now = now_millis();
        let mut tx = self.pool.begin().await?;

        let author_known = directory::lock_user(&mut *tx, author_id).await?;

        if ledger::pull_request_exists(&mut *tx, pr_id).await? {
            return Err(AppError::PullRequestExists {
                pr_id: pr_id.to_string(),
            });
        }

        if !author_known {
            return Err(AppError::author_not_found(author_id));
        }
        let author = directory::get_user(&mut *tx, author_id)
            .await?
            .ok_or_else(|| AppError::author_not_found(author_id))?;

        let candidates = directory::get_active_team_members(
            &mut *tx,
            &author.team_name,
            &[author.user_id.clone()],
        )
        .await?;
        let reviewers = self.selector.select(&candidates, DEFAULT_REVIEWER_LIMIT);

        ledger::insert_pull_request(
            &mut *tx,
            &ledger::NewPullRequest {
                pull_request_id: pr_id,
                pull_request_name: pr_name,
                author_id,
                reviewers: &reviewers,
                created_at: now,
            },
        )
        .await?;

        let pr = ledger::get_pull_request(&mut *tx, pr_id)
            .await?
            .ok_or_else(|| AppError::internal(format!("PR {} missing after insert", pr_id)))?;

        tx.commit().await?;

        log::info!(
            "[assignment] Created PR {} by {} with {} of {} candidates: {:?}",
            pr_id,
            author_id,
            reviewers.len(),
            candidates.len(),
            reviewers
        );

        Ok(pr)
    }

    /// Mark a pull request as merged.
    ///
    /// Idempotent: merging a merged PR returns it unchanged, with its original
    /// `mergedAt`.
    pub async fn merge_pull_request(&self, pr_id: &str) -> Result<PullRequest, AppError> {
        require("pull_request_id", pr_id)?;

        let mut tx = self.pool.begin().await?;

        let transitioned = ledger::mark_merged(&mut *tx, pr_id, now_millis()).await?;
        let pr = ledger::get_pull_request(&mut *tx, pr_id)
            .await?
            .ok_or_else(|| AppError::pull_request_not_found(pr_id))?;

        tx.commit().await?;

        if transitioned {
            log::info!("[assignment] Merged PR {}", pr_id);
        } else {
            log::debug!("[assignment] PR {} already merged", pr_id);
        }

        Ok(pr)
    }

    /// Replace one reviewer with a random active teammate of that reviewer.
    ///
    /// The replacement is never a current reviewer or the author.
    ///
    /// # Errors
    /// Checked in order: `NotFound` (PullRequest), `PullRequestMerged`,
    /// `ReviewerNotAssigned`, `NotFound` (User), `NoReplacementCandidate`.
    pub async fn reassign_reviewer(
        &self,
        pr_id: &str,
        old_reviewer_id: &str,
    ) -> Result<Reassignment, AppError> {
        require("pull_request_id", pr_id)?;
        require("old_user_id", old_reviewer_id)?;

        let mut tx = self.pool.begin().await?;

        if !ledger::lock_pull_request(&mut *tx, pr_id).await? {
            return Err(AppError::pull_request_not_found(pr_id));
        }

        let pr = ledger::get_pull_request(&mut *tx, pr_id)
            .await?
            .ok_or_else(|| AppError::pull_request_not_found(pr_id))?;

        if !pr.is_open() {
            return Err(AppError::PullRequestMerged {
                pr_id: pr_id.to_string(),
            });
        }

        if !pr.has_reviewer(old_reviewer_id) {
            return Err(AppError::ReviewerNotAssigned {
                pr_id: pr_id.to_string(),
                user_id: old_reviewer_id.to_string(),
            });
        }

        let old_reviewer = directory::get_user(&mut *tx, old_reviewer_id)
            .await?
            .ok_or_else(|| AppError::user_not_found(old_reviewer_id))?;

        let mut exclude = pr.assigned_reviewers.clone();
        exclude.push(pr.author_id.clone());

        let candidates =
            directory::get_active_team_members(&mut *tx, &old_reviewer.team_name, &exclude).await?;

        let replacement = self.selector.pick_one(&candidates).ok_or_else(|| {
            AppError::NoReplacementCandidate {
                team_name: old_reviewer.team_name.clone(),
            }
        })?;

        ledger::remove_reviewer(&mut *tx, pr_id, old_reviewer_id).await?;
        ledger::add_reviewer(&mut *tx, pr_id, &replacement, now_millis()).await?;

        let pr = ledger::get_pull_request(&mut *tx, pr_id)
            .await?
            .ok_or_else(|| AppError::pull_request_not_found(pr_id))?;

        tx.commit().await?;

        log::info!(
            "[assignment] PR {}: reviewer {} replaced by {}",
            pr_id,
            old_reviewer_id,
            replacement
        );

        Ok(Reassignment {
            pr,
            replaced_by: replacement,
        })
    }
}

fn require(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::invalid_input_field(
            format!("{} is required", field),
            field,
        ));
    }
    Ok(())
}
