//! Bulk deactivation of team members.
//!
//! Deactivating a batch re-homes the open work of every listed user before the
//! users are switched off: authored pull requests get a new author and
//! reviews get a replacement reviewer. Replacements are handed out round-robin
//! over the team's remaining active members so the load spreads evenly.

use crate::db::pool::DbPool;
use crate::db::{directory, ledger, now_millis};
use crate::error::AppError;
use crate::services::selection::DEFAULT_REVIEWER_LIMIT;
use serde::Serialize;
use std::collections::HashSet;

/// Outcome of [`deactivate_team_members`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeactivationResult {
    pub team_name: String,
    pub deactivated_user_ids: Vec<String>,
    /// Author reassignments plus reviewer replacements.
    pub reassigned_count: u64,
}

/// Cursor over the remaining active members, shared by every pick in one call.
struct RoundRobin<'a> {
    candidates: &'a [String],
    next: usize,
}

impl<'a> RoundRobin<'a> {
    fn new(candidates: &'a [String]) -> Self {
        Self {
            candidates,
            next: 0,
        }
    }

    /// Next candidate in rotation accepted by `eligible`.
    ///
    /// Scans at most one full lap from the cursor. On success the cursor moves
    /// past the chosen candidate; otherwise it stays put.
    fn next_eligible(&mut self, eligible: impl Fn(&str) -> bool) -> Option<String> {
        let len = self.candidates.len();
        for offset in 0..len {
            let index = (self.next + offset) % len;
            let candidate = &self.candidates[index];
            if eligible(candidate) {
                self.next = (index + 1) % len;
                return Some(candidate.clone());
            }
        }
        None
    }
}

/// Deactivate `user_ids` in `team_name` and re-home their open work.
///
/// Duplicate ids are collapsed, keeping first-seen order. Everything happens in
/// one transaction: a failed precondition or store error leaves no trace.
///
/// # Errors
/// * `NotFound` (Team) if the team is unknown
/// * `NotFound` (User) if a listed user is unknown
/// * `UserNotInTeam` if a listed user belongs to another team
pub async fn deactivate_team_members(
    pool: &DbPool,
    team_name: &str,
    user_ids: &[String],
) -> Result<DeactivationResult, AppError> {
    if team_name.trim().is_empty() {
        return Err(AppError::invalid_input_field("team_name is required", "team_name"));
    }

    let mut seen: HashSet<&str> = HashSet::new();
    let mut ids: Vec<String> = Vec::with_capacity(user_ids.len());
    for id in user_ids {
        if seen.insert(id.as_str()) {
            ids.push(id.clone());
        }
    }

    let now = now_millis();
    let mut tx = pool.begin().await?;

    if !directory::lock_team(&mut *tx, team_name).await? {
        return Err(AppError::team_not_found(team_name));
    }

    if ids.is_empty() {
        tx.commit().await?;
        return Ok(DeactivationResult {
            team_name: team_name.to_string(),
            deactivated_user_ids: Vec::new(),
            reassigned_count: 0,
        });
    }

    // Unknown ids are reported before team mismatches, whatever the list order
    let users = directory::get_users_by_ids(&mut *tx, &ids).await?;
    if let Some(missing) = ids.iter().find(|id| !users.iter().any(|u| &u.user_id == *id)) {
        return Err(AppError::user_not_found(missing));
    }
    if let Some(stranger) = users.iter().find(|u| u.team_name != team_name) {
        return Err(AppError::UserNotInTeam {
            user_id: stranger.user_id.clone(),
            team_name: team_name.to_string(),
        });
    }

    let remaining = directory::get_active_team_members(&mut *tx, team_name, &ids).await?;
    let mut rotation = RoundRobin::new(&remaining);
    let mut reassigned_count = 0u64;

    for pr in ledger::list_open_by_authors(&mut *tx, &ids).await? {
        let Some(new_author) = rotation.next_eligible(|_| true) else {
            log::warn!(
                "[cascade] No active member left to take PR {} from {}",
                pr.pull_request_id,
                pr.author_id
            );
            continue;
        };

        ledger::reassign_author(&mut *tx, &pr.pull_request_id, &new_author).await?;
        reassigned_count += 1;
        log::debug!(
            "[cascade] PR {} author {} -> {}",
            pr.pull_request_id,
            pr.author_id,
            new_author
        );

        // An author never reviews their own PR; refill the seat they leave
        if ledger::remove_reviewer(&mut *tx, &pr.pull_request_id, &new_author).await? {
            let left: Vec<&String> = pr
                .assigned_reviewers
                .iter()
                .filter(|r| **r != new_author)
                .collect();
            let refill = rotation
                .next_eligible(|c| c != new_author && !left.iter().any(|r| r.as_str() == c));

            if let Some(new_reviewer) = refill {
                ledger::add_reviewer(&mut *tx, &pr.pull_request_id, &new_reviewer, now).await?;
                reassigned_count += 1;
                log::debug!(
                    "[cascade] PR {} reviewer {} -> {}",
                    pr.pull_request_id,
                    new_author,
                    new_reviewer
                );
            }
        }
    }

    let mut reviewing = ledger::list_open_by_reviewers(&mut *tx, &ids).await?;
    for reviewer_id in &ids {
        let Some(prs) = reviewing.remove(reviewer_id) else {
            continue;
        };

        for listed in prs {
            // Reload: an earlier step may have changed author or reviewers
            let Some(pr) = ledger::get_pull_request(&mut *tx, &listed.pull_request_id).await?
            else {
                continue;
            };

            if !ledger::remove_reviewer(&mut *tx, &pr.pull_request_id, reviewer_id).await? {
                continue;
            }

            let left: Vec<&String> = pr
                .assigned_reviewers
                .iter()
                .filter(|r| *r != reviewer_id)
                .collect();
            if left.len() >= DEFAULT_REVIEWER_LIMIT {
                continue;
            }

            let replacement = rotation.next_eligible(|c| {
                c != pr.author_id && !left.iter().any(|r| r.as_str() == c)
            });

            match replacement {
                Some(new_reviewer) => {
                    ledger::add_reviewer(&mut *tx, &pr.pull_request_id, &new_reviewer, now)
                        .await?;
                    reassigned_count += 1;
                    log::debug!(
                        "[cascade] PR {} reviewer {} -> {}",
                        pr.pull_request_id,
                        reviewer_id,
                        new_reviewer
                    );
                }
                None => {
                    log::warn!(
                        "[cascade] No replacement for {} on PR {}, leaving {} reviewer(s)",
                        reviewer_id,
                        pr.pull_request_id,
                        left.len()
                    );
                }
            }
        }
    }

    directory::deactivate_users(&mut *tx, &ids, now).await?;
    tx.commit().await?;

    log::info!(
        "[cascade] Deactivated {} member(s) of {}, {} reassignment(s)",
        ids.len(),
        team_name,
        reassigned_count
    );

    Ok(DeactivationResult {
        team_name: team_name.to_string(),
        deactivated_user_ids: ids,
        reassigned_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_round_robin_wraps() {
        let pool = ids(&["a", "b", "c"]);
        let mut rr = RoundRobin::new(&pool);

        let picks: Vec<String> = (0..4).filter_map(|_| rr.next_eligible(|_| true)).collect();
        assert_eq!(picks, ids(&["a", "b", "c", "a"]));
    }

    #[test]
    fn test_round_robin_skips_ineligible() {
        let pool = ids(&["a", "b", "c"]);
        let mut rr = RoundRobin::new(&pool);

        assert_eq!(rr.next_eligible(|c| c != "a").as_deref(), Some("b"));
        assert_eq!(rr.next_eligible(|_| true).as_deref(), Some("c"));
        assert_eq!(rr.next_eligible(|c| c == "b").as_deref(), Some("b"));
    }

    #[test]
    fn test_round_robin_exhausted() {
        let pool = ids(&["a"]);
        let mut rr = RoundRobin::new(&pool);
        assert!(rr.next_eligible(|_| false).is_none());
        assert_eq!(rr.next_eligible(|_| true).as_deref(), Some("a"));

        let empty: Vec<String> = Vec::new();
        let mut rr = RoundRobin::new(&empty);
        assert!(rr.next_eligible(|_| true).is_none());
    }
}
