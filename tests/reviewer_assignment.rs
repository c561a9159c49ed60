//! Reviewer assignment tests.
//!
//! These tests drive the assignment engine against a real SQLite file and
//! check the reviewer-set rules end to end:
//! 1. Creation picks up to two active teammates, never the author
//! 2. Merge is idempotent and freezes the reviewer set
//! 3. Reassignment swaps exactly one reviewer
//! 4. Concurrent reassignments never corrupt the reviewer set

use reviewer_service_lib::db::{self, pool::DbPool};
use reviewer_service_lib::error::{AppError, ErrorKind};
use reviewer_service_lib::models::{PullRequestStatus, Team, TeamMember};
use reviewer_service_lib::services::directory;
use reviewer_service_lib::services::{AssignmentEngine, ReviewerSelector};
use std::collections::HashSet;
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

/// Fresh database with one team; `(user_id, is_active)` per member
async fn setup(team_name: &str, members: &[(&str, bool)]) -> (TempDir, DbPool) {
    let dir = tempdir().unwrap();
    let pool = db::initialize(&dir.path().join("reviews.db"), 4).await.unwrap();
    add_team(&pool, team_name, members).await;
    (dir, pool)
}

async fn add_team(pool: &DbPool, team_name: &str, members: &[(&str, bool)]) {
    let team = Team {
        team_name: team_name.to_string(),
        members: members
            .iter()
            .map(|(id, active)| TeamMember {
                user_id: id.to_string(),
                username: format!("User {}", id),
                is_active: *active,
            })
            .collect(),
    };
    directory::add_team(pool, &team).await.unwrap();
}

#[tokio::test]
async fn test_scenario_a_two_reviewers_from_team() {
    let (_dir, pool) = setup("backend", &[("a1", true), ("a2", true), ("a3", true)]).await;
    let engine = AssignmentEngine::new(pool, ReviewerSelector::seeded(1));

    let pr = engine.create_pull_request("pr-1", "Add search", "a1").await.unwrap();

    let reviewers: HashSet<&str> = pr.assigned_reviewers.iter().map(String::as_str).collect();
    assert_eq!(reviewers, HashSet::from(["a2", "a3"]));
    assert_eq!(pr.status, PullRequestStatus::Open);
    assert!(pr.merged_at.is_none());
}

#[tokio::test]
async fn test_scenario_b_no_active_teammates() {
    let (_dir, pool) = setup("backend", &[("a1", true), ("a2", true)]).await;
    directory::set_user_active(&pool, "a2", false).await.unwrap();
    let engine = AssignmentEngine::new(pool, ReviewerSelector::seeded(1));

    let pr = engine.create_pull_request("pr-1", "Solo", "a1").await.unwrap();
    assert!(pr.assigned_reviewers.is_empty());
}

#[tokio::test]
async fn test_scenario_c_reassign_to_only_free_teammate() {
    let (_dir, pool) = setup(
        "backend",
        &[("author", true), ("r1", true), ("r2", true), ("r3", false)],
    )
    .await;
    let engine = AssignmentEngine::new(pool.clone(), ReviewerSelector::seeded(1));

    let pr = engine.create_pull_request("pr-1", "Refactor", "author").await.unwrap();
    assert_eq!(pr.assigned_reviewers, vec!["r1", "r2"]);

    directory::set_user_active(&pool, "r3", true).await.unwrap();
    let outcome = engine.reassign_reviewer("pr-1", "r1").await.unwrap();

    assert_eq!(outcome.replaced_by, "r3");
    assert!(!outcome.pr.has_reviewer("r1"));
    assert!(outcome.pr.has_reviewer("r2"));
    assert!(outcome.pr.has_reviewer("r3"));
}

#[tokio::test]
async fn test_scenario_d_no_replacement_candidate() {
    let (_dir, pool) = setup("backend", &[("author", true), ("r1", true), ("r2", true)]).await;
    let engine = AssignmentEngine::new(pool, ReviewerSelector::seeded(1));
    engine.create_pull_request("pr-1", "Refactor", "author").await.unwrap();

    let err = engine.reassign_reviewer("pr-1", "r1").await.unwrap_err();
    assert!(matches!(err, AppError::NoReplacementCandidate { ref team_name } if team_name == "backend"));
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn test_scenario_e_merge_twice() {
    let (_dir, pool) = setup("backend", &[("a1", true), ("a2", true)]).await;
    let engine = AssignmentEngine::new(pool, ReviewerSelector::seeded(1));
    engine.create_pull_request("pr-1", "Ship it", "a1").await.unwrap();

    let first = engine.merge_pull_request("pr-1").await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = engine.merge_pull_request("pr-1").await.unwrap();

    assert_eq!(first.status, PullRequestStatus::Merged);
    assert_eq!(first.merged_at, second.merged_at);
    assert_eq!(
        serde_json::to_value(&first).unwrap(),
        serde_json::to_value(&second).unwrap()
    );
}

#[tokio::test]
async fn test_reassign_on_merged_leaves_pr_unchanged() {
    let (_dir, pool) = setup("backend", &[("a1", true), ("a2", true), ("a3", true), ("a4", true)]).await;
    let engine = AssignmentEngine::new(pool, ReviewerSelector::seeded(5));
    let created = engine.create_pull_request("pr-1", "Ship it", "a1").await.unwrap();
    let merged = engine.merge_pull_request("pr-1").await.unwrap();

    let err = engine
        .reassign_reviewer("pr-1", &created.assigned_reviewers[0])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    let after = engine.merge_pull_request("pr-1").await.unwrap();
    assert_eq!(after, merged);
    assert_eq!(after.assigned_reviewers, created.assigned_reviewers);
}

#[tokio::test]
async fn test_reviewers_always_active_teammates() {
    let (_dir, pool) = setup(
        "backend",
        &[("a1", true), ("a2", true), ("a3", false), ("a4", true), ("a5", true)],
    )
    .await;
    add_team(&pool, "frontend", &[("f1", true), ("f2", true)]).await;
    let engine = AssignmentEngine::new(pool, ReviewerSelector::seeded(99));

    let allowed: HashSet<&str> = HashSet::from(["a2", "a4", "a5"]);
    for i in 0..30 {
        let pr = engine
            .create_pull_request(&format!("pr-{}", i), "Change", "a1")
            .await
            .unwrap();

        assert_eq!(pr.assigned_reviewers.len(), 2);
        assert!(!pr.has_reviewer("a1"));
        let unique: HashSet<&str> = pr.assigned_reviewers.iter().map(String::as_str).collect();
        assert_eq!(unique.len(), 2);
        assert!(unique.is_subset(&allowed));
    }
}

#[tokio::test]
async fn test_reassignment_properties_hold_repeatedly() {
    let (_dir, pool) = setup(
        "backend",
        &[("a1", true), ("a2", true), ("a3", true), ("a4", true), ("a5", true)],
    )
    .await;
    let engine = AssignmentEngine::new(pool, ReviewerSelector::seeded(17));
    let mut pr = engine.create_pull_request("pr-1", "Change", "a1").await.unwrap();

    for _ in 0..20 {
        let old = pr.assigned_reviewers[0].clone();
        let outcome = engine.reassign_reviewer("pr-1", &old).await.unwrap();

        assert_ne!(outcome.replaced_by, old);
        assert!(!outcome.pr.has_reviewer(&old));
        assert!(outcome.pr.has_reviewer(&outcome.replaced_by));
        assert!(!outcome.pr.has_reviewer("a1"));
        assert_eq!(outcome.pr.assigned_reviewers.len(), 2);
        pr = outcome.pr;
    }
}

#[tokio::test]
async fn test_concurrent_reassignments_keep_set_consistent() {
    let (_dir, pool) = setup(
        "backend",
        &[("a1", true), ("a2", true), ("a3", true), ("a4", true), ("a5", true), ("a6", true)],
    )
    .await;
    let engine = Arc::new(AssignmentEngine::new(pool, ReviewerSelector::seeded(3)));
    engine.create_pull_request("pr-1", "Hot path", "a1").await.unwrap();

    let mut handles = Vec::new();
    for old in ["a2", "a3", "a4", "a5", "a6", "a2", "a3", "a4"] {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine.reassign_reviewer("pr-1", old).await
        }));
    }

    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => {}
            Err(AppError::ReviewerNotAssigned { .. }) => {}
            Err(other) => panic!("unexpected error: {}", other),
        }
    }

    let pr = engine.merge_pull_request("pr-1").await.unwrap();
    let unique: HashSet<&str> = pr.assigned_reviewers.iter().map(String::as_str).collect();
    assert_eq!(pr.assigned_reviewers.len(), 2);
    assert_eq!(unique.len(), 2);
    assert!(!unique.contains("a1"));
}

#[tokio::test]
async fn test_review_queue_lists_assigned_prs() {
    let (_dir, pool) = setup("backend", &[("a1", true), ("a2", true)]).await;
    let engine = AssignmentEngine::new(pool.clone(), ReviewerSelector::seeded(1));
    engine.create_pull_request("pr-1", "One", "a1").await.unwrap();
    engine.create_pull_request("pr-2", "Two", "a1").await.unwrap();
    engine.merge_pull_request("pr-1").await.unwrap();

    let reviews = directory::get_user_reviews(&pool, "a2").await.unwrap();
    let listed: Vec<(&str, &str)> = reviews
        .pull_requests
        .iter()
        .map(|p| (p.pull_request_id.as_str(), p.status.as_str()))
        .collect();
    assert_eq!(listed, vec![("pr-1", "MERGED"), ("pr-2", "OPEN")]);
}
