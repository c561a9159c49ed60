//! Team and user management on top of the directory queries.

use crate::db::pool::DbPool;
use crate::db::{directory, ledger, now_millis};
use crate::error::AppError;
use crate::models::{PullRequestShort, Team, User};
use serde::Serialize;

/// Pull requests a user is assigned to review.
#[derive(Debug, Clone, Serialize)]
pub struct UserReviews {
    pub user_id: String,
    pub pull_requests: Vec<PullRequestShort>,
}

/// Create a team and create or update its members in one transaction.
///
/// Existing users listed as members are moved into the new team.
///
/// # Errors
/// * `InvalidInput` for a blank team name or blank/duplicate member ids
/// * `TeamExists` if the name is already taken
pub async fn add_team(pool: &DbPool, team: &Team) -> Result<Team, AppError> {
    team.validate().map_err(AppError::invalid_input)?;

    let now = now_millis();
    let mut tx = pool.begin().await?;

    match directory::insert_team(&mut *tx, &team.team_name, now).await {
        Ok(()) => {}
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(AppError::TeamExists {
                team_name: team.team_name.clone(),
            });
        }
        Err(e) => return Err(e.into()),
    }

    for member in &team.members {
        directory::upsert_member(&mut *tx, &team.team_name, member, now).await?;
    }

    let created = directory::get_team(&mut *tx, &team.team_name)
        .await?
        .ok_or_else(|| AppError::team_not_found(&team.team_name))?;

    tx.commit().await?;

    log::info!(
        "[directory] Created team {} with {} members",
        created.team_name,
        created.members.len()
    );

    Ok(created)
}

pub async fn get_team(pool: &DbPool, team_name: &str) -> Result<Team, AppError> {
    let mut conn = pool.acquire().await?;

    directory::get_team(&mut *conn, team_name)
        .await?
        .ok_or_else(|| AppError::team_not_found(team_name))
}

/// Flip a single user's active flag.
///
/// Existing reviewer assignments are left alone; only the deactivation
/// cascade re-homes reviews.
pub async fn set_user_active(
    pool: &DbPool,
    user_id: &str,
    is_active: bool,
) -> Result<User, AppError> {
    let mut conn = pool.acquire().await?;

    let user = directory::set_user_active(&mut *conn, user_id, is_active, now_millis())
        .await?
        .ok_or_else(|| AppError::user_not_found(user_id))?;

    log::info!("[directory] User {} is_active={}", user_id, is_active);
    Ok(user)
}

/// Every pull request, open or merged, that `user_id` reviews.
pub async fn get_user_reviews(pool: &DbPool, user_id: &str) -> Result<UserReviews, AppError> {
    let mut tx = pool.begin().await?;

    if directory::get_user(&mut *tx, user_id).await?.is_none() {
        return Err(AppError::user_not_found(user_id));
    }
    let pull_requests = ledger::list_by_reviewer(&mut *tx, user_id).await?;

    tx.commit().await?;

    Ok(UserReviews {
        user_id: user_id.to_string(),
        pull_requests,
    })
}
