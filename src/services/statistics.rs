//! Store-wide statistics.

use crate::db::pool::DbPool;
use crate::db::statistics;
use crate::error::AppError;
use crate::models::Statistics;

/// Snapshot of all counters, read in one transaction so totals agree.
pub async fn get_statistics(pool: &DbPool) -> Result<Statistics, AppError> {
    let mut tx = pool.begin().await?;
    let stats = statistics::get_statistics(&mut *tx).await?;
    tx.commit().await?;

    log::debug!(
        "[statistics] {} teams, {} users, {} PRs",
        stats.teams.total,
        stats.users.total,
        stats.pull_requests.total
    );

    Ok(stats)
}
