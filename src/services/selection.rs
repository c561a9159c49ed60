//! Reviewer selection.
//!
//! Picking reviewers is a pure function of the candidate pool and a random
//! source. [`ReviewerSelector`] owns the random source so the engine can be
//! built with entropy in production and a fixed seed in tests.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore, SeedableRng};
use std::sync::{Mutex, PoisonError};

/// Reviewers assigned to a newly created pull request.
pub const DEFAULT_REVIEWER_LIMIT: usize = 2;

/// Choose up to `limit` distinct candidates uniformly without replacement.
///
/// When the pool is no larger than `limit` every candidate is returned in pool
/// order and `rng` is left untouched.
pub fn select_reviewers<R: Rng + ?Sized>(
    candidates: &[String],
    limit: usize,
    rng: &mut R,
) -> Vec<String> {
    if candidates.len() <= limit {
        return candidates.to_vec();
    }

    candidates
        .choose_multiple(rng, limit)
        .cloned()
        .collect()
}

/// Shared, thread-safe source of reviewer picks.
pub struct ReviewerSelector {
    rng: Mutex<Box<dyn RngCore + Send>>,
}

impl ReviewerSelector {
    /// Selector seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic selector for tests and reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(rng: impl RngCore + Send + 'static) -> Self {
        Self {
            rng: Mutex::new(Box::new(rng)),
        }
    }

    /// Pick up to `limit` reviewers from `candidates`.
    pub fn select(&self, candidates: &[String], limit: usize) -> Vec<String> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        select_reviewers(candidates, limit, &mut **rng)
    }

    /// Pick a single candidate, or `None` for an empty pool.
    pub fn pick_one(&self, candidates: &[String]) -> Option<String> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        candidates.choose(&mut **rng).cloned()
    }
}

impl Default for ReviewerSelector {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl std::fmt::Debug for ReviewerSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReviewerSelector").finish_non_exhaustive()
    }
}
