//! Reservoir-sampled user-provided sample store (spec.md §4.8).
//!
//! Ground-truthed against the original implementation's
//! `reservoir_sampling`/`SQLiteConnector.add_samples`: the reservoir is
//! not textbook-exact — candidates are batch-filtered by the replacement
//! probability first, then, if the batch pushes the name's total over
//! `reservoir_size`, the surplus is deleted at random from the *existing*
//! rows (not just the new ones) rather than evicted one at a time. This
//! biases toward keeping recent samples, which is the documented
//! trade-off the `recency_multiplier` parameter exists to tune.

use rand::seq::SliceRandom;
use rand::Rng;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::DatagenError;

/// Default cap on how many user-provided samples are kept per name.
pub const DEFAULT_RESERVOIR_SIZE: i64 = 100_000;

/// Default bias toward recent samples. `1.0` matches the source's own
/// default — no bias beyond what batch-level bulk eviction already
/// introduces.
pub const DEFAULT_RECENCY_MULTIPLIER: f64 = 1.0;

/// One candidate sample offered to the reservoir.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub datatype: String,
    pub serialized_data: String,
    pub user_provided: bool,
}

/// Decide which of `candidates` to keep, given the reservoir's current
/// occupancy and lifetime-seen counter — the pure, side-effect-free half
/// of the algorithm, kept separate from its storage so it can be unit
/// tested without a database.
///
/// Returns the indices into `candidates` selected for insertion.
#[must_use]
pub fn select_candidates(
    candidates_len: usize,
    reservoir_size: i64,
    current_size: i64,
    mut total_items_seen: i64,
    recency_multiplier: f64,
    rng: &mut impl Rng,
) -> Vec<usize> {
    let mut selected = Vec::new();
    let mut occupancy = current_size;

    for index in 0..candidates_len {
        total_items_seen += 1;
        if occupancy < reservoir_size {
            selected.push(index);
            occupancy += 1;
        } else {
            let probability = recency_multiplier
                * (reservoir_size as f64 / (total_items_seen + reservoir_size) as f64);
            if rng.gen_range(0.0..1.0) <= probability {
                selected.push(index);
            }
        }
    }

    let cap = usize::try_from(reservoir_size).unwrap_or(usize::MAX).min(selected.len());
    let mut shuffled = selected;
    shuffled.shuffle(rng);
    shuffled.truncate(cap);
    shuffled
}

/// The Postgres-backed sample store, one reservoir per `name`. All
/// mutation happens inside a single transaction per batch (spec.md §4.8:
/// "The sampler is shared by all writers and guarded by a single
/// transaction").
pub struct SampleStore {
    pool: PgPool,
}

impl SampleStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a batch of candidates for `name`, applying the reservoir
    /// policy and evicting surplus rows at random if the name is over
    /// capacity afterward.
    ///
    /// # Errors
    ///
    /// Returns [`DatagenError::Database`] on a connection or query failure.
    pub async fn add_samples(
        &self,
        name: &str,
        candidates: &[Candidate],
        reservoir_size: i64,
        recency_multiplier: f64,
    ) -> Result<usize, DatagenError> {
        if candidates.is_empty() {
            return Ok(0);
        }

        let mut tx: Transaction<'_, Postgres> = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO sample_seen (name, seen) VALUES ($1, 0) ON CONFLICT DO NOTHING",
        )
        .bind(name)
        .execute(&mut *tx)
        .await?;

        let seen: i64 = sqlx::query_scalar("SELECT seen FROM sample_seen WHERE name = $1")
            .bind(name)
            .fetch_one(&mut *tx)
            .await?;
        let current_size: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM samples WHERE name = $1")
                .bind(name)
                .fetch_one(&mut *tx)
                .await?;

        let mut rng = rand::thread_rng();
        let selected = select_candidates(
            candidates.len(),
            reservoir_size,
            current_size,
            seen,
            recency_multiplier,
            &mut rng,
        );

        let inserted = selected.len();
        for &index in &selected {
            let candidate = &candidates[index];
            sqlx::query(
                r"
                INSERT INTO samples (id, name, datatype, serialized_data, user_provided)
                VALUES ($1, $2, $3, $4, $5)
                ",
            )
            .bind(Uuid::new_v4())
            .bind(name)
            .bind(&candidate.datatype)
            .bind(&candidate.serialized_data)
            .bind(candidate.user_provided)
            .execute(&mut *tx)
            .await?;
        }

        let total_after: i64 = current_size + i64::try_from(inserted).unwrap_or(i64::MAX);
        let surplus = total_after - reservoir_size;
        if surplus > 0 {
            sqlx::query(
                r"
                DELETE FROM samples WHERE id IN (
                    SELECT id FROM samples WHERE name = $1 ORDER BY random() LIMIT $2
                )
                ",
            )
            .bind(name)
            .bind(surplus)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE sample_seen SET seen = seen + $2 WHERE name = $1")
            .bind(name)
            .bind(i64::try_from(candidates.len()).unwrap_or(i64::MAX))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(inserted)
    }

    /// Delete the oldest non-user-provided samples for `name` until at most
    /// `samples_to_store` remain — the explicit eviction path distinct from
    /// the random surplus eviction in [`Self::add_samples`], mirroring the
    /// source's own separate `delete_old_samples` entry point.
    ///
    /// # Errors
    ///
    /// Returns [`DatagenError::Database`] on a connection or query failure.
    pub async fn delete_old_samples(
        &self,
        name: &str,
        samples_to_store: i64,
    ) -> Result<u64, DatagenError> {
        let result = sqlx::query(
            r"
            DELETE FROM samples WHERE id IN (
                SELECT id FROM samples
                WHERE name = $1 AND user_provided = FALSE
                ORDER BY created_at ASC
                OFFSET $2
            )
            ",
        )
        .bind(name)
        .bind(samples_to_store.max(0))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn below_capacity_keeps_every_candidate() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let selected = select_candidates(5, 100, 0, 0, 1.0, &mut rng);
        assert_eq!(selected.len(), 5);
    }

    #[test]
    fn at_capacity_never_exceeds_reservoir_size() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(2);
        let selected = select_candidates(50, 10, 10, 10_000, 1.0, &mut rng);
        assert!(selected.len() <= 10);
    }

    #[test]
    fn zero_recency_multiplier_admits_nothing_once_full() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(3);
        let selected = select_candidates(20, 10, 10, 1000, 0.0, &mut rng);
        assert!(selected.is_empty());
    }
}
