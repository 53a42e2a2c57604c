//! `PostgreSQL` implementation of the engine's [`WalkerStore`].
//!
//! # Tables
//!
//! | Table | Columns touched |
//! |-------|-----------------|
//! | `walkers` | `current_index`, `status`, `updated_at`, `finished_at` |
//! | `players` | `x`, `y`, `last_active` (read: `speed_multiplier`) |
//!
//! Each commit runs in its own transaction. The walker update is
//! conditional on the row still being `walking` at the index the decision
//! was computed from, so two drivers racing on the same walker cannot both
//! apply a step: the loser's `UPDATE` matches zero rows after waiting on the
//! row lock and its transaction is rolled back.

use chrono::{DateTime, Utc};
use pathwalk_core::{StoreError, WalkerCommit, WalkerStore};
use pathwalk_types::{ActiveWalker, GridPoint, OwnerId, WalkerId, WalkerStatus};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::error::DbError;

/// Active walkers joined with their owner's speed, oldest first.
///
/// `NUMERIC` admits `NaN` (and infinities on newer servers), which
/// [`Decimal`] cannot hold; those speeds are read as NULL and flagged.
const SELECT_ACTIVE: &str = r"SELECT w.walker_id, w.user_id, w.positions, w.current_index,
             CASE WHEN p.speed_multiplier::text IN ('NaN', 'Infinity', '-Infinity')
                  THEN NULL
                  ELSE p.speed_multiplier
             END AS speed_multiplier,
             COALESCE(p.speed_multiplier::text IN ('NaN', 'Infinity', '-Infinity'), FALSE)
                 AS speed_unreadable
      FROM walkers w
      JOIN players p ON w.user_id = p.user_id
      WHERE w.status = 'walking'
      ORDER BY w.walker_id";

const UPDATE_WALKER: &str = r"UPDATE walkers
      SET current_index = $1, status = $2, updated_at = $3,
          finished_at = COALESCE($4, finished_at)
      WHERE walker_id = $5 AND status = 'walking' AND current_index = $6";

const UPDATE_PLAYER: &str =
    r"UPDATE players SET x = $1, y = $2, last_active = $3 WHERE user_id = $4";

#[derive(Debug, sqlx::FromRow)]
struct ActiveWalkerRow {
    walker_id: i64,
    user_id: i64,
    positions: serde_json::Value,
    current_index: i32,
    speed_multiplier: Option<Decimal>,
    speed_unreadable: bool,
}

impl TryFrom<ActiveWalkerRow> for ActiveWalker {
    type Error = DbError;

    fn try_from(row: ActiveWalkerRow) -> Result<Self, Self::Error> {
        let current_index = u32::try_from(row.current_index).map_err(|e| {
            DbError::InvalidRow(format!(
                "walker {} has index {}: {e}",
                row.walker_id, row.current_index
            ))
        })?;
        Ok(Self {
            walker_id: WalkerId::new(row.walker_id),
            owner_id: OwnerId::new(row.user_id),
            path: row.positions,
            current_index,
            speed_multiplier: row.speed_multiplier.unwrap_or(Decimal::ONE),
        })
    }
}

/// A full `walkers` row, for inspection.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct WalkerRow {
    /// Row key.
    pub walker_id: i64,
    /// Owning player.
    pub user_id: i64,
    /// Raw path.
    pub positions: serde_json::Value,
    /// Cursor into the path.
    pub current_index: i32,
    /// `walking` or `done`.
    pub status: String,
    /// Last engine update.
    pub updated_at: Option<DateTime<Utc>>,
    /// Retirement time.
    pub finished_at: Option<DateTime<Utc>>,
}

impl WalkerRow {
    /// Parsed status, `None` for a value outside the column's check.
    pub fn status(&self) -> Option<WalkerStatus> {
        match self.status.as_str() {
            "walking" => Some(WalkerStatus::Walking),
            "done" => Some(WalkerStatus::Done),
            _ => None,
        }
    }
}

/// Walker persistence backed by a `PostgreSQL` pool.
#[derive(Clone)]
pub struct PgWalkerStore {
    pool: PgPool,
}

impl PgWalkerStore {
    /// Create a store on an existing pool.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Read the batch of active walkers.
    ///
    /// Rows that cannot be represented (a negative index slipped past the
    /// column check) are logged and skipped rather than failing the batch.
    /// A non-finite speed is logged and read as 1.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn fetch_active(&self) -> Result<Vec<ActiveWalker>, DbError> {
        let rows = sqlx::query_as::<_, ActiveWalkerRow>(SELECT_ACTIVE)
            .fetch_all(&self.pool)
            .await?;

        let mut walkers = Vec::with_capacity(rows.len());
        for row in rows {
            if row.speed_unreadable {
                tracing::warn!(
                    walker_id = row.walker_id,
                    owner_id = row.user_id,
                    "Owner speed is not a finite number, using 1"
                );
            }
            match ActiveWalker::try_from(row) {
                Ok(walker) => walkers.push(walker),
                Err(e) => tracing::warn!(error = %e, "Skipping unreadable walker row"),
            }
        }

        tracing::debug!(count = walkers.len(), "Selected active walkers");
        Ok(walkers)
    }

    /// Fetch one walker row.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn get_walker(&self, walker_id: WalkerId) -> Result<Option<WalkerRow>, DbError> {
        let row = sqlx::query_as::<_, WalkerRow>(
            r"SELECT walker_id, user_id, positions, current_index, status, updated_at, finished_at
              FROM walkers
              WHERE walker_id = $1",
        )
        .bind(walker_id.into_inner())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Fetch a player's position.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn get_owner_position(
        &self,
        owner_id: OwnerId,
    ) -> Result<Option<GridPoint>, DbError> {
        let row: Option<(i32, i32)> =
            sqlx::query_as("SELECT x, y FROM players WHERE user_id = $1")
                .bind(owner_id.into_inner())
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(GridPoint::from))
    }

    async fn apply(&self, commit: &WalkerCommit) -> Result<(), StoreError> {
        let index = column_index(commit.walker.current_index)?;
        let expected = column_index(commit.expected_index)?;

        let mut tx = self.pool.begin().await.map_err(commit_error)?;

        let updated = sqlx::query(UPDATE_WALKER)
            .bind(index)
            .bind(commit.walker.status.as_str())
            .bind(commit.walker.updated_at)
            .bind(commit.walker.finished_at)
            .bind(commit.walker_id.into_inner())
            .bind(expected)
            .execute(&mut *tx)
            .await
            .map_err(commit_error)?
            .rows_affected();

        if updated == 0 {
            tx.rollback().await.map_err(commit_error)?;
            return Err(StoreError::Conflict {
                walker_id: commit.walker_id,
                expected_index: commit.expected_index,
            });
        }

        if let Some(write) = commit.owner_position {
            let moved = sqlx::query(UPDATE_PLAYER)
                .bind(write.position.x)
                .bind(write.position.y)
                .bind(write.last_active)
                .bind(commit.owner_id.into_inner())
                .execute(&mut *tx)
                .await
                .map_err(commit_error)?
                .rows_affected();

            if moved == 0 {
                tx.rollback().await.map_err(commit_error)?;
                return Err(StoreError::Commit {
                    message: format!("player {} does not exist", commit.owner_id),
                });
            }
        }

        tx.commit().await.map_err(commit_error)?;

        tracing::debug!(
            walker_id = %commit.walker_id,
            index = commit.walker.current_index,
            status = commit.walker.status.as_str(),
            "Committed walker"
        );
        Ok(())
    }
}

fn commit_error(e: sqlx::Error) -> StoreError {
    DbError::from(e).into_commit()
}

fn column_index(index: u32) -> Result<i32, StoreError> {
    i32::try_from(index).map_err(|e| {
        DbError::InvalidRow(format!("index {index} does not fit the column: {e}")).into_commit()
    })
}

impl WalkerStore for PgWalkerStore {
    async fn active_walkers(&self) -> Result<Vec<ActiveWalker>, StoreError> {
        self.fetch_active().await.map_err(DbError::into_unavailable)
    }

    async fn commit(&self, commit: &WalkerCommit) -> Result<(), StoreError> {
        self.apply(commit).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn row(current_index: i32, speed: Option<Decimal>) -> ActiveWalkerRow {
        ActiveWalkerRow {
            walker_id: 10,
            user_id: 20,
            positions: json!([[0, 0], [1, 1]]),
            current_index,
            speed_multiplier: speed,
            speed_unreadable: false,
        }
    }

    #[test]
    fn null_speed_reads_as_one() {
        let walker = ActiveWalker::try_from(row(0, None)).unwrap();
        assert_eq!(walker.speed_multiplier, Decimal::ONE);
        assert_eq!(walker.walker_id, WalkerId::new(10));
        assert_eq!(walker.owner_id, OwnerId::new(20));
    }

    #[test]
    fn stored_speed_is_kept() {
        let walker = ActiveWalker::try_from(row(1, Some(Decimal::new(15, 1)))).unwrap();
        assert_eq!(walker.speed_multiplier, Decimal::new(15, 1));
        assert_eq!(walker.current_index, 1);
    }

    #[test]
    fn negative_index_is_rejected() {
        let err = ActiveWalker::try_from(row(-1, None)).unwrap_err();
        assert!(matches!(err, DbError::InvalidRow(_)));
    }

    #[test]
    fn oversized_index_is_a_commit_error() {
        assert_eq!(column_index(7).unwrap(), 7);
        assert!(matches!(
            column_index(u32::MAX),
            Err(StoreError::Commit { .. })
        ));
    }

    #[test]
    fn walker_row_status_parsing() {
        let mut walker = WalkerRow {
            walker_id: 1,
            user_id: 2,
            positions: json!([]),
            current_index: 0,
            status: String::from("done"),
            updated_at: None,
            finished_at: None,
        };
        assert_eq!(walker.status(), Some(WalkerStatus::Done));
        walker.status = String::from("paused");
        assert_eq!(walker.status(), None);
    }
}
