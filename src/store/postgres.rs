//! Postgres-backed reputation store.
//!
//! One cast runs inside one transaction: the vote row read takes a
//! `FOR UPDATE` lock so concurrent casts by the same user serialize, the
//! score update is a single atomic increment so concurrent voters on the
//! same target cannot lose a delta, and the EXP ledger append commits or
//! rolls back with everything else.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{ExpLedgerEntry, Polarity, TargetRef, VoteState},
    store::{ReputationStore, ReputationUnit},
};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Retryable conflicts get their own variant; everything else stays a
/// database error. 23505 on the votes unique index means two first-casts
/// raced; 40001/40P01 are serialization/deadlock failures.
fn map_db_err(err: sqlx::Error) -> AppError {
    if let Some(db_err) = err.as_database_error() {
        if let Some(code) = db_err.code() {
            match code.as_ref() {
                "23505" | "40001" | "40P01" => {
                    return AppError::Conflict(
                        "Vote conflicted with a concurrent request, retry".to_string(),
                    );
                }
                _ => {}
            }
        }
    }
    AppError::Database(err)
}

#[async_trait]
impl ReputationStore for PgStore {
    async fn begin(&self) -> Result<Box<dyn ReputationUnit>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnit { tx }))
    }

    async fn vote_state(&self, user_id: Uuid, target: TargetRef) -> Result<VoteState> {
        let row = sqlx::query(
            "SELECT polarity FROM votes WHERE user_id = $1 AND target_kind = $2 AND target_id = $3",
        )
        .bind(user_id)
        .bind(target.kind.as_str())
        .bind(target.id)
        .fetch_optional(&self.pool)
        .await?;

        let polarity = row
            .map(|row| Polarity::try_from(row.try_get::<i16, _>("polarity")?))
            .transpose()?;

        Ok(VoteState::from(polarity))
    }

    async fn target_score(&self, target: TargetRef) -> Result<i64> {
        let query = format!("SELECT score FROM {} WHERE id = $1", target.kind.content_table());
        let row = sqlx::query(&query)
            .bind(target.id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} not found", target.kind)))?;

        Ok(row.try_get("score")?)
    }

    async fn exp_total(&self, user_id: Uuid) -> Result<i64> {
        let row = sqlx::query("SELECT exp FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        Ok(row.try_get("exp")?)
    }

    async fn exp_history(&self, user_id: Uuid, limit: u32) -> Result<Vec<ExpLedgerEntry>> {
        let entries = sqlx::query_as::<_, ExpLedgerEntry>(
            r#"
            SELECT id, user_id, amount, reason, created_at
            FROM exp_ledger
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}

struct PgUnit {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl ReputationUnit for PgUnit {
    async fn author_of(&mut self, target: TargetRef) -> Result<Option<Uuid>> {
        let query = format!(
            "SELECT author_id FROM {} WHERE id = $1",
            target.kind.content_table()
        );
        let row = sqlx::query(&query)
            .bind(target.id)
            .fetch_optional(&mut *self.tx)
            .await?;

        row.map(|row| row.try_get("author_id").map_err(AppError::from))
            .transpose()
    }

    async fn get_vote(&mut self, user_id: Uuid, target: TargetRef) -> Result<Option<Polarity>> {
        let row = sqlx::query(
            r#"
            SELECT polarity FROM votes
            WHERE user_id = $1 AND target_kind = $2 AND target_id = $3
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .bind(target.kind.as_str())
        .bind(target.id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_db_err)?;

        row.map(|row| Polarity::try_from(row.try_get::<i16, _>("polarity")?))
            .transpose()
    }

    async fn put_vote(
        &mut self,
        user_id: Uuid,
        target: TargetRef,
        polarity: Polarity,
        replacing: Option<Polarity>,
    ) -> Result<()> {
        if replacing.is_none() {
            // Brand-new vote. A plain insert, so a racing first-cast for the
            // same (user, target) hits the unique constraint and the whole
            // unit rolls back instead of double-counting the score.
            sqlx::query(
                r#"
                INSERT INTO votes (id, user_id, target_kind, target_id, polarity, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $6)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(target.kind.as_str())
            .bind(target.id)
            .bind(polarity as i16)
            .bind(Utc::now())
            .execute(&mut *self.tx)
            .await
            .map_err(map_db_err)?;
        } else {
            // Switch: the row is already locked by the read in this unit.
            let result = sqlx::query(
                r#"
                UPDATE votes SET polarity = $1, updated_at = $2
                WHERE user_id = $3 AND target_kind = $4 AND target_id = $5
                "#,
            )
            .bind(polarity as i16)
            .bind(Utc::now())
            .bind(user_id)
            .bind(target.kind.as_str())
            .bind(target.id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_db_err)?;

            if result.rows_affected() == 0 {
                return Err(AppError::Internal(
                    "Locked vote row disappeared mid-transaction".to_string(),
                ));
            }
        }

        Ok(())
    }

    async fn remove_vote(&mut self, user_id: Uuid, target: TargetRef) -> Result<()> {
        sqlx::query("DELETE FROM votes WHERE user_id = $1 AND target_kind = $2 AND target_id = $3")
            .bind(user_id)
            .bind(target.kind.as_str())
            .bind(target.id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_db_err)?;

        Ok(())
    }

    async fn apply_score_delta(&mut self, target: TargetRef, delta: i64) -> Result<i64> {
        let query = format!(
            "UPDATE {} SET score = score + $1, updated_at = $2 WHERE id = $3 RETURNING score",
            target.kind.content_table()
        );
        let row = sqlx::query(&query)
            .bind(delta)
            .bind(Utc::now())
            .bind(target.id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_db_err)?
            .ok_or_else(|| AppError::NotFound(format!("{} not found", target.kind)))?;

        Ok(row.try_get("score")?)
    }

    async fn award_exp(&mut self, user_id: Uuid, amount: i64, reason: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO exp_ledger (id, user_id, amount, reason, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(amount)
        .bind(reason)
        .bind(Utc::now())
        .execute(&mut *self.tx)
        .await
        .map_err(map_db_err)?;

        let result = sqlx::query("UPDATE users SET exp = exp + $1 WHERE id = $2")
            .bind(amount)
            .bind(user_id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_db_err)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await.map_err(map_db_err)
    }
}
