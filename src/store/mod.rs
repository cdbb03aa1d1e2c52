//! Storage abstraction for the reputation ledger.
//!
//! The engine is storage-agnostic: it drives a `ReputationUnit` (one atomic
//! unit of work) obtained from a `ReputationStore`. Implementations are
//! Postgres (primary) and in-memory (for tests).

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::Result,
    models::{ExpLedgerEntry, Polarity, TargetRef, VoteState},
};

/// What the caller gets back from a cast: the target's new score and the
/// caller's resulting stance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CastOutcome {
    pub score: i64,
    pub user_vote: VoteState,
}

#[async_trait]
pub trait ReputationStore: Send + Sync {
    /// Open one atomic unit of work. Dropping the unit without committing
    /// rolls back everything done through it.
    async fn begin(&self) -> Result<Box<dyn ReputationUnit>>;

    /// The caller's current stance on a target.
    async fn vote_state(&self, user_id: Uuid, target: TargetRef) -> Result<VoteState>;

    /// Denormalized score of a target.
    async fn target_score(&self, target: TargetRef) -> Result<i64>;

    /// A user's running EXP total.
    async fn exp_total(&self, user_id: Uuid) -> Result<i64>;

    /// Most recent ledger entries for a user, newest first.
    async fn exp_history(&self, user_id: Uuid, limit: u32) -> Result<Vec<ExpLedgerEntry>>;
}

/// One atomic unit spanning the vote mutation, the score delta, and the
/// conditional EXP award. Only the engine drives this.
#[async_trait]
pub trait ReputationUnit: Send {
    /// Author of the target, or `None` if the target does not exist.
    async fn author_of(&mut self, target: TargetRef) -> Result<Option<Uuid>>;

    /// Current vote row for (user, target), locked for the remainder of the
    /// unit so concurrent casts by the same user serialize.
    async fn get_vote(&mut self, user_id: Uuid, target: TargetRef) -> Result<Option<Polarity>>;

    /// Create or overwrite the single allowed vote row. `replacing` is the
    /// polarity observed by the locked read in this unit: it decides insert
    /// versus overwrite, so a concurrent duplicate first-cast surfaces as a
    /// uniqueness violation instead of silently merging.
    async fn put_vote(
        &mut self,
        user_id: Uuid,
        target: TargetRef,
        polarity: Polarity,
        replacing: Option<Polarity>,
    ) -> Result<()>;

    /// Delete the vote row if present. Idempotent.
    async fn remove_vote(&mut self, user_id: Uuid, target: TargetRef) -> Result<()>;

    /// Apply a signed delta to the target's denormalized score as one
    /// atomic increment, returning the new score.
    async fn apply_score_delta(&mut self, target: TargetRef, delta: i64) -> Result<i64>;

    /// Append a ledger entry and bump the user's EXP total together.
    async fn award_exp(&mut self, user_id: Uuid, amount: i64, reason: &str) -> Result<()>;

    async fn commit(self: Box<Self>) -> Result<()>;
}
