//! In-memory reputation store.
//!
//! Same semantics as Postgres but everything lives in maps behind a mutex.
//! Used by the test suite; a unit stages its writes on a copy of the state
//! and publishes it on commit, so an aborted cast leaves nothing behind.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{ExpLedgerEntry, Polarity, TargetKind, TargetRef, VoteState},
    store::{ReputationStore, ReputationUnit},
};

#[derive(Debug, Clone, Copy)]
struct ContentRow {
    author_id: Uuid,
    score: i64,
}

#[derive(Debug, Clone, Default)]
struct Inner {
    users: HashMap<Uuid, i64>,
    contents: HashMap<(TargetKind, Uuid), ContentRow>,
    votes: HashMap<(Uuid, TargetKind, Uuid), Polarity>,
    ledger: Vec<ExpLedgerEntry>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user with zero EXP.
    pub async fn add_user(&self, user_id: Uuid) {
        self.inner.lock().await.users.entry(user_id).or_insert(0);
    }

    /// Create a content row at score 0 and return its id. Registers the
    /// author if unseen.
    pub async fn add_content(&self, kind: TargetKind, author_id: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        let mut inner = self.inner.lock().await;
        inner.users.entry(author_id).or_insert(0);
        inner.contents.insert(
            (kind, id),
            ContentRow {
                author_id,
                score: 0,
            },
        );
        id
    }

    /// Number of ledger entries recorded for a user.
    pub async fn ledger_len(&self, user_id: Uuid) -> usize {
        self.inner
            .lock()
            .await
            .ledger
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .count()
    }

    /// Recomputes a target's score from the vote rows, bypassing the
    /// denormalized field. Lets tests assert the cache never drifts.
    pub async fn recount_score(&self, target: TargetRef) -> i64 {
        self.inner
            .lock()
            .await
            .votes
            .iter()
            .filter(|((_, kind, id), _)| *kind == target.kind && *id == target.id)
            .map(|(_, polarity)| polarity.score_value())
            .sum()
    }

    /// Vote rows a user holds on a target. At most one by construction.
    pub async fn vote_rows(&self, user_id: Uuid, target: TargetRef) -> usize {
        self.inner
            .lock()
            .await
            .votes
            .keys()
            .filter(|(uid, kind, id)| *uid == user_id && *kind == target.kind && *id == target.id)
            .count()
    }
}

#[async_trait]
impl ReputationStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn ReputationUnit>> {
        let guard = self.inner.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryUnit { guard, staged }))
    }

    async fn vote_state(&self, user_id: Uuid, target: TargetRef) -> Result<VoteState> {
        let inner = self.inner.lock().await;
        let polarity = inner.votes.get(&(user_id, target.kind, target.id)).copied();
        Ok(VoteState::from(polarity))
    }

    async fn target_score(&self, target: TargetRef) -> Result<i64> {
        let inner = self.inner.lock().await;
        inner
            .contents
            .get(&(target.kind, target.id))
            .map(|row| row.score)
            .ok_or_else(|| AppError::NotFound(format!("{} not found", target.kind)))
    }

    async fn exp_total(&self, user_id: Uuid) -> Result<i64> {
        let inner = self.inner.lock().await;
        inner
            .users
            .get(&user_id)
            .copied()
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    async fn exp_history(&self, user_id: Uuid, limit: u32) -> Result<Vec<ExpLedgerEntry>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .ledger
            .iter()
            .rev()
            .filter(|entry| entry.user_id == user_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

struct MemoryUnit {
    guard: OwnedMutexGuard<Inner>,
    staged: Inner,
}

#[async_trait]
impl ReputationUnit for MemoryUnit {
    async fn author_of(&mut self, target: TargetRef) -> Result<Option<Uuid>> {
        Ok(self
            .staged
            .contents
            .get(&(target.kind, target.id))
            .map(|row| row.author_id))
    }

    async fn get_vote(&mut self, user_id: Uuid, target: TargetRef) -> Result<Option<Polarity>> {
        Ok(self
            .staged
            .votes
            .get(&(user_id, target.kind, target.id))
            .copied())
    }

    async fn put_vote(
        &mut self,
        user_id: Uuid,
        target: TargetRef,
        polarity: Polarity,
        replacing: Option<Polarity>,
    ) -> Result<()> {
        let key = (user_id, target.kind, target.id);
        // Mirror the Postgres unique constraint: a first-cast landing on an
        // existing row is a conflict, not a merge.
        if replacing.is_none() && self.staged.votes.contains_key(&key) {
            return Err(AppError::Conflict(
                "Vote conflicted with a concurrent request, retry".to_string(),
            ));
        }
        self.staged.votes.insert(key, polarity);
        Ok(())
    }

    async fn remove_vote(&mut self, user_id: Uuid, target: TargetRef) -> Result<()> {
        self.staged.votes.remove(&(user_id, target.kind, target.id));
        Ok(())
    }

    async fn apply_score_delta(&mut self, target: TargetRef, delta: i64) -> Result<i64> {
        let row = self
            .staged
            .contents
            .get_mut(&(target.kind, target.id))
            .ok_or_else(|| AppError::NotFound(format!("{} not found", target.kind)))?;
        row.score += delta;
        Ok(row.score)
    }

    async fn award_exp(&mut self, user_id: Uuid, amount: i64, reason: &str) -> Result<()> {
        let total = self
            .staged
            .users
            .get_mut(&user_id)
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        *total += amount;
        self.staged.ledger.push(ExpLedgerEntry {
            id: Uuid::new_v4(),
            user_id,
            amount,
            reason: reason.to_string(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryUnit { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}
