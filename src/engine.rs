//! The reputation engine: the vote-cast state machine and its side effects.
//!
//! A cast request moves a (user, target) pair between three states
//! (`NoVote`, `Upvoted`, `Downvoted`). The transition decides the score
//! delta and whether the target's author earns EXP. All writes for one
//! cast happen inside a single storage unit of work.

use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{Polarity, TargetKind, TargetRef, VoteState},
    store::{CastOutcome, ReputationStore},
};

/// Fallback award amounts when `EXP_UPVOTE`/`EXP_DOWNVOTE` are unset.
/// Config reads these too, so the pair is defined in exactly one place.
pub const DEFAULT_EXP_UPVOTE: i64 = 5;
pub const DEFAULT_EXP_DOWNVOTE: i64 = -2;

/// EXP amounts granted to an author on a brand-new vote.
#[derive(Debug, Clone, Copy)]
pub struct ExpPolicy {
    pub upvote: i64,
    pub downvote: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpAward {
    pub amount: i64,
    pub reason: String,
}

impl ExpPolicy {
    pub fn award_for(&self, kind: TargetKind, polarity: Polarity) -> ExpAward {
        let amount = match polarity {
            Polarity::Up => self.upvote,
            Polarity::Down => self.downvote,
        };
        ExpAward {
            amount,
            reason: format!("{} {}voted", kind, polarity.as_str()),
        }
    }
}

/// The outcome of applying one cast request to a current vote state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CastPlan {
    pub new_state: VoteState,
    pub score_delta: i64,
    /// True only for NoVote -> {Upvoted, Downvoted}. Toggle-off and switch
    /// never touch EXP even though they always adjust the score; the grant
    /// is deliberately not clawed back when a voter changes their mind.
    pub awards_exp: bool,
}

/// The six-row transition table.
pub fn plan_cast(current: VoteState, requested: Polarity) -> CastPlan {
    match current.polarity() {
        // Brand-new vote.
        None => CastPlan {
            new_state: VoteState::from(Some(requested)),
            score_delta: requested.score_value(),
            awards_exp: true,
        },
        // Same polarity again: toggle off, restoring the pre-vote score.
        Some(existing) if existing == requested => CastPlan {
            new_state: VoteState::NoVote,
            score_delta: -existing.score_value(),
            awards_exp: false,
        },
        // Opposite polarity: switch direction, undoing the old contribution
        // and applying the new one.
        Some(existing) => CastPlan {
            new_state: VoteState::from(Some(requested)),
            score_delta: requested.score_value() - existing.score_value(),
            awards_exp: false,
        },
    }
}

/// Execute one cast request as a single atomic unit: vote row mutation,
/// score delta, and (for brand-new non-self votes) the EXP award. Any
/// failure before commit rolls back all of it.
pub async fn cast_vote(
    store: &dyn ReputationStore,
    policy: &ExpPolicy,
    user_id: Uuid,
    target: TargetRef,
    polarity: Polarity,
) -> Result<CastOutcome> {
    let mut unit = store.begin().await?;

    let author_id = unit
        .author_of(target)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} not found", target.kind)))?;

    let current = VoteState::from(unit.get_vote(user_id, target).await?);
    let plan = plan_cast(current, polarity);

    match plan.new_state.polarity() {
        Some(new_polarity) => {
            unit.put_vote(user_id, target, new_polarity, current.polarity())
                .await?
        }
        None => unit.remove_vote(user_id, target).await?,
    }

    let score = unit.apply_score_delta(target, plan.score_delta).await?;

    // Self-votes move the score but never reward the author.
    if plan.awards_exp && author_id != user_id {
        let award = policy.award_for(target.kind, polarity);
        unit.award_exp(author_id, award.amount, &award.reason).await?;
    }

    unit.commit().await?;

    tracing::debug!(
        %user_id,
        %target,
        polarity = polarity.as_str(),
        score,
        "vote cast applied"
    );

    Ok(CastOutcome {
        score,
        user_vote: plan.new_state,
    })
}
