use axum::{
    extract::{Path, State},
    response::Json,
};
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    engine,
    error::Result,
    models::{TargetRef, VoteRequest, VoteResponse},
};

async fn cast(
    state: &AppState,
    auth_user: AuthUser,
    target: TargetRef,
    payload: VoteRequest,
) -> Result<Json<VoteResponse>> {
    let outcome = engine::cast_vote(
        state.store.as_ref(),
        &state.policy,
        auth_user.user_id,
        target,
        payload.polarity,
    )
    .await?;

    Ok(Json(VoteResponse {
        user_vote: outcome.user_vote,
        score: outcome.score,
    }))
}

async fn current(
    state: &AppState,
    auth_user: AuthUser,
    target: TargetRef,
) -> Result<Json<VoteResponse>> {
    // Score lookup first so a missing target is a 404, not an empty stance.
    let score = state.store.target_score(target).await?;
    let user_vote = state.store.vote_state(auth_user.user_id, target).await?;

    Ok(Json(VoteResponse { user_vote, score }))
}

pub async fn vote_post(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<VoteRequest>,
) -> Result<Json<VoteResponse>> {
    cast(&state, auth_user, TargetRef::post(post_id), payload).await
}

pub async fn vote_comment(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(comment_id): Path<Uuid>,
    Json(payload): Json<VoteRequest>,
) -> Result<Json<VoteResponse>> {
    cast(&state, auth_user, TargetRef::comment(comment_id), payload).await
}

pub async fn get_post_vote(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(post_id): Path<Uuid>,
) -> Result<Json<VoteResponse>> {
    current(&state, auth_user, TargetRef::post(post_id)).await
}

pub async fn get_comment_vote(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(comment_id): Path<Uuid>,
) -> Result<Json<VoteResponse>> {
    current(&state, auth_user, TargetRef::comment(comment_id)).await
}
