use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    AppState,
    error::Result,
    models::{ExpHistoryQuery, ExpTotalResponse},
};

pub async fn get_user_exp(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ExpTotalResponse>> {
    let exp = state.store.exp_total(user_id).await?;

    Ok(Json(ExpTotalResponse { user_id, exp }))
}

pub async fn get_user_exp_history(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(params): Query<ExpHistoryQuery>,
) -> Result<Json<Value>> {
    let limit = params.limit.unwrap_or(25).min(100);

    let entries = state.store.exp_history(user_id, limit).await?;

    Ok(Json(json!({
        "user_id": user_id,
        "entries": entries
    })))
}
