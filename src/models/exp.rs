use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One append-only entry in the EXP audit trail. Never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExpLedgerEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: i64,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ExpTotalResponse {
    pub user_id: Uuid,
    pub exp: i64,
}

#[derive(Debug, Deserialize)]
pub struct ExpHistoryQuery {
    pub limit: Option<u32>,
}
