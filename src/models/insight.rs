use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

/// Cached oracle output, one row per user. Stale iff a mock completed after
/// `generated_at`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InsightRecord {
    pub user_id: Uuid,
    pub payload: JsonValue,
    pub generated_at: DateTime<Utc>,
}

/// The coaching blurb shape the oracle must produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightPayload {
    pub headline: String,
    pub analysis: String,
    pub action_plan: Vec<String>,
}
