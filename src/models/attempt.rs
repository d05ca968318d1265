use crate::models::difficulty::Difficulty;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "attempt_context", rename_all = "lowercase")]
pub enum AttemptContext {
    Practice,
    Mock,
}

/// Append-only record of one submitted answer. `is_correct` is derived at
/// append time and never rewritten; `difficulty` is the question's own
/// level, which may differ from the topic's current level when fallback
/// selection served an off-target question.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Attempt {
    pub id: Uuid,
    pub user_id: Uuid,
    pub question_id: Uuid,
    pub chosen_index: i32,
    pub is_correct: bool,
    pub elapsed_seconds: i32,
    pub difficulty: Difficulty,
    pub topic: String,
    pub category: String,
    pub context: AttemptContext,
    pub attempted_at: DateTime<Utc>,
}
