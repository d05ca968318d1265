use crate::models::difficulty::Difficulty;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Summary of one completed mock test. Mocks feed analytics and the insight
/// snapshot; they never touch TopicProgress or difficulty control.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MockAttempt {
    pub id: Uuid,
    pub user_id: Uuid,
    pub score: i32,
    pub total: i32,
    pub accuracy: Decimal,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Per-question record within a mock attempt. Topic and category are copied
/// onto the row so analytics aggregation never joins back to questions.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MockResponse {
    pub id: Uuid,
    pub mock_attempt_id: Uuid,
    pub user_id: Uuid,
    pub question_id: Uuid,
    pub chosen_index: Option<i32>,
    pub is_correct: bool,
    pub elapsed_seconds: i32,
    pub difficulty: Difficulty,
    pub topic: String,
    pub category: String,
    pub answered_at: DateTime<Utc>,
}
