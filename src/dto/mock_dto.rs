use crate::models::difficulty::Difficulty;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// One completed mock test as reported by the mock module. Scoring already
/// happened there; this service only records it for analytics and insight.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitMockRequest {
    pub user_id: Uuid,
    #[validate(range(min = 0))]
    pub score: i32,
    #[validate(range(min = 1))]
    pub total: i32,
    /// Accuracy percentage; derived from score/total when absent.
    pub accuracy: Option<f64>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub responses: Vec<MockResponseItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MockResponseItem {
    pub question_id: Uuid,
    pub chosen_index: Option<i32>,
    pub is_correct: bool,
    pub elapsed_seconds: Option<i32>,
    pub difficulty: Difficulty,
    pub topic: String,
    pub category: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitMockResponse {
    pub mock_attempt_id: Uuid,
    pub score: i32,
    pub total: i32,
    pub accuracy: f64,
    pub completed_at: DateTime<Utc>,
}
