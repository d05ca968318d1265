use crate::models::difficulty::Difficulty;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NextQuestionRequest {
    pub user_id: Uuid,
    #[validate(length(min = 1))]
    pub category: String,
    pub topic: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextQuestionResponse {
    pub question_id: Uuid,
    pub question: String,
    /// Shuffled per delivery; the permutation stays server-side.
    pub options: Vec<String>,
    pub category: String,
    pub topic: String,
    pub difficulty: Difficulty,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitAnswerRequest {
    pub user_id: Uuid,
    pub question_id: Uuid,
    pub chosen_index: i32,
    #[validate(range(min = 0))]
    pub elapsed_seconds: i32,
    /// Optional client echo of the displayed option order; used when the
    /// server no longer holds the delivery.
    pub shuffled_options: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptiveSummary {
    pub old_difficulty: Difficulty,
    pub new_difficulty: Difficulty,
    pub consecutive_correct: i32,
    pub consecutive_incorrect: i32,
    pub overall_accuracy: f64,
    pub attempts: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAnswerResponse {
    pub is_correct: bool,
    pub chosen_display_index: usize,
    pub correct_display_index: usize,
    pub explanation: String,
    pub options_displayed: Vec<String>,
    pub adaptive: AdaptiveSummary,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopicsQuery {
    pub user_id: Uuid,
    pub category: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryQuery {
    pub user_id: Uuid,
    pub topic: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicSummary {
    pub topic: String,
    pub current_difficulty: Difficulty,
    pub attempts: i32,
    pub corrects: i32,
    pub accuracy: f64,
    pub last_practiced: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicsResponse {
    pub category: String,
    pub topics: Vec<TopicSummary>,
}
