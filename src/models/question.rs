use crate::models::difficulty::Difficulty;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

/// One aptitude question as stored. `options` and `concepts` are JSONB
/// arrays of strings; `correct_index` points into the canonical option
/// order, never a shuffled one.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PracticeQuestion {
    pub id: Uuid,
    pub category: String,
    pub topic: String,
    pub difficulty: Difficulty,
    pub question: String,
    pub options: JsonValue,
    pub correct_index: i32,
    pub explanation: String,
    pub concepts: JsonValue,
    pub image_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PracticeQuestion {
    pub fn options_vec(&self) -> Vec<String> {
        serde_json::from_value(self.options.clone()).unwrap_or_default()
    }

    pub fn concepts_vec(&self) -> Vec<String> {
        serde_json::from_value(self.concepts.clone()).unwrap_or_default()
    }
}
