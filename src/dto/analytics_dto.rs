use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct UserQuery {
    pub user_id: Uuid,
}

/// The full dashboard. Every numeric field is always present and
/// zero-filled when the user has no history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardResponse {
    pub total_attempts: i64,
    pub total_correct: i64,
    pub overall_accuracy: f64,
    pub avg_time_per_question: f64,
    pub streak_days: i64,
    pub tests_completed: i64,
    pub mock_average_score: f64,
    pub mock_best_score: f64,
    pub skill_distribution: BTreeMap<String, SkillStat>,
    pub topic_breakdown: TopicBreakdown,
    pub strengths: Vec<RankedTopic>,
    pub areas_for_improvement: Vec<RankedTopic>,
    pub weekly_activity: Vec<DayActivity>,
    pub recent_activity: RecentActivity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillStat {
    pub attempts: i64,
    pub corrects: i64,
    pub accuracy: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopicBreakdown {
    pub practice: BTreeMap<String, TopicStat>,
    pub mock: BTreeMap<String, TopicStat>,
    pub combined: BTreeMap<String, TopicStat>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TopicStat {
    pub correct: i64,
    pub total: i64,
    pub accuracy: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedTopic {
    pub topic: String,
    pub correct: i64,
    pub total: i64,
    pub accuracy: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayActivity {
    pub date: String,
    pub attempted: i64,
    pub correct: i64,
    pub accuracy: f64,
    pub categories: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentActivity {
    pub aptitude: AptitudeActivity,
    /// Modules outside the aptitude core surface as placeholders here.
    pub modules: BTreeMap<String, JsonValue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AptitudeActivity {
    pub recent_mocks: Vec<MockSummary>,
    pub practice_topics: Vec<PracticeTopicSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockSummary {
    pub id: Uuid,
    pub score: i32,
    pub total: i32,
    pub accuracy: f64,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PracticeTopicSummary {
    pub topic: String,
    pub attempted: i64,
    pub correct: i64,
    pub accuracy: f64,
    pub last_attempted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightResponse {
    pub headline: String,
    pub analysis: String,
    pub action_plan: Vec<String>,
    pub generated_at: DateTime<Utc>,
    /// "cached" | "fresh" | "fallback" | "onboarding"
    pub source: String,
}
