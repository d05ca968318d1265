use crate::config::get_config;
use crate::dto::analytics_dto::{DashboardResponse, InsightResponse};
use crate::error::Result;
use crate::models::insight::{InsightPayload, InsightRecord};
use crate::services::analytics_service::{round2, AnalyticsService};
use crate::utils::time;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use std::time::Duration;
use uuid::Uuid;

pub const MAX_ACTION_ITEMS: usize = 3;

/// Compact feature snapshot sent to the oracle. Everything here is derived
/// from the dashboard; the oracle only rephrases it.
#[derive(Debug, Clone, Serialize)]
pub struct InsightSnapshot {
    pub overall_accuracy: f64,
    pub avg_time_per_question: f64,
    /// Average answer time over the medium-level 45s budget.
    pub pace_ratio: f64,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub best_topic: Option<String>,
    pub last_test: Option<LastTestSummary>,
    pub daily_trend: Vec<DailyTrendPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LastTestSummary {
    pub score: i32,
    pub total: i32,
    pub accuracy: f64,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyTrendPoint {
    pub date: String,
    pub attempted: i64,
    pub accuracy: f64,
}

/// Cached coaching insight over the analytics output. The oracle sits
/// strictly behind this boundary: a practice turn never waits on it, and a
/// dead oracle degrades to a deterministic fallback.
#[derive(Clone)]
pub struct InsightService {
    pool: PgPool,
    analytics: AnalyticsService,
    client: Client,
    api_key: String,
}

impl InsightService {
    pub fn new(pool: PgPool, api_key: String, client: Client) -> Self {
        Self {
            analytics: AnalyticsService::new(pool.clone()),
            pool,
            client,
            api_key,
        }
    }

    pub async fn get_insight(&self, user_id: Uuid) -> Result<InsightResponse> {
        let latest_mock: Option<DateTime<Utc>> = sqlx::query_scalar(
            r#"SELECT MAX(completed_at) FROM mock_attempts WHERE user_id = $1 AND status = 'completed'"#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let Some(latest_mock) = latest_mock else {
            return Ok(Self::to_response(
                Self::onboarding_payload(),
                time::now(),
                "onboarding",
            ));
        };

        let cached = sqlx::query_as::<_, InsightRecord>(
            r#"SELECT * FROM insights WHERE user_id = $1"#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(record) = &cached {
            if Self::is_fresh(record.generated_at, latest_mock) {
                let payload = Self::payload_from_value(&record.payload)
                    .unwrap_or_else(Self::onboarding_payload);
                return Ok(Self::to_response(payload, record.generated_at, "cached"));
            }
        }

        let dashboard = self.analytics.overview(user_id).await?;
        let snapshot = Self::build_snapshot(&dashboard);

        match self.consult_oracle(&snapshot).await {
            Ok(payload) => {
                let now = time::now();
                sqlx::query(
                    r#"
                    INSERT INTO insights (user_id, payload, generated_at)
                    VALUES ($1, $2, $3)
                    ON CONFLICT (user_id) DO UPDATE
                    SET payload = EXCLUDED.payload, generated_at = EXCLUDED.generated_at
                    "#,
                )
                .bind(user_id)
                .bind(serde_json::to_value(&payload)?)
                .bind(now)
                .execute(&self.pool)
                .await?;
                Ok(Self::to_response(payload, now, "fresh"))
            }
            Err(e) => {
                // The stale cache (if any) stays untouched so a later call
                // can still retry the oracle.
                tracing::warn!(user_id = %user_id, error = ?e, "insight oracle failed, serving fallback");
                Ok(Self::to_response(
                    Self::fallback_payload(&snapshot),
                    time::now(),
                    "fallback",
                ))
            }
        }
    }

    /// A cached record is fresh while no mock has completed after it.
    pub fn is_fresh(generated_at: DateTime<Utc>, latest_mock_completed_at: DateTime<Utc>) -> bool {
        generated_at >= latest_mock_completed_at
    }

    pub fn build_snapshot(dashboard: &DashboardResponse) -> InsightSnapshot {
        let best_topic = dashboard
            .strengths
            .first()
            .map(|s| s.topic.clone())
            .or_else(|| {
                dashboard
                    .topic_breakdown
                    .combined
                    .iter()
                    .filter(|(_, s)| s.total > 0)
                    .max_by(|a, b| {
                        a.1.accuracy
                            .partial_cmp(&b.1.accuracy)
                            .unwrap_or(std::cmp::Ordering::Equal)
                    })
                    .map(|(topic, _)| topic.clone())
            });

        let last_test = dashboard
            .recent_activity
            .aptitude
            .recent_mocks
            .first()
            .map(|m| LastTestSummary {
                score: m.score,
                total: m.total,
                accuracy: m.accuracy,
                completed_at: m.completed_at,
            });

        InsightSnapshot {
            overall_accuracy: dashboard.overall_accuracy,
            avg_time_per_question: dashboard.avg_time_per_question,
            pace_ratio: round2(dashboard.avg_time_per_question / 45.0),
            strengths: dashboard.strengths.iter().map(|s| s.topic.clone()).collect(),
            weaknesses: dashboard
                .areas_for_improvement
                .iter()
                .map(|s| s.topic.clone())
                .collect(),
            best_topic,
            last_test,
            daily_trend: dashboard
                .weekly_activity
                .iter()
                .map(|d| DailyTrendPoint {
                    date: d.date.clone(),
                    attempted: d.attempted,
                    accuracy: d.accuracy,
                })
                .collect(),
        }
    }

    async fn consult_oracle(&self, snapshot: &InsightSnapshot) -> anyhow::Result<InsightPayload> {
        let system_prompt = "You are a pragmatic aptitude-test coach. \
            Given a learner's aggregate practice metrics, reply with a JSON object containing \
            'headline' (one short encouraging sentence), 'analysis' (2-3 sentences grounded in \
            the numbers) and 'action_plan' (up to 3 concrete next steps as strings). \
            Do not invent metrics that are not in the input.";

        let payload = serde_json::json!({
            "model": "gpt-4o-mini",
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": serde_json::to_string(snapshot)?}
            ],
            "response_format": { "type": "json_object" },
            "temperature": 0.6
        });

        let timeout = Duration::from_secs(get_config().insight_timeout_secs);
        let res = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&payload)
            .timeout(timeout)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("oracle error {}: {}", status, text));
        }

        let body: JsonValue = res.json().await?;
        let content = body
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| anyhow::anyhow!("malformed oracle response"))?;

        Self::parse_payload(content)
    }

    /// Parse the oracle reply: tolerate code-fence wrapping, require
    /// headline and analysis, cap the action plan at three items.
    pub fn parse_payload(raw: &str) -> anyhow::Result<InsightPayload> {
        let body = strip_code_fences(raw);
        let value: JsonValue = serde_json::from_str(body)?;
        Self::payload_from_value(&value)
            .ok_or_else(|| anyhow::anyhow!("oracle reply missing headline or analysis"))
    }

    fn payload_from_value(value: &JsonValue) -> Option<InsightPayload> {
        let headline = value.get("headline")?.as_str()?.trim().to_string();
        let analysis = value.get("analysis")?.as_str()?.trim().to_string();
        if headline.is_empty() || analysis.is_empty() {
            return None;
        }
        let mut action_plan: Vec<String> = value
            .get("action_plan")
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(|s| s.trim().to_string()))
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        action_plan.truncate(MAX_ACTION_ITEMS);
        Some(InsightPayload {
            headline,
            analysis,
            action_plan,
        })
    }

    /// Deterministic stand-in derived from the same snapshot the oracle
    /// would have seen.
    pub fn fallback_payload(snapshot: &InsightSnapshot) -> InsightPayload {
        let headline = match &snapshot.best_topic {
            Some(topic) => format!("Keep pushing in {}", topic),
            None => "Keep up the daily practice".to_string(),
        };
        InsightPayload {
            headline,
            analysis: format!(
                "You are answering {:.1}% of questions correctly at about {:.0}s per question.",
                snapshot.overall_accuracy, snapshot.avg_time_per_question
            ),
            action_plan: vec![
                "Practice at least 10 questions today".to_string(),
                "Revisit your weakest topic before the next mock".to_string(),
                "Take a full mock test this week".to_string(),
            ],
        }
    }

    /// Served while the user has no completed mock yet.
    pub fn onboarding_payload() -> InsightPayload {
        InsightPayload {
            headline: "Take your first mock test".to_string(),
            analysis: "Insights unlock once you complete a mock test. Until then, build a \
                       baseline with daily topic practice."
                .to_string(),
            action_plan: vec![
                "Pick one category and practice 10 questions".to_string(),
                "Complete your first mock test".to_string(),
                "Come back here for a personalised plan".to_string(),
            ],
        }
    }

    fn to_response(
        payload: InsightPayload,
        generated_at: DateTime<Utc>,
        source: &str,
    ) -> InsightResponse {
        InsightResponse {
            headline: payload.headline,
            analysis: payload.analysis,
            action_plan: payload.action_plan,
            generated_at,
            source: source.to_string(),
        }
    }
}

fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.trim_start_matches(['\r', '\n']);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn freshness_compares_against_latest_mock() {
        let generated = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap();
        let earlier_mock = Utc.with_ymd_and_hms(2026, 8, 1, 11, 0, 0).unwrap();
        let later_mock = Utc.with_ymd_and_hms(2026, 8, 1, 13, 0, 0).unwrap();
        assert!(InsightService::is_fresh(generated, earlier_mock));
        assert!(InsightService::is_fresh(generated, generated));
        assert!(!InsightService::is_fresh(generated, later_mock));
    }

    #[test]
    fn parses_plain_and_fenced_payloads() {
        let plain = r#"{"headline":"h","analysis":"a","action_plan":["one","two"]}"#;
        let parsed = InsightService::parse_payload(plain).unwrap();
        assert_eq!(parsed.headline, "h");
        assert_eq!(parsed.action_plan.len(), 2);

        let fenced = "```json\n{\"headline\":\"h\",\"analysis\":\"a\",\"action_plan\":[]}\n```";
        let parsed = InsightService::parse_payload(fenced).unwrap();
        assert_eq!(parsed.analysis, "a");
    }

    #[test]
    fn truncates_action_plan_to_three() {
        let raw = r#"{"headline":"h","analysis":"a","action_plan":["1","2","3","4","5"]}"#;
        let parsed = InsightService::parse_payload(raw).unwrap();
        assert_eq!(parsed.action_plan, vec!["1", "2", "3"]);
    }

    #[test]
    fn rejects_payload_without_headline() {
        assert!(InsightService::parse_payload(r#"{"analysis":"a"}"#).is_err());
        assert!(InsightService::parse_payload("not json").is_err());
    }

    #[test]
    fn fallback_names_best_topic() {
        let snapshot = InsightSnapshot {
            overall_accuracy: 72.5,
            avg_time_per_question: 31.0,
            pace_ratio: 0.69,
            strengths: vec!["Ratios".into()],
            weaknesses: vec![],
            best_topic: Some("Ratios".into()),
            last_test: None,
            daily_trend: vec![],
        };
        let payload = InsightService::fallback_payload(&snapshot);
        assert_eq!(payload.headline, "Keep pushing in Ratios");
        assert_eq!(payload.action_plan.len(), 3);
    }
}
