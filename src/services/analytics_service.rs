use crate::config::get_config;
use crate::dto::analytics_dto::{
    AptitudeActivity, DashboardResponse, DayActivity, MockSummary, PracticeTopicSummary,
    RankedTopic, RecentActivity, SkillStat, TopicBreakdown, TopicStat,
};
use crate::error::Result;
use crate::models::mock::MockAttempt;
use crate::utils::time;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use sqlx::{FromRow, PgPool};
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

pub const STRENGTH_ACCURACY: f64 = 80.0;
pub const WEAKNESS_ACCURACY: f64 = 60.0;

pub fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[derive(Debug, FromRow)]
struct TopicTally {
    topic: String,
    total: i64,
    correct: i64,
}

#[derive(Debug, FromRow)]
struct ActivityRow {
    occurred_at: DateTime<Utc>,
    is_correct: bool,
    category: String,
}

#[derive(Debug, FromRow)]
struct RecentPracticeRow {
    topic: String,
    is_correct: bool,
    attempted_at: DateTime<Utc>,
}

/// Read-only dashboard aggregation over the attempt log, the mock-test log,
/// and the progress ledger. Topic and category live denormalized on every
/// attempt-like row, so no query here joins back to questions.
#[derive(Clone)]
pub struct AnalyticsService {
    pool: PgPool,
}

impl AnalyticsService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn overview(&self, user_id: Uuid) -> Result<DashboardResponse> {
        let offset_minutes = get_config().streak_utc_offset_minutes;
        let today = time::today_local(offset_minutes);

        let progress = sqlx::query_as::<_, crate::models::topic_progress::TopicProgress>(
            r#"SELECT * FROM topic_progress WHERE user_id = $1 ORDER BY topic"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mocks = sqlx::query_as::<_, MockAttempt>(
            r#"
            SELECT * FROM mock_attempts
            WHERE user_id = $1 AND status = 'completed'
            ORDER BY completed_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let practice_tally = sqlx::query_as::<_, TopicTally>(
            r#"
            SELECT COALESCE(NULLIF(topic, ''), 'Unknown') AS topic,
                   COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE is_correct) AS correct
            FROM attempts
            WHERE user_id = $1 AND context = 'practice'
            GROUP BY 1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mock_tally = sqlx::query_as::<_, TopicTally>(
            r#"
            SELECT COALESCE(NULLIF(topic, ''), 'Unknown') AS topic,
                   COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE is_correct) AS correct
            FROM mock_responses
            WHERE user_id = $1
            GROUP BY 1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut activity = sqlx::query_as::<_, ActivityRow>(
            r#"
            SELECT attempted_at AS occurred_at, is_correct,
                   COALESCE(NULLIF(category, ''), 'Unknown') AS category
            FROM attempts
            WHERE user_id = $1 AND context = 'practice'
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        let mock_activity = sqlx::query_as::<_, ActivityRow>(
            r#"
            SELECT answered_at AS occurred_at, is_correct,
                   COALESCE(NULLIF(category, ''), 'Unknown') AS category
            FROM mock_responses
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        activity.extend(mock_activity);

        let recent_practice = sqlx::query_as::<_, RecentPracticeRow>(
            r#"
            SELECT COALESCE(NULLIF(topic, ''), 'Unknown') AS topic,
                   is_correct, attempted_at
            FROM attempts
            WHERE user_id = $1 AND context = 'practice'
            ORDER BY attempted_at DESC
            LIMIT 10
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        // Overall totals come from the ledger, not the attempt log, so they
        // reflect practice only (mocks never touch TopicProgress).
        let total_attempts: i64 = progress.iter().map(|p| i64::from(p.attempts)).sum();
        let total_correct: i64 = progress.iter().map(|p| i64::from(p.corrects)).sum();
        let total_time: i64 = progress.iter().map(|p| p.total_time_seconds).sum();
        let overall_accuracy = if total_attempts > 0 {
            round1(total_correct as f64 / total_attempts as f64 * 100.0)
        } else {
            0.0
        };
        let avg_time_per_question = if total_attempts > 0 {
            round1(total_time as f64 / total_attempts as f64)
        } else {
            0.0
        };

        let mock_scores: Vec<f64> = mocks
            .iter()
            .map(|m| m.accuracy.to_f64().unwrap_or(0.0))
            .collect();
        let tests_completed = mocks.len() as i64;
        let mock_average_score = if mock_scores.is_empty() {
            0.0
        } else {
            round1(mock_scores.iter().sum::<f64>() / mock_scores.len() as f64)
        };
        let mock_best_score = mock_scores.iter().cloned().fold(0.0, f64::max);

        let mut skill_distribution: BTreeMap<String, SkillStat> = BTreeMap::new();
        for p in &progress {
            let category = if p.category.is_empty() {
                "Unknown".to_string()
            } else {
                p.category.clone()
            };
            let entry = skill_distribution.entry(category).or_insert(SkillStat {
                attempts: 0,
                corrects: 0,
                accuracy: 0.0,
            });
            entry.attempts += i64::from(p.attempts);
            entry.corrects += i64::from(p.corrects);
        }
        for stat in skill_distribution.values_mut() {
            stat.accuracy = if stat.attempts > 0 {
                round1(stat.corrects as f64 / stat.attempts as f64 * 100.0)
            } else {
                0.0
            };
        }

        let topic_breakdown = Self::build_topic_breakdown(&practice_tally, &mock_tally);
        let (strengths, areas_for_improvement) = Self::rank_topics(&topic_breakdown.combined);
        let weekly_activity = Self::weekly_activity(&activity, today, offset_minutes);

        let dates: HashSet<NaiveDate> = activity
            .iter()
            .map(|row| time::local_date(row.occurred_at, offset_minutes))
            .collect();
        let streak_days = Self::daily_streak(&dates, today);

        let recent_mocks: Vec<MockSummary> = mocks
            .iter()
            .take(5)
            .map(|m| MockSummary {
                id: m.id,
                score: m.score,
                total: m.total,
                accuracy: round1(m.accuracy.to_f64().unwrap_or(0.0)),
                completed_at: m.completed_at,
            })
            .collect();
        let practice_topics = Self::group_recent_practice(&recent_practice);

        let mut modules: BTreeMap<String, serde_json::Value> = BTreeMap::new();
        for module in ["coding", "group_discussion", "interview", "resume"] {
            modules.insert(module.to_string(), serde_json::json!({ "available": false }));
        }

        Ok(DashboardResponse {
            total_attempts,
            total_correct,
            overall_accuracy,
            avg_time_per_question,
            streak_days,
            tests_completed,
            mock_average_score,
            mock_best_score,
            skill_distribution,
            topic_breakdown,
            strengths,
            areas_for_improvement,
            weekly_activity,
            recent_activity: RecentActivity {
                aptitude: AptitudeActivity {
                    recent_mocks,
                    practice_topics,
                },
                modules,
            },
        })
    }

    fn build_topic_breakdown(practice: &[TopicTally], mock: &[TopicTally]) -> TopicBreakdown {
        let mut breakdown = TopicBreakdown::default();
        for tally in practice {
            breakdown
                .practice
                .insert(tally.topic.clone(), Self::stat(tally.correct, tally.total));
        }
        for tally in mock {
            breakdown
                .mock
                .insert(tally.topic.clone(), Self::stat(tally.correct, tally.total));
        }
        for (topic, stat) in breakdown.practice.iter().chain(breakdown.mock.iter()) {
            let entry = breakdown.combined.entry(topic.clone()).or_default();
            entry.correct += stat.correct;
            entry.total += stat.total;
        }
        for stat in breakdown.combined.values_mut() {
            *stat = Self::stat(stat.correct, stat.total);
        }
        breakdown
    }

    fn stat(correct: i64, total: i64) -> TopicStat {
        let accuracy = if total > 0 {
            round1(correct as f64 / total as f64 * 100.0)
        } else {
            0.0
        };
        TopicStat {
            correct,
            total,
            accuracy,
        }
    }

    /// Strengths: combined accuracy >= 80 with at least one attempt, best
    /// first. Areas for improvement: accuracy < 60, worst first.
    fn rank_topics(combined: &BTreeMap<String, TopicStat>) -> (Vec<RankedTopic>, Vec<RankedTopic>) {
        let mut strengths: Vec<RankedTopic> = combined
            .iter()
            .filter(|(_, s)| s.total >= 1 && s.accuracy >= STRENGTH_ACCURACY)
            .map(|(topic, s)| RankedTopic {
                topic: topic.clone(),
                correct: s.correct,
                total: s.total,
                accuracy: s.accuracy,
            })
            .collect();
        strengths.sort_by(|a, b| {
            b.accuracy
                .partial_cmp(&a.accuracy)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut areas: Vec<RankedTopic> = combined
            .iter()
            .filter(|(_, s)| s.total >= 1 && s.accuracy < WEAKNESS_ACCURACY)
            .map(|(topic, s)| RankedTopic {
                topic: topic.clone(),
                correct: s.correct,
                total: s.total,
                accuracy: s.accuracy,
            })
            .collect();
        areas.sort_by(|a, b| {
            a.accuracy
                .partial_cmp(&b.accuracy)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        (strengths, areas)
    }

    /// Last seven local dates ending today, oldest first, merging practice
    /// attempts and mock responses.
    fn weekly_activity(
        activity: &[ActivityRow],
        today: NaiveDate,
        offset_minutes: i32,
    ) -> Vec<DayActivity> {
        let mut days: Vec<DayActivity> = (0..7)
            .rev()
            .filter_map(|back| today.checked_sub_signed(Duration::days(back)))
            .map(|date| DayActivity {
                date: date.format("%Y-%m-%d").to_string(),
                attempted: 0,
                correct: 0,
                accuracy: 0.0,
                categories: BTreeMap::new(),
            })
            .collect();

        for row in activity {
            let date = time::local_date(row.occurred_at, offset_minutes)
                .format("%Y-%m-%d")
                .to_string();
            if let Some(day) = days.iter_mut().find(|d| d.date == date) {
                day.attempted += 1;
                if row.is_correct {
                    day.correct += 1;
                }
                *day.categories.entry(row.category.clone()).or_insert(0) += 1;
            }
        }

        for day in &mut days {
            day.accuracy = if day.attempted > 0 {
                round2(day.correct as f64 / day.attempted as f64 * 100.0)
            } else {
                0.0
            };
        }
        days
    }

    /// Consecutive active local dates ending at today, or at yesterday when
    /// today has no activity yet.
    pub fn daily_streak(dates: &HashSet<NaiveDate>, today: NaiveDate) -> i64 {
        let start = if dates.contains(&today) {
            today
        } else {
            match today.pred_opt() {
                Some(yesterday) => yesterday,
                None => return 0,
            }
        };

        let mut streak = 0;
        let mut day = start;
        while dates.contains(&day) {
            streak += 1;
            match day.pred_opt() {
                Some(prev) => day = prev,
                None => break,
            }
        }
        streak
    }

    /// Topic-grouped view of the ten most recent practice attempts, most
    /// recent topic first.
    fn group_recent_practice(rows: &[RecentPracticeRow]) -> Vec<PracticeTopicSummary> {
        let mut grouped: Vec<PracticeTopicSummary> = Vec::new();
        for row in rows {
            match grouped.iter_mut().find(|g| g.topic == row.topic) {
                Some(entry) => {
                    entry.attempted += 1;
                    if row.is_correct {
                        entry.correct += 1;
                    }
                    if row.attempted_at > entry.last_attempted_at {
                        entry.last_attempted_at = row.attempted_at;
                    }
                }
                None => grouped.push(PracticeTopicSummary {
                    topic: row.topic.clone(),
                    attempted: 1,
                    correct: i64::from(row.is_correct),
                    accuracy: 0.0,
                    last_attempted_at: row.attempted_at,
                }),
            }
        }
        for entry in &mut grouped {
            entry.accuracy = if entry.attempted > 0 {
                round1(entry.correct as f64 / entry.attempted as f64 * 100.0)
            } else {
                0.0
            };
        }
        grouped
    }
}
