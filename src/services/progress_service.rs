use crate::error::{Error, Result};
use crate::models::attempt::{Attempt, AttemptContext};
use crate::models::difficulty::Difficulty;
use crate::models::question::PracticeQuestion;
use crate::models::topic_progress::TopicProgress;
use crate::services::adaptive_service::{AdaptiveService, WindowAttempt, WINDOW_SIZE};
use crate::utils::time;
use sqlx::PgPool;
use uuid::Uuid;

/// Outcome of folding one practice attempt into the ledger.
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub progress: TopicProgress,
    pub old_difficulty: Difficulty,
    pub new_difficulty: Difficulty,
}

impl ProgressUpdate {
    pub fn difficulty_changed(&self) -> bool {
        self.old_difficulty != self.new_difficulty
    }
}

#[derive(Clone)]
pub struct ProgressService {
    pool: PgPool,
}

impl ProgressService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append the attempt, fold it into TopicProgress, and re-run the
    /// adaptive policy, all in one transaction holding a row lock on
    /// (user_id, topic). Concurrent submits for the same topic serialize on
    /// that lock; other topics proceed in parallel.
    pub async fn apply_practice_attempt(
        &self,
        user_id: Uuid,
        question: &PracticeQuestion,
        chosen_index: i32,
        is_correct: bool,
        elapsed_seconds: i32,
    ) -> Result<ProgressUpdate> {
        let now = time::now();
        let mut tx = self.pool.begin().await?;

        // Upsert acquires the row lock whether or not the row existed.
        let mut progress = sqlx::query_as::<_, TopicProgress>(
            r#"
            INSERT INTO topic_progress (user_id, topic, category)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, topic) DO UPDATE SET updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&question.topic)
        .bind(&question.category)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO attempts (
                user_id, question_id, chosen_index, is_correct, elapsed_seconds,
                difficulty, topic, category, context, attempted_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(user_id)
        .bind(question.id)
        .bind(chosen_index)
        .bind(is_correct)
        .bind(elapsed_seconds)
        .bind(question.difficulty)
        .bind(&question.topic)
        .bind(&question.category)
        .bind(AttemptContext::Practice)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let old_difficulty = progress.current_difficulty;
        let window_since = progress.last_difficulty_change;
        progress.record_outcome(question.difficulty, is_correct, elapsed_seconds, now);

        // Window includes the attempt appended above but nothing from
        // before the last difficulty change: a change wipes the evidence.
        let window = sqlx::query_as::<_, WindowAttempt>(
            r#"
            SELECT is_correct, elapsed_seconds FROM attempts
            WHERE user_id = $1 AND topic = $2 AND context = 'practice'
              AND ($3::timestamptz IS NULL OR attempted_at > $3)
            ORDER BY attempted_at DESC
            LIMIT $4
            "#,
        )
        .bind(user_id)
        .bind(&question.topic)
        .bind(window_since)
        .bind(WINDOW_SIZE)
        .fetch_all(&mut *tx)
        .await?;

        if let Some(new_difficulty) = AdaptiveService::decide(&window, old_difficulty) {
            tracing::info!(
                user_id = %user_id,
                topic = %question.topic,
                old = %old_difficulty,
                new = %new_difficulty,
                "difficulty change"
            );
            progress.apply_difficulty_change(new_difficulty, now);
        }

        progress.check_invariants().map_err(Error::Invariant)?;

        sqlx::query(
            r#"
            UPDATE topic_progress SET
                category = $3,
                current_difficulty = $4,
                attempts = $5,
                corrects = $6,
                streak = $7,
                consecutive_correct = $8,
                consecutive_incorrect = $9,
                easy_total = $10,
                easy_correct = $11,
                medium_total = $12,
                medium_correct = $13,
                hard_total = $14,
                hard_correct = $15,
                total_time_seconds = $16,
                average_time_per_question = $17,
                last_practiced = $18,
                last_difficulty_change = $19,
                updated_at = $20
            WHERE user_id = $1 AND topic = $2
            "#,
        )
        .bind(user_id)
        .bind(&question.topic)
        .bind(&progress.category)
        .bind(progress.current_difficulty)
        .bind(progress.attempts)
        .bind(progress.corrects)
        .bind(progress.streak)
        .bind(progress.consecutive_correct)
        .bind(progress.consecutive_incorrect)
        .bind(progress.easy_total)
        .bind(progress.easy_correct)
        .bind(progress.medium_total)
        .bind(progress.medium_correct)
        .bind(progress.hard_total)
        .bind(progress.hard_correct)
        .bind(progress.total_time_seconds)
        .bind(progress.average_time_per_question)
        .bind(progress.last_practiced)
        .bind(progress.last_difficulty_change)
        .bind(progress.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let new_difficulty = progress.current_difficulty;
        Ok(ProgressUpdate {
            progress,
            old_difficulty,
            new_difficulty,
        })
    }

    /// Recent slice of the append-only practice log, newest first,
    /// optionally narrowed to one topic.
    pub async fn recent_attempts(
        &self,
        user_id: Uuid,
        topic: Option<&str>,
        limit: i64,
    ) -> Result<Vec<Attempt>> {
        let rows = sqlx::query_as::<_, Attempt>(
            r#"
            SELECT * FROM attempts
            WHERE user_id = $1
              AND ($2::text IS NULL OR topic = $2)
              AND context = $3
            ORDER BY attempted_at DESC
            LIMIT $4
            "#,
        )
        .bind(user_id)
        .bind(topic)
        .bind(AttemptContext::Practice)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get_progress(&self, user_id: Uuid, topic: &str) -> Result<Option<TopicProgress>> {
        let progress = sqlx::query_as::<_, TopicProgress>(
            r#"SELECT * FROM topic_progress WHERE user_id = $1 AND topic = $2"#,
        )
        .bind(user_id)
        .bind(topic)
        .fetch_optional(&self.pool)
        .await?;
        Ok(progress)
    }

    pub async fn list_for_user_category(
        &self,
        user_id: Uuid,
        category: &str,
    ) -> Result<Vec<TopicProgress>> {
        let rows = sqlx::query_as::<_, TopicProgress>(
            r#"SELECT * FROM topic_progress WHERE user_id = $1 AND category = $2 ORDER BY topic"#,
        )
        .bind(user_id)
        .bind(category)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
