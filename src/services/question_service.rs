use crate::error::{Error, Result};
use crate::models::difficulty::Difficulty;
use crate::models::question::PracticeQuestion;
use sqlx::PgPool;
use uuid::Uuid;

/// Read-only access to the question store. Authoring and seeding live
/// outside this service.
#[derive(Clone)]
pub struct QuestionService {
    pool: PgPool,
}

impl QuestionService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_question(&self, question_id: Uuid) -> Result<PracticeQuestion> {
        let question = sqlx::query_as::<_, PracticeQuestion>(
            r#"SELECT * FROM questions WHERE id = $1"#,
        )
        .bind(question_id)
        .fetch_optional(&self.pool)
        .await?;

        question.ok_or_else(|| Error::NotFound(format!("Question {} not found", question_id)))
    }

    /// Unseen candidates for (category, topic, difficulty): everything the
    /// user has not answered in practice, randomized, capped.
    pub async fn unseen_candidates(
        &self,
        user_id: Uuid,
        category: &str,
        topic: &str,
        difficulty: Difficulty,
        cap: i64,
    ) -> Result<Vec<PracticeQuestion>> {
        let candidates = sqlx::query_as::<_, PracticeQuestion>(
            r#"
            SELECT q.* FROM questions q
            WHERE q.category = $1 AND q.topic = $2 AND q.difficulty = $3
              AND NOT EXISTS (
                  SELECT 1 FROM attempts a
                  WHERE a.user_id = $4
                    AND a.question_id = q.id
                    AND a.context = 'practice'
              )
            ORDER BY random()
            LIMIT $5
            "#,
        )
        .bind(category)
        .bind(topic)
        .bind(difficulty)
        .bind(user_id)
        .bind(cap)
        .fetch_all(&self.pool)
        .await?;

        Ok(candidates)
    }

    /// Concept lists of the user's most recent practice questions in
    /// (category, topic), newest first.
    pub async fn recent_practice_concepts(
        &self,
        user_id: Uuid,
        category: &str,
        topic: &str,
        limit: i64,
    ) -> Result<Vec<Vec<String>>> {
        let rows = sqlx::query_as::<_, (serde_json::Value,)>(
            r#"
            SELECT q.concepts
            FROM attempts a
            JOIN questions q ON q.id = a.question_id
            WHERE a.user_id = $1 AND a.category = $2 AND a.topic = $3
              AND a.context = 'practice'
            ORDER BY a.attempted_at DESC
            LIMIT $4
            "#,
        )
        .bind(user_id)
        .bind(category)
        .bind(topic)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(concepts,)| serde_json::from_value(concepts).unwrap_or_default())
            .collect())
    }

    /// Topics of a category that still hold at least one question the user
    /// has not seen in practice, at any difficulty.
    pub async fn topics_with_unseen(&self, user_id: Uuid, category: &str) -> Result<Vec<String>> {
        let rows = sqlx::query_as::<_, (String,)>(
            r#"
            SELECT DISTINCT q.topic FROM questions q
            WHERE q.category = $1
              AND NOT EXISTS (
                  SELECT 1 FROM attempts a
                  WHERE a.user_id = $2
                    AND a.question_id = q.id
                    AND a.context = 'practice'
              )
            ORDER BY q.topic
            "#,
        )
        .bind(category)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(topic,)| topic).collect())
    }

    pub async fn topics_in_category(&self, category: &str) -> Result<Vec<String>> {
        let rows = sqlx::query_as::<_, (String,)>(
            r#"SELECT DISTINCT topic FROM questions WHERE category = $1 ORDER BY topic"#,
        )
        .bind(category)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(topic,)| topic).collect())
    }
}
