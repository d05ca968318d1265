use crate::dto::mock_dto::{SubmitMockRequest, SubmitMockResponse};
use crate::error::{Error, Result};
use crate::models::mock::{MockAttempt, MockResponse};
use crate::services::analytics_service::round1;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

/// Writes completed mock tests into the mock-test log. Mocks feed analytics
/// and the insight freshness rule; they never update TopicProgress.
#[derive(Clone)]
pub struct MockService {
    pool: PgPool,
}

impl MockService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn record_completed(&self, req: SubmitMockRequest) -> Result<SubmitMockResponse> {
        if req.score > req.total {
            return Err(Error::BadRequest(format!(
                "score {} exceeds total {}",
                req.score, req.total
            )));
        }
        if req.completed_at < req.started_at {
            return Err(Error::BadRequest(
                "completed_at precedes started_at".to_string(),
            ));
        }

        let accuracy = round1(
            req.accuracy
                .unwrap_or_else(|| f64::from(req.score) / f64::from(req.total) * 100.0),
        );
        let accuracy_dec = Decimal::from_f64(accuracy)
            .ok_or_else(|| Error::BadRequest(format!("invalid accuracy {}", accuracy)))?;

        let mut tx = self.pool.begin().await?;

        let mock_attempt_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO mock_attempts (user_id, score, total, accuracy, status, started_at, completed_at)
            VALUES ($1, $2, $3, $4, 'completed', $5, $6)
            RETURNING id
            "#,
        )
        .bind(req.user_id)
        .bind(req.score)
        .bind(req.total)
        .bind(accuracy_dec)
        .bind(req.started_at)
        .bind(req.completed_at)
        .fetch_one(&mut *tx)
        .await?;

        for response in &req.responses {
            sqlx::query(
                r#"
                INSERT INTO mock_responses (
                    mock_attempt_id, user_id, question_id, chosen_index, is_correct,
                    elapsed_seconds, difficulty, topic, category, answered_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(mock_attempt_id)
            .bind(req.user_id)
            .bind(response.question_id)
            .bind(response.chosen_index)
            .bind(response.is_correct)
            .bind(response.elapsed_seconds.unwrap_or(0).max(0))
            .bind(response.difficulty)
            .bind(&response.topic)
            .bind(&response.category)
            .bind(req.completed_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            user_id = %req.user_id,
            mock_attempt_id = %mock_attempt_id,
            accuracy = accuracy,
            "mock test recorded"
        );

        Ok(SubmitMockResponse {
            mock_attempt_id,
            score: req.score,
            total: req.total,
            accuracy,
            completed_at: req.completed_at,
        })
    }

    /// One recorded mock with its per-question records, for the review
    /// screen. Scoped to the owning user.
    pub async fn get_mock(
        &self,
        user_id: Uuid,
        mock_attempt_id: Uuid,
    ) -> Result<(MockAttempt, Vec<MockResponse>)> {
        let attempt = sqlx::query_as::<_, MockAttempt>(
            r#"SELECT * FROM mock_attempts WHERE id = $1 AND user_id = $2"#,
        )
        .bind(mock_attempt_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Mock attempt {} not found", mock_attempt_id)))?;

        let responses = sqlx::query_as::<_, MockResponse>(
            r#"SELECT * FROM mock_responses WHERE mock_attempt_id = $1 ORDER BY answered_at, id"#,
        )
        .bind(mock_attempt_id)
        .fetch_all(&self.pool)
        .await?;

        Ok((attempt, responses))
    }
}
