use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use validator::Validate;

use crate::dto::practice_dto::{
    AdaptiveSummary, HistoryQuery, NextQuestionRequest, NextQuestionResponse, SubmitAnswerRequest,
    SubmitAnswerResponse, TopicSummary, TopicsQuery, TopicsResponse,
};
use crate::models::difficulty::Difficulty;
use crate::services::analytics_service::round1;
use crate::AppState;

#[axum::debug_handler]
pub async fn next_question(
    State(state): State<AppState>,
    Json(req): Json<NextQuestionRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;

    let next = state
        .practice_service
        .next_question(req.user_id, &req.category, req.topic.as_deref())
        .await?;

    // Exhausted topics are not an error; the caller decides the UX.
    match next {
        Some(q) => Ok(Json(NextQuestionResponse {
            question_id: q.question_id,
            question: q.question,
            options: q.options,
            category: q.category,
            topic: q.topic,
            difficulty: q.difficulty,
            image_ref: q.image_ref,
        })
        .into_response()),
        None => Ok(Json(json!({})).into_response()),
    }
}

#[axum::debug_handler]
pub async fn submit_answer(
    State(state): State<AppState>,
    Json(req): Json<SubmitAnswerRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;

    let feedback = state
        .practice_service
        .submit_answer(
            req.user_id,
            req.question_id,
            req.chosen_index,
            req.elapsed_seconds,
            req.shuffled_options,
        )
        .await?;

    Ok(Json(SubmitAnswerResponse {
        is_correct: feedback.is_correct,
        chosen_display_index: feedback.chosen_display_index,
        correct_display_index: feedback.correct_display_index,
        explanation: feedback.explanation,
        options_displayed: feedback.options_displayed,
        adaptive: AdaptiveSummary {
            old_difficulty: feedback.old_difficulty,
            new_difficulty: feedback.new_difficulty,
            consecutive_correct: feedback.consecutive_correct,
            consecutive_incorrect: feedback.consecutive_incorrect,
            overall_accuracy: feedback.overall_accuracy,
            attempts: feedback.attempts,
            message: feedback.message,
        },
    })
    .into_response())
}

#[axum::debug_handler]
pub async fn list_topics(
    State(state): State<AppState>,
    Query(query): Query<TopicsQuery>,
) -> crate::error::Result<Response> {
    let topics = state
        .question_service
        .topics_in_category(&query.category)
        .await?;
    let progress = state
        .progress_service
        .list_for_user_category(query.user_id, &query.category)
        .await?;

    let summaries = topics
        .into_iter()
        .map(|topic| match progress.iter().find(|p| p.topic == topic) {
            Some(p) => TopicSummary {
                topic,
                current_difficulty: p.current_difficulty,
                attempts: p.attempts,
                corrects: p.corrects,
                accuracy: round1(p.accuracy()),
                last_practiced: p.last_practiced,
            },
            None => TopicSummary {
                topic,
                current_difficulty: Difficulty::Easy,
                attempts: 0,
                corrects: 0,
                accuracy: 0.0,
                last_practiced: None,
            },
        })
        .collect();

    Ok(Json(TopicsResponse {
        category: query.category,
        topics: summaries,
    })
    .into_response())
}

#[axum::debug_handler]
pub async fn history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> crate::error::Result<Response> {
    let attempts = state
        .progress_service
        .recent_attempts(
            query.user_id,
            query.topic.as_deref(),
            query.limit.unwrap_or(20).clamp(1, 100),
        )
        .await?;
    Ok(Json(json!({ "attempts": attempts })).into_response())
}
