pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::services::{
    analytics_service::AnalyticsService, insight_service::InsightService,
    mock_service::MockService, practice_service::PracticeService,
    progress_service::ProgressService, question_service::QuestionService,
};
use reqwest::Client;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub practice_service: PracticeService,
    pub progress_service: ProgressService,
    pub question_service: QuestionService,
    pub analytics_service: AnalyticsService,
    pub insight_service: InsightService,
    pub mock_service: MockService,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let config = crate::config::get_config();
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.insight_timeout_secs))
            .build()
            .unwrap();

        let practice_service = PracticeService::new(pool.clone());
        let progress_service = ProgressService::new(pool.clone());
        let question_service = QuestionService::new(pool.clone());
        let analytics_service = AnalyticsService::new(pool.clone());
        let insight_service =
            InsightService::new(pool.clone(), config.openai_api_key.clone(), http_client);
        let mock_service = MockService::new(pool.clone());

        Self {
            pool,
            practice_service,
            progress_service,
            question_service,
            analytics_service,
            insight_service,
            mock_service,
        }
    }
}
