use aceit_backend::dto::mock_dto::{MockResponseItem, SubmitMockRequest};
use aceit_backend::models::difficulty::Difficulty;
use chrono::{Duration, Utc};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

async fn setup() -> PgPool {
    dotenvy::dotenv().ok();
    std::env::set_var("SERVER_ADDRESS", "127.0.0.1:0");
    std::env::set_var("OPENAI_API_KEY", "sk-test");
    std::env::set_var("PUBLIC_RPS", "100");

    let _ = aceit_backend::config::init_config();
    let pool = aceit_backend::database::pool::create_pool()
        .await
        .expect("pool");
    sqlx::migrate!("./migrations").run(&pool).await.expect("migrations");
    pool
}

async fn seed_question(
    pool: &PgPool,
    category: &str,
    topic: &str,
    difficulty: Difficulty,
    text: &str,
    correct_index: i32,
) -> (Uuid, String) {
    let options = ["w", "x", "y", "z"];
    let id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO questions (category, topic, difficulty, question, options, correct_index, explanation, concepts)
        VALUES ($1, $2, $3, $4, $5, $6, '', '[]'::jsonb)
        RETURNING id
        "#,
    )
    .bind(category)
    .bind(topic)
    .bind(difficulty)
    .bind(text)
    .bind(json!(options))
    .bind(correct_index)
    .fetch_one(pool)
    .await
    .expect("seed question");
    (id, options[correct_index as usize].to_string())
}

fn mock_response(topic: &str, category: &str, is_correct: bool) -> MockResponseItem {
    MockResponseItem {
        question_id: Uuid::new_v4(),
        chosen_index: Some(0),
        is_correct,
        elapsed_seconds: Some(25),
        difficulty: Difficulty::Medium,
        topic: topic.to_string(),
        category: category.to_string(),
    }
}

#[tokio::test]
async fn dashboard_reflects_practice_and_mock_history() {
    let pool = setup().await;
    let state = aceit_backend::AppState::new(pool.clone());
    let user = Uuid::new_v4();
    let category = format!("Quantitative Ability {}", Uuid::new_v4());

    // two correct practice attempts in Ratios, one wrong in Algebra
    for i in 0..2 {
        let (id, correct) = seed_question(
            &pool,
            &category,
            "Ratios",
            Difficulty::Easy,
            &format!("ratios q{}", i),
            i,
        )
        .await;
        let next = state
            .practice_service
            .next_question(user, &category, Some("Ratios"))
            .await
            .expect("select")
            .expect("question");
        assert_eq!(next.question_id, id);
        let chosen = next.options.iter().position(|o| o == &correct).unwrap() as i32;
        let feedback = state
            .practice_service
            .submit_answer(user, id, chosen, 20, None)
            .await
            .expect("submit");
        assert!(feedback.is_correct);
    }
    let (algebra_id, algebra_correct) =
        seed_question(&pool, &category, "Algebra", Difficulty::Easy, "algebra q", 3).await;
    let next = state
        .practice_service
        .next_question(user, &category, Some("Algebra"))
        .await
        .expect("select")
        .expect("question");
    let wrong = (next.options.iter().position(|o| o == &algebra_correct).unwrap() as i32 + 1) % 4;
    let feedback = state
        .practice_service
        .submit_answer(user, algebra_id, wrong, 30, None)
        .await
        .expect("submit");
    assert!(!feedback.is_correct);

    // one completed mock, 8/10, none of it in Ratios or Algebra
    let now = Utc::now();
    let responses: Vec<MockResponseItem> = (0..10)
        .map(|i| mock_response("Number Series", &category, i < 8))
        .collect();
    state
        .mock_service
        .record_completed(SubmitMockRequest {
            user_id: user,
            score: 8,
            total: 10,
            accuracy: None,
            started_at: now - Duration::minutes(30),
            completed_at: now,
            responses,
        })
        .await
        .expect("record mock");

    let dashboard = state
        .analytics_service
        .overview(user)
        .await
        .expect("overview");

    // overall numbers come from the ledger: practice only
    assert_eq!(dashboard.total_attempts, 3);
    assert_eq!(dashboard.total_correct, 2);
    assert_eq!(dashboard.overall_accuracy, 66.7);
    assert_eq!(dashboard.tests_completed, 1);
    assert_eq!(dashboard.mock_average_score, 80.0);
    assert_eq!(dashboard.mock_best_score, 80.0);
    assert!(dashboard.streak_days >= 1);

    let skill = dashboard
        .skill_distribution
        .get(&category)
        .expect("category present");
    assert_eq!(skill.attempts, 3);
    assert_eq!(skill.corrects, 2);

    let ratios = dashboard.topic_breakdown.combined.get("Ratios").unwrap();
    assert_eq!(ratios.total, 2);
    assert_eq!(ratios.accuracy, 100.0);
    let series = dashboard
        .topic_breakdown
        .combined
        .get("Number Series")
        .unwrap();
    assert_eq!(series.total, 10);
    assert_eq!(series.accuracy, 80.0);

    assert!(dashboard.strengths.iter().any(|s| s.topic == "Ratios"));
    assert!(dashboard
        .areas_for_improvement
        .iter()
        .any(|s| s.topic == "Algebra"));

    // today's bucket merges practice attempts and mock responses
    let today = dashboard.weekly_activity.last().expect("seven days");
    assert_eq!(today.attempted, 13);
    assert_eq!(today.correct, 10);
    assert_eq!(today.categories.get(&category), Some(&13));

    let aptitude = &dashboard.recent_activity.aptitude;
    assert_eq!(aptitude.recent_mocks.len(), 1);
    assert_eq!(aptitude.recent_mocks[0].accuracy, 80.0);
    assert!(aptitude.practice_topics.iter().any(|t| t.topic == "Ratios"));
}

#[tokio::test]
async fn dashboard_is_zero_filled_for_new_user() {
    let pool = setup().await;
    let state = aceit_backend::AppState::new(pool.clone());

    let dashboard = state
        .analytics_service
        .overview(Uuid::new_v4())
        .await
        .expect("overview");
    assert_eq!(dashboard.total_attempts, 0);
    assert_eq!(dashboard.overall_accuracy, 0.0);
    assert_eq!(dashboard.streak_days, 0);
    assert_eq!(dashboard.tests_completed, 0);
    assert!(dashboard.strengths.is_empty());
    assert!(dashboard.areas_for_improvement.is_empty());
    assert_eq!(dashboard.weekly_activity.len(), 7);
    assert!(dashboard.weekly_activity.iter().all(|d| d.attempted == 0));
}

#[tokio::test]
async fn daily_streak_counts_consecutive_days_from_log() {
    let pool = setup().await;
    let state = aceit_backend::AppState::new(pool.clone());
    let user = Uuid::new_v4();
    let category = format!("Quantitative Ability {}", Uuid::new_v4());
    let (question_id, _) =
        seed_question(&pool, &category, "Ratios", Difficulty::Easy, "q", 0).await;

    let now = Utc::now();
    for days_back in [0i64, 1, 2, 4] {
        sqlx::query(
            r#"
            INSERT INTO attempts (user_id, question_id, chosen_index, is_correct, elapsed_seconds,
                                  difficulty, topic, category, context, attempted_at)
            VALUES ($1, $2, 0, true, 10, 'easy', 'Ratios', $3, 'practice', $4)
            "#,
        )
        .bind(user)
        .bind(question_id)
        .bind(&category)
        .bind(now - Duration::days(days_back))
        .execute(&pool)
        .await
        .expect("seed attempt");
    }

    let dashboard = state
        .analytics_service
        .overview(user)
        .await
        .expect("overview");
    // the gap at day 3 terminates the walk-back
    assert_eq!(dashboard.streak_days, 3);
}
