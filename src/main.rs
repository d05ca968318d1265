use aceit_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    middleware::rate_limit::{rps_middleware, RpsLimiter},
    routes, AppState,
};
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let app_state = AppState::new(pool);

    let base_routes = Router::new().route("/health", get(routes::health::health));

    let api = Router::new()
        .route("/api/practice/next", post(routes::practice::next_question))
        .route("/api/practice/submit", post(routes::practice::submit_answer))
        .route("/api/practice/topics", get(routes::practice::list_topics))
        .route("/api/practice/history", get(routes::practice::history))
        .route("/api/analytics/overview", get(routes::analytics::overview))
        .route("/api/analytics/insight", get(routes::analytics::insight))
        .route("/api/mock/submit", post(routes::mock::submit_mock))
        .route("/api/mock/:id", get(routes::mock::get_mock))
        .layer(axum::middleware::from_fn_with_state(
            RpsLimiter::new(config.public_rps),
            rps_middleware,
        ));

    let app = base_routes
        .merge(api)
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
