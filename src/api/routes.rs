//! API Routes
//!
//! Configures the Axum router with the quiz, goal, and operational endpoints.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultOnResponse, TraceLayer},
    LatencyUnit,
};
use tracing::Level;

use super::handlers::{
    create_goal_handler, create_quiz_handler, delete_goal_handler, delete_quiz_handler,
    get_goal_handler, get_quiz_handler, health_handler, list_goal_handler, list_quiz_handler,
    missing_email_handler, render_goal_handler, render_quiz_handler, root_handler, stats_handler,
    upload_goals_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: One INFO line per response with method, path, and latency in ms
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace = TraceLayer::new_for_http().on_response(
        DefaultOnResponse::new()
            .level(Level::INFO)
            .latency_unit(LatencyUnit::Millis),
    );

    Router::new()
        .route("/", get(root_handler))
        // Quiz
        .route("/quiz", get(list_quiz_handler).post(create_quiz_handler))
        .route("/quiz/render", get(render_quiz_handler))
        .route("/quiz/", get(missing_email_handler).delete(missing_email_handler))
        .route("/quiz/:email", get(get_quiz_handler).delete(delete_quiz_handler))
        // Goal
        .route("/goal", get(list_goal_handler).post(create_goal_handler))
        .route("/goal/render", get(render_goal_handler))
        .route("/goal/uploadJSON", post(upload_goals_handler))
        .route("/goal/", get(missing_email_handler).delete(missing_email_handler))
        .route("/goal/:email", get(get_goal_handler).delete(delete_goal_handler))
        // Operational
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(trace)
        .with_state(state)
}
