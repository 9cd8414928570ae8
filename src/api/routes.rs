use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers;
use super::AppState;

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Movie lookup
        .route("/search", get(handlers::search_movie))
        // Home feed
        .route("/home", get(handlers::home_feed))
        // Onboarding questionnaire
        .route("/questionnaire/movies", post(handlers::questionnaire_movies))
        // Ratings
        .route("/ratings", post(handlers::submit_rating))
        // Manual agent trigger
        .route("/agent/demo", post(handlers::trigger_demo_agent))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
