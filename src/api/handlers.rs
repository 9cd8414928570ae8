use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    models::{CategoryBucket, MovieRecord},
    services::agent::{run_single_user_sync, trigger_single_user},
};

use super::AppState;

/// Header carrying the caller's session; falls back to the user id
pub const SESSION_HEADER: &str = "x-session-id";

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct HomeParams {
    pub user_id: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HomeResponse {
    pub user_id: String,
    pub trending: Vec<MovieRecord>,
}

#[derive(Debug, Deserialize)]
pub struct QuestionnaireRequest {
    pub user_id: String,
    pub genres: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct QuestionnaireResponse {
    pub user_id: String,
    pub buckets: Vec<CategoryBucket>,
}

#[derive(Debug, Deserialize)]
pub struct RatingRequest {
    pub user_id: String,
    pub movie_id: String,
    pub rating: f64,
}

#[derive(Debug, Deserialize)]
pub struct DemoAgentRequest {
    pub user_id: String,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Resolve a title, canonical id or cross-reference id to one record
pub async fn search_movie(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<MovieRecord>> {
    if params.query.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "Search query cannot be empty".to_string(),
        ));
    }

    match state.resolver.resolve(&params.query).await {
        Some(record) => Ok(Json(record)),
        None => Err(AppError::NotFound(format!(
            "No movie matched '{}'",
            params.query
        ))),
    }
}

/// Home feed: trending records, cached per session until stale
pub async fn home_feed(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HomeParams>,
) -> AppResult<Json<HomeResponse>> {
    let session_key = headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(&params.user_id)
        .to_string();
    let refresh = params.refresh.as_deref() == Some("true");

    let cached = state
        .feed_cache
        .read(&session_key, &params.user_id, refresh, Utc::now())
        .await;

    let trending = match cached {
        Some(trending) => trending,
        None => {
            let fresh = state.trending.fetch().await;
            state
                .feed_cache
                .write(&session_key, &params.user_id, fresh.clone(), Utc::now())
                .await;
            fresh
        }
    };

    Ok(Json(HomeResponse {
        user_id: params.user_id,
        trending,
    }))
}

/// Per-genre movie buckets for the onboarding questionnaire
pub async fn questionnaire_movies(
    State(state): State<AppState>,
    Json(request): Json<QuestionnaireRequest>,
) -> AppResult<Json<QuestionnaireResponse>> {
    if request.genres.is_empty() {
        return Err(AppError::InvalidInput(
            "At least one genre is required".to_string(),
        ));
    }

    let buckets = state.aggregator.aggregate_by_categories(&request.genres).await;

    Ok(Json(QuestionnaireResponse {
        user_id: request.user_id,
        buckets,
    }))
}

/// Accepts a rating and kicks off the user's recommendation refresh in the
/// background; the response never waits on the agent.
pub async fn submit_rating(
    State(state): State<AppState>,
    Json(request): Json<RatingRequest>,
) -> AppResult<StatusCode> {
    if !(0.0..=10.0).contains(&request.rating) {
        return Err(AppError::InvalidInput(
            "Rating must be between 0 and 10".to_string(),
        ));
    }

    tracing::info!(
        user_id = %request.user_id,
        movie_id = %request.movie_id,
        rating = request.rating,
        "Rating received"
    );

    trigger_single_user(Arc::clone(&state.agent), request.user_id);

    Ok(StatusCode::ACCEPTED)
}

/// Runs the agent synchronously for one user; demo/manual trigger
pub async fn trigger_demo_agent(
    State(state): State<AppState>,
    Json(request): Json<DemoAgentRequest>,
) -> AppResult<String> {
    if run_single_user_sync(state.agent.as_ref(), &request.user_id).await {
        Ok("Recommendations updated".to_string())
    } else {
        Err(AppError::Agent("Agent run failed".to_string()))
    }
}
