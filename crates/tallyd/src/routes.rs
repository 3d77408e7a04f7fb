//! HTTP API routes
//!
//! Every route under /v1 except the health probe identifies the caller
//! from the gateway-verified `x-tally-user` header. A missing or
//! malformed header maps to 401, validation failures to 400, missing
//! rows to 404, and storage faults to a 500 whose body deliberately says
//! nothing about the database.
//!
//! v1.1.0: POST /v1/submissions replaced the client-computed score flow
//! v1.2.0: GET /v1/stats gained question_type_weakness (premium)
//! v1.4.0: GET /v1/streak added so clients can render without mutating

use crate::notify;
use crate::pipeline;
use crate::server::AppStateArc;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use tally_common::error::CoreError;
use tally_common::schemas::{
    AwardBadgeRequest, AwardBadgeResponse, BadgeEntry, BadgesResponse, HealthResponse,
    LeaderboardEntry, LeaderboardResponse, PointsResponse, QuestionTypeWeakness, StatsResponse,
    StreakResponse, StreakStatusResponse, SubmissionOutcome, SubmissionRequest,
    ToggleVisibilityRequest, ToggleVisibilityResponse, USER_HEADER,
};
use tally_common::types::Session;
use tally_common::{badges, grades, points};
use tracing::error;
use uuid::Uuid;

/// Hard cap on leaderboard size, whatever the config asks for.
const MAX_LEADERBOARD_LIMIT: usize = 50;

// ============================================================================
// Route groups
// ============================================================================

pub fn health_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/health", get(get_health))
}

pub fn submission_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/submissions", post(create_submission))
}

pub fn stats_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/stats", get(get_stats))
}

pub fn streak_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/v1/streak", get(get_streak))
        .route("/v1/streak/update", post(update_streak))
}

pub fn badge_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/v1/badges", get(get_badges))
        .route("/v1/badges/award", post(award_badge))
}

pub fn points_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/points", get(get_points))
}

pub fn leaderboard_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/v1/leaderboard", get(get_leaderboard))
        .route("/v1/leaderboard/toggle", post(toggle_visibility))
}

// ============================================================================
// Session and error plumbing
// ============================================================================

/// Pull the caller's identity out of the gateway header.
fn require_session(headers: &HeaderMap) -> Result<Session, CoreError> {
    let raw = headers
        .get(USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| CoreError::Unauthorized(format!("missing {} header", USER_HEADER)))?;
    let user_id = Uuid::parse_str(raw)
        .map_err(|_| CoreError::Unauthorized(format!("malformed {} header", USER_HEADER)))?;
    Ok(Session { user_id })
}

/// Map a core error onto an HTTP status and response body.
fn error_response(err: CoreError) -> (StatusCode, String) {
    match err {
        CoreError::Validation { .. } => (StatusCode::BAD_REQUEST, err.to_string()),
        CoreError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, err.to_string()),
        CoreError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        CoreError::Storage(e) => {
            error!("Storage error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal storage error".to_string(),
            )
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn get_health(State(state): State<AppStateArc>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

async fn create_submission(
    State(state): State<AppStateArc>,
    headers: HeaderMap,
    Json(request): Json<SubmissionRequest>,
) -> Result<Json<SubmissionOutcome>, (StatusCode, String)> {
    let session = require_session(&headers).map_err(error_response)?;
    let now = Utc::now();
    let store = state.store.lock().await;
    let outcome = pipeline::run_submission(&store, &session, &request, now.date_naive(), now)
        .map_err(error_response)?;
    Ok(Json(outcome))
}

async fn get_stats(
    State(state): State<AppStateArc>,
    headers: HeaderMap,
) -> Result<Json<StatsResponse>, (StatusCode, String)> {
    let session = require_session(&headers).map_err(error_response)?;
    let store = state.store.lock().await;
    let view = pipeline::stats_for(&store, &session).map_err(error_response)?;

    // The grade letter pairs with the rounded score the client displays.
    let rounded_score = view.overall_score.round();

    Ok(Json(StatsResponse {
        overall_score: rounded_score as i64,
        grade: grades::letter(rounded_score).to_string(),
        paper_count: view.paper_count,
        topics: view.topics,
        question_type_weakness: view
            .sub_topic_weakness
            .into_iter()
            .map(|w| QuestionTypeWeakness {
                question_type: w.sub_topic,
                accuracy: w.accuracy,
                marks_lost: w.marks_lost,
            })
            .collect(),
    }))
}

async fn get_streak(
    State(state): State<AppStateArc>,
    headers: HeaderMap,
) -> Result<Json<StreakStatusResponse>, (StatusCode, String)> {
    let session = require_session(&headers).map_err(error_response)?;
    let store = state.store.lock().await;
    let record = store.streak(&session.user_id).map_err(error_response)?;

    Ok(Json(StreakStatusResponse {
        current_streak: record.current_streak,
        longest_streak: record.longest_streak,
        last_activity_date: record.last_activity_date,
    }))
}

async fn update_streak(
    State(state): State<AppStateArc>,
    headers: HeaderMap,
) -> Result<Json<StreakResponse>, (StatusCode, String)> {
    let session = require_session(&headers).map_err(error_response)?;
    let store = state.store.lock().await;
    let advance = pipeline::advance_streak(&store, &session.user_id, Utc::now().date_naive())
        .map_err(error_response)?;

    Ok(Json(StreakResponse {
        current_streak: advance.current_streak,
        longest_streak: advance.longest_streak,
        points_awarded: advance.points_awarded,
    }))
}

async fn get_badges(
    State(state): State<AppStateArc>,
    headers: HeaderMap,
) -> Result<Json<BadgesResponse>, (StatusCode, String)> {
    let session = require_session(&headers).map_err(error_response)?;
    let store = state.store.lock().await;
    let rows = store.badges(&session.user_id).map_err(error_response)?;

    Ok(Json(BadgesResponse {
        badges: rows
            .into_iter()
            .map(|b| BadgeEntry {
                badge_id: b.badge_id,
                earned_at: b.earned_at,
            })
            .collect(),
    }))
}

async fn award_badge(
    State(state): State<AppStateArc>,
    headers: HeaderMap,
    Json(request): Json<AwardBadgeRequest>,
) -> Result<Json<AwardBadgeResponse>, (StatusCode, String)> {
    let session = require_session(&headers).map_err(error_response)?;
    if !badges::is_known(&request.badge_id) {
        return Err(error_response(CoreError::validation(
            "badge_id",
            format!("unknown badge {}", request.badge_id),
        )));
    }

    let store = state.store.lock().await;
    let newly = store
        .award_badge(&session.user_id, &request.badge_id, Utc::now())
        .map_err(error_response)?;
    if newly {
        notify::badge_earned(&store, &session.user_id, &request.badge_id);
    }

    Ok(Json(AwardBadgeResponse {
        success: newly,
        already_earned: !newly,
        badge_id: request.badge_id,
    }))
}

async fn get_points(
    State(state): State<AppStateArc>,
    headers: HeaderMap,
) -> Result<Json<PointsResponse>, (StatusCode, String)> {
    let session = require_session(&headers).map_err(error_response)?;
    let store = state.store.lock().await;
    let account = store.points(&session.user_id).map_err(error_response)?;

    Ok(Json(PointsResponse {
        total_points: account.total_points,
        experience: account.experience,
        level: account.level,
        next_level_at: points::next_level_at(account.experience),
    }))
}

async fn get_leaderboard(
    State(state): State<AppStateArc>,
    headers: HeaderMap,
) -> Result<Json<LeaderboardResponse>, (StatusCode, String)> {
    require_session(&headers).map_err(error_response)?;
    let limit = state.config.leaderboard.limit.min(MAX_LEADERBOARD_LIMIT);
    let store = state.store.lock().await;
    let rows = store.leaderboard(limit).map_err(error_response)?;

    Ok(Json(LeaderboardResponse {
        entries: rows
            .into_iter()
            .enumerate()
            .map(|(i, row)| LeaderboardEntry {
                rank: i as u32 + 1,
                username: row.username,
                level: row.level,
                total_points: row.total_points,
            })
            .collect(),
    }))
}

async fn toggle_visibility(
    State(state): State<AppStateArc>,
    headers: HeaderMap,
    Json(request): Json<ToggleVisibilityRequest>,
) -> Result<Json<ToggleVisibilityResponse>, (StatusCode, String)> {
    let session = require_session(&headers).map_err(error_response)?;
    let store = state.store.lock().await;
    let opt_in = store
        .set_leaderboard_opt_in(&session.user_id, request.is_public)
        .map_err(error_response)?;

    Ok(Json(ToggleVisibilityResponse {
        leaderboard_opt_in: opt_in,
    }))
}
