//! JSON schemas for the Tally API
//!
//! v1.1.0: Added submission intake request/outcome
//! v1.2.0: Weakness entries renamed to question_type_* at the boundary

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Header carrying the authenticated user id, set by the auth gateway.
pub const USER_HEADER: &str = "x-tally-user";

/// One answered question in a submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerEntry {
    pub question_id: i64,
    pub marks_obtained: i64,
}

/// A completed paper posted by the submission handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionRequest {
    pub paper_id: i64,
    #[serde(default)]
    pub answers: Vec<AnswerEntry>,
}

/// Everything the pipeline produced for one submission event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionOutcome {
    pub overall_score: i64,
    pub grade: String,
    pub paper_count: i64,
    pub new_badges: Vec<String>,
    pub streak: StreakResponse,
    pub points: PointsResponse,
}

/// Per-topic accuracy, mark-weighted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicStats {
    pub topic: String,
    pub accuracy: f64,
    pub marks_obtained: i64,
    pub marks_available: i64,
}

/// A question type ranked by marks lost. Premium detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionTypeWeakness {
    pub question_type: String,
    pub accuracy: f64,
    pub marks_lost: i64,
}

/// Aggregated statistics for one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub overall_score: i64,
    pub grade: String,
    pub paper_count: i64,
    pub topics: Vec<TopicStats>,
    /// Empty for free-tier users.
    #[serde(default)]
    pub question_type_weakness: Vec<QuestionTypeWeakness>,
}

/// Result of a streak update. `points_awarded` is 0 when the day already
/// counted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreakResponse {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub points_awarded: i64,
}

/// Read-only streak view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreakStatusResponse {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_activity_date: Option<NaiveDate>,
}

/// Ledger view for one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsResponse {
    pub total_points: i64,
    pub experience: i64,
    pub level: i64,
    /// Experience total at which the next level starts.
    pub next_level_at: i64,
}

/// One earned badge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BadgeEntry {
    pub badge_id: String,
    pub earned_at: DateTime<Utc>,
}

/// All badges a user has earned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BadgesResponse {
    pub badges: Vec<BadgeEntry>,
}

/// Direct award request (pipeline tooling, not exposed in the UI).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwardBadgeRequest {
    pub badge_id: String,
}

/// Award outcome. `already_earned` marks the idempotent no-op case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwardBadgeResponse {
    pub success: bool,
    pub already_earned: bool,
    pub badge_id: String,
}

/// One leaderboard row. Rank is 1-based position after tie-breaking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub username: String,
    pub level: i64,
    pub total_points: i64,
}

/// Ranked opted-in users, capped by the daemon's configured limit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardResponse {
    pub entries: Vec<LeaderboardEntry>,
}

/// Request to change leaderboard visibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleVisibilityRequest {
    pub is_public: bool,
}

/// New visibility state after a toggle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleVisibilityResponse {
    pub leaderboard_opt_in: bool,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}
