//! Domain records for students, papers, and gamification state
//!
//! These mirror the rows the daemon persists. Reference data (papers,
//! questions) is loaded by the content pipeline and never mutated here;
//! per-user state is created lazily with zero values on first access.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Authenticated caller identity, extracted once per request and passed
/// explicitly into every operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub user_id: Uuid,
}

/// A registered student. Created at signup by the auth service; the
/// analytics core reads it and flips the leaderboard flag, nothing else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    /// Leaderboard participation is opt-in and defaults to off.
    pub leaderboard_opt_in: bool,
    pub created_at: DateTime<Utc>,
}

/// Subscription tier controlling access to premium analytics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Free,
    Premium,
}

impl PlanTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Free => "free",
            PlanTier::Premium => "premium",
        }
    }

    /// Parse a stored tier string. Unknown values read as Free.
    pub fn from_str_or_free(s: &str) -> Self {
        match s {
            "premium" => PlanTier::Premium,
            _ => PlanTier::Free,
        }
    }
}

/// Per-user plan. Quota enforcement happens upstream in the submission
/// handler; the core only reads the tier to gate premium detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub tier: PlanTier,
    pub max_papers: i64,
}

impl Default for Plan {
    fn default() -> Self {
        Self {
            tier: PlanTier::Free,
            max_papers: 5,
        }
    }
}

/// An exam paper. Immutable reference data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paper {
    pub id: i64,
    pub board: String,
    pub year: i32,
    pub paper_number: i32,
    pub total_marks: i64,
}

/// A question within a paper. `sub_topic` is the fine-grained question
/// classification the API exposes under the name `question_type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub paper_id: i64,
    pub topic: String,
    pub sub_topic: Option<String>,
    pub marks_available: i64,
}

/// Daily activity streak state for one user.
///
/// `current_streak <= longest_streak` always holds, and `longest_streak`
/// never decreases.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreakRecord {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_activity_date: Option<NaiveDate>,
}

/// Points and experience ledger for one user. Both accumulators are
/// monotonic; no spend operation exists anywhere in the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsAccount {
    pub total_points: i64,
    pub experience: i64,
    pub level: i64,
}

impl Default for PointsAccount {
    fn default() -> Self {
        Self {
            total_points: 0,
            experience: 0,
            level: 1,
        }
    }
}

/// An earned badge. At most one per (user, badge id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BadgeRecord {
    pub badge_id: String,
    pub earned_at: DateTime<Utc>,
}

/// A queued notification row. Written best-effort by the pipeline and
/// consumed by an external delivery service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}
