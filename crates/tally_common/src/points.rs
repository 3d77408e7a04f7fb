//! Points ledger math
//!
//! Points and experience accrue identically; neither is spendable. Level is
//! a pure function of experience: one level per 1000 XP, starting at 1.
//! Every call site derives level through [`level_for_experience`].

use serde::{Deserialize, Serialize};

/// Experience required per level step.
pub const EXPERIENCE_PER_LEVEL: i64 = 1000;

/// Derive the level for a given experience total.
///
/// 0-999 XP is level 1, 1000-1999 is level 2, and so on.
pub fn level_for_experience(experience: i64) -> i64 {
    if experience <= 0 {
        return 1;
    }
    experience / EXPERIENCE_PER_LEVEL + 1
}

/// Experience at which the next level is reached.
pub fn next_level_at(experience: i64) -> i64 {
    level_for_experience(experience) * EXPERIENCE_PER_LEVEL
}

/// Result of applying an award to a ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsUpdate {
    pub total_points: i64,
    pub experience: i64,
    pub level: i64,
    pub leveled_up: bool,
}
