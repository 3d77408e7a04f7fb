//! Daily streak state machine
//!
//! A streak is evaluated at most once per calendar day per user. The
//! decision is a pure function of the stored record and the observed date,
//! so the calendar logic tests without a store or a clock; the daemon
//! applies the resulting transition with compare-and-set semantics.

use crate::types::StreakRecord;
use chrono::NaiveDate;

/// Points granted for the first qualifying activity of a day.
pub const BASE_ACTIVITY_POINTS: i64 = 5;

/// Bonus points granted when the streak reaches a milestone length.
pub const STREAK_MILESTONES: &[(u32, i64)] = &[
    (7, 50),
    (14, 100),
    (30, 250),
    (50, 500),
    (100, 1000),
];

/// Bonus for a streak length, if that length is a milestone.
pub fn milestone_bonus(streak: u32) -> Option<i64> {
    STREAK_MILESTONES
        .iter()
        .find(|(days, _)| *days == streak)
        .map(|(_, bonus)| *bonus)
}

/// Phase of a streak relative to the observed day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakState {
    /// No activity recorded yet.
    Fresh,
    /// Already counted today; further activity is a no-op.
    ActiveToday,
    /// Last activity was yesterday; today extends the run.
    Continuable,
    /// A day or more was missed; the run starts over.
    Broken,
}

impl StreakState {
    /// Classify a stored last-activity date against the observed day.
    ///
    /// A recorded date in the future (clock skew between writers) reads as
    /// ActiveToday so it can never inflate the streak.
    pub fn classify(last_activity: Option<NaiveDate>, today: NaiveDate) -> Self {
        let last = match last_activity {
            Some(d) => d,
            None => return StreakState::Fresh,
        };

        let days_since = (today - last).num_days();
        if days_since <= 0 {
            StreakState::ActiveToday
        } else if days_since == 1 {
            StreakState::Continuable
        } else {
            StreakState::Broken
        }
    }
}

/// The state change produced by one qualifying activity event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreakTransition {
    pub current_streak: u32,
    pub longest_streak: u32,
    /// Set when the new streak length lands on a milestone.
    pub milestone: Option<u32>,
    /// Base award plus any milestone bonus.
    pub points_award: i64,
}

/// Decide what an activity event today does to the stored record.
///
/// Returns None when the day already counted; the caller must treat that
/// as a complete no-op (no write, no points).
pub fn observe(record: &StreakRecord, today: NaiveDate) -> Option<StreakTransition> {
    let current = match StreakState::classify(record.last_activity_date, today) {
        StreakState::ActiveToday => return None,
        StreakState::Continuable => record.current_streak + 1,
        StreakState::Fresh | StreakState::Broken => 1,
    };

    let longest = record.longest_streak.max(current);
    let milestone = milestone_bonus(current).map(|_| current);
    let points_award = BASE_ACTIVITY_POINTS + milestone_bonus(current).unwrap_or(0);

    Some(StreakTransition {
        current_streak: current,
        longest_streak: longest,
        milestone,
        points_award,
    })
}
