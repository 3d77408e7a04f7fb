//! Notification queueing
//!
//! Milestone, level-up, and badge events append rows that the delivery
//! service drains out-of-band. A failed insert is logged and dropped; the
//! gamification write that triggered it has already committed and a lost
//! congratulation must not unwind it.

use crate::store::Store;
use tracing::{debug, warn};
use uuid::Uuid;

pub const KIND_STREAK_MILESTONE: &str = "streak_milestone";
pub const KIND_LEVEL_UP: &str = "level_up";
pub const KIND_BADGE_EARNED: &str = "badge_earned";

pub fn streak_milestone(store: &Store, user_id: &Uuid, days: u32, bonus: i64) {
    let message = format!("{} day streak! +{} bonus points", days, bonus);
    write(store, user_id, KIND_STREAK_MILESTONE, &message);
}

pub fn level_up(store: &Store, user_id: &Uuid, level: i64) {
    let message = format!("Level up! You reached level {}", level);
    write(store, user_id, KIND_LEVEL_UP, &message);
}

pub fn badge_earned(store: &Store, user_id: &Uuid, badge_id: &str) {
    let message = format!("Badge earned: {}", badge_id);
    write(store, user_id, KIND_BADGE_EARNED, &message);
}

fn write(store: &Store, user_id: &Uuid, kind: &str, message: &str) {
    match store.insert_notification(user_id, kind, message) {
        Ok(()) => debug!("Queued {} notification for {}", kind, user_id),
        Err(e) => warn!("Failed to queue {} notification for {}: {}", kind, user_id, e),
    }
}
