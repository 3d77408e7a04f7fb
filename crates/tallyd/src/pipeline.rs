//! Submission pipeline
//!
//! A submission runs an ordered sequence of steps: capture the previous
//! overall score, replace the stored answers, recompute stats, evaluate
//! badges, advance the streak, and read back the points ledger. Each step
//! is idempotent on its own (replacement upserts, badge awards ignore
//! repeats, the streak is same-day safe), so a client retrying after a
//! mid-pipeline failure converges instead of double-counting. There is no
//! cross-step rollback.
//!
//! v1.1.0: previous score captured server-side; clients used to send it
//! and the improvement badge was trivially forgeable

use crate::notify;
use crate::stats;
use crate::store::Store;
use chrono::{DateTime, NaiveDate, Utc};
use tally_common::badges::{self, BadgeFacts};
use tally_common::error::Result;
use tally_common::grades;
use tally_common::schemas::{PointsResponse, StreakResponse, SubmissionOutcome, SubmissionRequest};
use tally_common::streak;
use tally_common::types::Session;
use tracing::{info, warn};
use uuid::Uuid;

/// Outcome of one streak advance: the day's award and the milestone hit,
/// if any. A same-day repeat yields zeros.
#[derive(Debug, Clone, Copy)]
pub struct StreakAdvance {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub points_awarded: i64,
}

/// Run the full submission pipeline for one user.
pub fn run_submission(
    store: &Store,
    session: &Session,
    request: &SubmissionRequest,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<SubmissionOutcome> {
    let user_id = session.user_id;

    // Previous overall score, before this paper lands. Feeds the
    // improvement badge; 0.0 means no history.
    let (previous_score, _) = store.overall_and_count(&user_id)?;

    store.replace_submission(&user_id, request.paper_id, &request.answers, today, now)?;

    let (overall_score, paper_count) = store.overall_and_count(&user_id)?;

    let facts = BadgeFacts {
        overall_score,
        paper_count,
        previous_score,
    };
    let mut new_badges = Vec::new();
    for badge_id in badges::evaluate(&facts) {
        if store.award_badge(&user_id, badge_id, now)? {
            notify::badge_earned(store, &user_id, badge_id);
            new_badges.push(badge_id.to_string());
        }
    }

    let advance = advance_streak(store, &user_id, today)?;
    let account = store.points(&user_id)?;

    info!(
        "Submission for {}: paper {} scored, overall {:.1}, {} new badge(s)",
        user_id,
        request.paper_id,
        overall_score,
        new_badges.len()
    );

    // The grade letter pairs with the rounded score the client displays.
    let rounded_score = overall_score.round();

    Ok(SubmissionOutcome {
        overall_score: rounded_score as i64,
        grade: grades::letter(rounded_score).to_string(),
        paper_count,
        new_badges,
        streak: StreakResponse {
            current_streak: advance.current_streak,
            longest_streak: advance.longest_streak,
            points_awarded: advance.points_awarded,
        },
        points: PointsResponse {
            total_points: account.total_points,
            experience: account.experience,
            level: account.level,
            next_level_at: tally_common::points::next_level_at(account.experience),
        },
    })
}

/// Advance the user's streak for activity today, awarding activity and
/// milestone points on a state change.
///
/// The decision is computed from a snapshot and applied with a guard on
/// the observed last-activity date. A lost race means another writer
/// advanced the streak first, so we re-read and try once more; if the
/// second snapshot says today is already counted, this request owes
/// nothing.
pub fn advance_streak(store: &Store, user_id: &Uuid, today: NaiveDate) -> Result<StreakAdvance> {
    for _ in 0..2 {
        let record = store.streak(user_id)?;
        let transition = match streak::observe(&record, today) {
            Some(t) => t,
            None => {
                // Already counted today
                return Ok(StreakAdvance {
                    current_streak: record.current_streak,
                    longest_streak: record.longest_streak,
                    points_awarded: 0,
                });
            }
        };

        if !store.apply_streak_transition(user_id, record.last_activity_date, &transition, today)? {
            continue;
        }

        let update = store.add_points(user_id, transition.points_award)?;
        if update.leveled_up {
            notify::level_up(store, user_id, update.level);
        }
        if let Some(days) = transition.milestone {
            if let Some(bonus) = streak::milestone_bonus(days) {
                notify::streak_milestone(store, user_id, days, bonus);
            }
        }

        return Ok(StreakAdvance {
            current_streak: transition.current_streak,
            longest_streak: transition.longest_streak,
            points_awarded: transition.points_award,
        });
    }

    // Both attempts lost the guard; whoever won already counted today.
    warn!("Streak update for {} lost the apply race twice", user_id);
    let record = store.streak(user_id)?;
    Ok(StreakAdvance {
        current_streak: record.current_streak,
        longest_streak: record.longest_streak,
        points_awarded: 0,
    })
}

/// Stats view with tier gating applied, shared by the stats route.
pub fn stats_for(store: &Store, session: &Session) -> Result<stats::UserStats> {
    let plan = store.plan(&session.user_id)?;
    let mut view = stats::compute_stats(store, &session.user_id)?;
    view.sub_topic_weakness = stats::gated_weakness(plan.tier, view.sub_topic_weakness);
    Ok(view)
}
