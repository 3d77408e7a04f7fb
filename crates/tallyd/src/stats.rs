//! Performance aggregation
//!
//! Turns stored mark totals into the stats payload: overall score, per-topic
//! accuracy, and the question-type weakness list. The overall score averages
//! per-paper percentages (each paper counts once), while topic accuracy
//! weights by marks, so a user strong on small papers can hold a high
//! overall score alongside a mark-weighted topic telling a harsher story.
//! Both views are intentional and neither is derivable from the other.
//!
//! The weakness list is a premium feature; free-tier users get an empty
//! list rather than an error so clients need no tier-specific handling.

use crate::store::{Store, SubTopicTotals, TopicTotals};
use tally_common::error::Result;
use tally_common::schemas::TopicStats;
use tally_common::types::PlanTier;
use uuid::Uuid;

/// One question type with its mark-weighted accuracy and total marks lost.
#[derive(Debug, Clone)]
pub struct SubTopicWeakness {
    pub sub_topic: String,
    pub accuracy: f64,
    pub marks_lost: i64,
}

/// Aggregated view of one user's performance.
#[derive(Debug, Clone)]
pub struct UserStats {
    pub overall_score: f64,
    pub paper_count: i64,
    pub topics: Vec<TopicStats>,
    pub sub_topic_weakness: Vec<SubTopicWeakness>,
}

/// Mark-weighted accuracy as a percentage. Zero available marks reads as
/// 0.0 rather than dividing by zero.
pub fn accuracy_pct(obtained: i64, available: i64) -> f64 {
    if available <= 0 {
        return 0.0;
    }
    100.0 * obtained as f64 / available as f64
}

/// Compute the full stats view for one user.
///
/// Topics come back weakest first (accuracy ascending, name as tie-break)
/// so clients can render "focus here" lists without re-sorting. Weakness
/// rows order by marks lost descending: losing 20 marks at 80% accuracy
/// matters more than losing 2 at 50%.
pub fn compute_stats(store: &Store, user_id: &Uuid) -> Result<UserStats> {
    let (overall_score, paper_count) = store.overall_and_count(user_id)?;

    let mut topics: Vec<TopicStats> = store
        .topic_totals(user_id)?
        .into_iter()
        .map(|t: TopicTotals| TopicStats {
            accuracy: accuracy_pct(t.obtained, t.available),
            topic: t.topic,
            marks_obtained: t.obtained,
            marks_available: t.available,
        })
        .collect();
    topics.sort_by(|a, b| {
        a.accuracy
            .partial_cmp(&b.accuracy)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.topic.cmp(&b.topic))
    });

    let mut weakness: Vec<SubTopicWeakness> = store
        .sub_topic_totals(user_id)?
        .into_iter()
        .map(|t: SubTopicTotals| SubTopicWeakness {
            accuracy: accuracy_pct(t.obtained, t.available),
            marks_lost: t.available - t.obtained,
            sub_topic: t.sub_topic,
        })
        .collect();
    weakness.sort_by(|a, b| {
        b.marks_lost
            .cmp(&a.marks_lost)
            .then_with(|| a.sub_topic.cmp(&b.sub_topic))
    });

    Ok(UserStats {
        overall_score,
        paper_count,
        topics,
        sub_topic_weakness: weakness,
    })
}

/// Apply tier gating to the weakness list. Free tier sees an empty list.
pub fn gated_weakness(tier: PlanTier, weakness: Vec<SubTopicWeakness>) -> Vec<SubTopicWeakness> {
    match tier {
        PlanTier::Premium => weakness,
        PlanTier::Free => Vec::new(),
    }
}
