//! Grade projector
//!
//! Pure what-if computation: given current per-topic marks and hypothetical
//! per-topic improvements (in percentage points), compute the projected
//! accuracy and overall score. Runs client-side on fetched stats; it never
//! mutates anything.
//!
//! The projected overall is mark-weighted across topics, unlike the
//! displayed overall score which averages per-paper percentages. That
//! asymmetry is intentional and both numbers are kept.

use crate::error::CoreError;
use crate::grades;
use crate::schemas::TopicStats;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Largest accepted improvement per topic, in percentage points.
pub const MAX_IMPROVEMENT_POINTS: f64 = 20.0;

/// Projection for a single topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectedTopic {
    pub topic: String,
    pub current_accuracy: f64,
    pub projected_accuracy: f64,
    pub marks_available: i64,
    pub projected_marks: f64,
}

/// Full projection result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projection {
    pub projected_overall: f64,
    pub projected_grade: String,
    pub topics: Vec<ProjectedTopic>,
}

/// Project topic accuracies under the given improvements.
///
/// Topics absent from `improvements` keep their current accuracy; keys that
/// match no topic are ignored. Each improvement must lie in
/// [0, MAX_IMPROVEMENT_POINTS]. Raising any single improvement never lowers
/// the projected overall.
pub fn project(
    topics: &[TopicStats],
    improvements: &HashMap<String, f64>,
) -> Result<Projection, CoreError> {
    for (topic, delta) in improvements {
        if !delta.is_finite() || *delta < 0.0 || *delta > MAX_IMPROVEMENT_POINTS {
            return Err(CoreError::validation(
                format!("improvements.{}", topic),
                format!(
                    "must be between 0 and {} percentage points",
                    MAX_IMPROVEMENT_POINTS
                ),
            ));
        }
    }

    let mut projected_topics = Vec::with_capacity(topics.len());
    let mut projected_marks_total = 0.0;
    let mut available_total: i64 = 0;

    for t in topics {
        let delta = improvements.get(&t.topic).copied().unwrap_or(0.0);

        let current_fraction = if t.marks_available > 0 {
            t.marks_obtained as f64 / t.marks_available as f64
        } else {
            0.0
        };
        // Accuracy caps at 100%; a topic with no marks available stays at 0.
        let projected_fraction = if t.marks_available > 0 {
            (current_fraction + delta / 100.0).min(1.0)
        } else {
            0.0
        };
        let projected_marks = t.marks_available as f64 * projected_fraction;

        projected_marks_total += projected_marks;
        available_total += t.marks_available;

        projected_topics.push(ProjectedTopic {
            topic: t.topic.clone(),
            current_accuracy: 100.0 * current_fraction,
            projected_accuracy: 100.0 * projected_fraction,
            marks_available: t.marks_available,
            projected_marks,
        });
    }

    let projected_overall = if available_total > 0 {
        100.0 * projected_marks_total / available_total as f64
    } else {
        0.0
    };

    Ok(Projection {
        projected_overall,
        projected_grade: grades::letter(projected_overall).to_string(),
        topics: projected_topics,
    })
}
