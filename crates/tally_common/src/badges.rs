//! Badge rule table
//!
//! Rules are independent predicates over a small fact set; any subset may
//! fire on one submission event. Awarding is idempotent at the store level
//! (unique per user and badge), so re-evaluating an earned badge is a
//! silent no-op.

pub const FIRST_PAPER: &str = "first_paper";
pub const FIVE_PAPERS: &str = "five_papers";
pub const TEN_PAPERS: &str = "ten_papers";
pub const PERFECT_SCORE: &str = "perfect_score";
pub const GRADE_A: &str = "grade_a";
pub const GRADE_A_STAR: &str = "grade_a_star";
pub const IMPROVEMENT_10: &str = "improvement_10";

/// Every badge the evaluator can award.
pub const ALL_BADGES: &[&str] = &[
    FIRST_PAPER,
    FIVE_PAPERS,
    TEN_PAPERS,
    PERFECT_SCORE,
    GRADE_A,
    GRADE_A_STAR,
    IMPROVEMENT_10,
];

/// Whether a badge id is one the system knows about.
pub fn is_known(badge_id: &str) -> bool {
    ALL_BADGES.contains(&badge_id)
}

/// Facts the evaluator consumes, computed after a submission lands.
///
/// `previous_score` is the overall score immediately before the submission
/// was applied; the pipeline derives it from the store rather than
/// trusting the caller.
#[derive(Debug, Clone)]
pub struct BadgeFacts {
    pub overall_score: f64,
    pub paper_count: i64,
    pub previous_score: f64,
}

/// Evaluate every rule against the facts.
pub fn evaluate(facts: &BadgeFacts) -> Vec<&'static str> {
    let mut earned = Vec::new();

    if facts.paper_count == 1 {
        earned.push(FIRST_PAPER);
    }
    if facts.paper_count == 5 {
        earned.push(FIVE_PAPERS);
    }
    if facts.paper_count == 10 {
        earned.push(TEN_PAPERS);
    }
    if facts.overall_score >= 100.0 {
        earned.push(PERFECT_SCORE);
    }
    if facts.overall_score >= 80.0 && facts.overall_score < 90.0 {
        earned.push(GRADE_A);
    }
    if facts.overall_score >= 90.0 {
        earned.push(GRADE_A_STAR);
    }
    if facts.previous_score > 0.0 && facts.overall_score - facts.previous_score >= 10.0 {
        earned.push(IMPROVEMENT_10);
    }

    earned
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts(overall: f64, papers: i64, previous: f64) -> BadgeFacts {
        BadgeFacts {
            overall_score: overall,
            paper_count: papers,
            previous_score: previous,
        }
    }

    #[test]
    fn test_first_paper_with_high_score_awards_both() {
        let earned = evaluate(&facts(85.0, 1, 0.0));
        assert!(earned.contains(&FIRST_PAPER));
        assert!(earned.contains(&GRADE_A));
        assert!(!earned.contains(&GRADE_A_STAR));
    }

    #[test]
    fn test_paper_count_milestones_fire_exactly() {
        assert!(evaluate(&facts(50.0, 5, 50.0)).contains(&FIVE_PAPERS));
        assert!(evaluate(&facts(50.0, 10, 50.0)).contains(&TEN_PAPERS));
        assert!(!evaluate(&facts(50.0, 6, 50.0)).contains(&FIVE_PAPERS));
        assert!(!evaluate(&facts(50.0, 11, 50.0)).contains(&TEN_PAPERS));
    }

    #[test]
    fn test_grade_bands_are_exclusive() {
        let a = evaluate(&facts(80.0, 3, 70.0));
        assert!(a.contains(&GRADE_A));
        assert!(!a.contains(&GRADE_A_STAR));

        let a_star = evaluate(&facts(90.0, 3, 85.0));
        assert!(a_star.contains(&GRADE_A_STAR));
        assert!(!a_star.contains(&GRADE_A));
    }

    #[test]
    fn test_perfect_score_includes_a_star() {
        let earned = evaluate(&facts(100.0, 2, 90.0));
        assert!(earned.contains(&PERFECT_SCORE));
        assert!(earned.contains(&GRADE_A_STAR));
    }

    #[test]
    fn test_improvement_requires_prior_score() {
        // A first submission jumps from 0; that is not an improvement.
        assert!(!evaluate(&facts(75.0, 1, 0.0)).contains(&IMPROVEMENT_10));
        // A genuine ten point climb is.
        assert!(evaluate(&facts(75.0, 2, 60.0)).contains(&IMPROVEMENT_10));
        // So is a climb of exactly ten on a retake of the only paper.
        assert!(evaluate(&facts(60.0, 1, 50.0)).contains(&IMPROVEMENT_10));
        // Nine point climbs are not.
        assert!(!evaluate(&facts(69.0, 2, 60.0)).contains(&IMPROVEMENT_10));
    }

    #[test]
    fn test_no_badges_for_middling_progress() {
        let earned = evaluate(&facts(55.0, 3, 52.0));
        assert!(earned.is_empty());
    }

    #[test]
    fn test_known_badge_ids() {
        for id in ALL_BADGES {
            assert!(is_known(id));
        }
        assert!(!is_known("participation_trophy"));
    }
}
