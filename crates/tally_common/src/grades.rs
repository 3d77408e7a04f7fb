//! Grade letter mapping
//!
//! One canonical step function turns a percentage score into a letter.
//! Every surface that displays a grade goes through this table.

/// Thresholds checked top-down; scores below every threshold are "U".
pub const GRADE_STEPS: &[(f64, &str)] = &[
    (90.0, "A*"),
    (80.0, "A"),
    (70.0, "B"),
    (60.0, "C"),
    (50.0, "D"),
    (40.0, "E"),
];

/// Map a percentage score (0-100) to its grade letter.
pub fn letter(score: f64) -> &'static str {
    for &(threshold, grade) in GRADE_STEPS {
        if score >= threshold {
            return grade;
        }
    }
    "U"
}
