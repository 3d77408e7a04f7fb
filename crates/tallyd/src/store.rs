//! SQLite-backed analytics store
//!
//! One database shared with the signup and content services. Per-user
//! gamification rows (plan, streak, points) are created lazily with zero
//! state on first access. Multi-statement mutations run inside
//! transactions; streak updates apply with compare-and-set against the
//! observed last-activity date so two same-day writers cannot both count,
//! and points awards apply as relative updates so no writer can lose
//! another's award.
//!
//! Schema:
//! - users, plans: identity and tier (signup service writes users)
//! - papers, questions: immutable reference data (content pipeline writes)
//! - responses, submissions: one live row per user/question and user/paper
//! - streaks, points, badges, notifications: gamification state
//!
//! v1.2.0: Leaderboard tie-break pinned to user id ascending
//! v1.3.0: Submission replacement collapsed into a single transaction
//! v1.4.1: Points awards applied as relative updates in the award transaction

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tally_common::error::{CoreError, Result};
use tally_common::points::{level_for_experience, PointsUpdate};
use tally_common::schemas::AnswerEntry;
use tally_common::streak::StreakTransition;
use tally_common::types::{
    BadgeRecord, Notification, Paper, Plan, PlanTier, PointsAccount, Question, StreakRecord, User,
};
use uuid::Uuid;

/// Per-topic mark totals for one user, straight from the responses join.
#[derive(Debug, Clone)]
pub struct TopicTotals {
    pub topic: String,
    pub obtained: i64,
    pub available: i64,
}

/// Per-question-type mark totals for one user.
#[derive(Debug, Clone)]
pub struct SubTopicTotals {
    pub sub_topic: String,
    pub obtained: i64,
    pub available: i64,
}

/// One leaderboard row before ranks are assigned.
#[derive(Debug, Clone)]
pub struct LeaderboardRow {
    pub user_id: Uuid,
    pub username: String,
    pub level: i64,
    pub total_points: i64,
}

/// SQLite-backed store for all analytics and gamification state.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open at a specific path, creating the schema if needed.
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;

        // WAL mode for concurrent readers while the daemon writes
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                leaderboard_opt_in INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS plans (
                user_id TEXT PRIMARY KEY REFERENCES users(id),
                tier TEXT NOT NULL DEFAULT 'free',
                max_papers INTEGER NOT NULL DEFAULT 5
            );

            CREATE TABLE IF NOT EXISTS papers (
                id INTEGER PRIMARY KEY,
                board TEXT NOT NULL,
                year INTEGER NOT NULL,
                paper_number INTEGER NOT NULL,
                total_marks INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS questions (
                id INTEGER PRIMARY KEY,
                paper_id INTEGER NOT NULL REFERENCES papers(id),
                topic TEXT NOT NULL,
                sub_topic TEXT,
                marks_available INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_questions_paper ON questions(paper_id);

            CREATE TABLE IF NOT EXISTS responses (
                user_id TEXT NOT NULL REFERENCES users(id),
                question_id INTEGER NOT NULL REFERENCES questions(id),
                marks_obtained INTEGER NOT NULL,
                UNIQUE(user_id, question_id)
            );

            CREATE INDEX IF NOT EXISTS idx_responses_user ON responses(user_id);

            CREATE TABLE IF NOT EXISTS submissions (
                user_id TEXT NOT NULL REFERENCES users(id),
                paper_id INTEGER NOT NULL REFERENCES papers(id),
                total_obtained INTEGER NOT NULL,
                submission_date TEXT NOT NULL,
                submitted_at TEXT NOT NULL,
                UNIQUE(user_id, paper_id)
            );

            CREATE INDEX IF NOT EXISTS idx_submissions_user ON submissions(user_id);

            CREATE TABLE IF NOT EXISTS streaks (
                user_id TEXT PRIMARY KEY REFERENCES users(id),
                current_streak INTEGER NOT NULL DEFAULT 0,
                longest_streak INTEGER NOT NULL DEFAULT 0,
                last_activity_date TEXT
            );

            CREATE TABLE IF NOT EXISTS points (
                user_id TEXT PRIMARY KEY REFERENCES users(id),
                total_points INTEGER NOT NULL DEFAULT 0,
                experience INTEGER NOT NULL DEFAULT 0,
                level INTEGER NOT NULL DEFAULT 1
            );

            CREATE INDEX IF NOT EXISTS idx_points_total ON points(total_points DESC);

            CREATE TABLE IF NOT EXISTS badges (
                user_id TEXT NOT NULL REFERENCES users(id),
                badge_id TEXT NOT NULL,
                earned_at TEXT NOT NULL,
                UNIQUE(user_id, badge_id)
            );

            CREATE TABLE IF NOT EXISTS notifications (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id),
                kind TEXT NOT NULL,
                message TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            "#,
        )?;

        Ok(Self { conn })
    }

    // ========================================================================
    // Users and plans
    // ========================================================================

    /// Insert a user row. Signup normally does this; tests and seed tooling
    /// use it directly.
    pub fn insert_user(&self, user: &User) -> Result<()> {
        self.conn.execute(
            "INSERT INTO users (id, username, leaderboard_opt_in, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                user.id.to_string(),
                &user.username,
                user.leaderboard_opt_in,
                user.created_at
            ],
        )?;
        Ok(())
    }

    /// Look up a user by id.
    pub fn user(&self, user_id: &Uuid) -> Result<Option<User>> {
        let result = self.conn.query_row(
            "SELECT id, username, leaderboard_opt_in, created_at FROM users WHERE id = ?1",
            params![user_id.to_string()],
            |row| {
                Ok(User {
                    id: uuid_column(row.get::<_, String>(0)?, 0)?,
                    username: row.get(1)?,
                    leaderboard_opt_in: row.get(2)?,
                    created_at: row.get(3)?,
                })
            },
        );
        match result {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn require_user(&self, user_id: &Uuid) -> Result<()> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
            params![user_id.to_string()],
            |row| row.get(0),
        )?;
        if exists {
            Ok(())
        } else {
            Err(CoreError::NotFound(format!("user {}", user_id)))
        }
    }

    /// Fetch the user's plan, creating the default free row on first access.
    pub fn plan(&self, user_id: &Uuid) -> Result<Plan> {
        self.require_user(user_id)?;
        let defaults = Plan::default();
        self.conn.execute(
            "INSERT OR IGNORE INTO plans (user_id, tier, max_papers) VALUES (?1, ?2, ?3)",
            params![
                user_id.to_string(),
                defaults.tier.as_str(),
                defaults.max_papers
            ],
        )?;
        self.conn
            .query_row(
                "SELECT tier, max_papers FROM plans WHERE user_id = ?1",
                params![user_id.to_string()],
                |row| {
                    let tier: String = row.get(0)?;
                    Ok(Plan {
                        tier: PlanTier::from_str_or_free(&tier),
                        max_papers: row.get(1)?,
                    })
                },
            )
            .map_err(Into::into)
    }

    /// Set the user's plan tier (billing service tooling, and tests).
    pub fn set_plan(&self, user_id: &Uuid, plan: &Plan) -> Result<()> {
        self.require_user(user_id)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO plans (user_id, tier, max_papers) VALUES (?1, ?2, ?3)",
            params![user_id.to_string(), plan.tier.as_str(), plan.max_papers],
        )?;
        Ok(())
    }

    /// Flip leaderboard visibility; returns the new value.
    pub fn set_leaderboard_opt_in(&self, user_id: &Uuid, opt_in: bool) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE users SET leaderboard_opt_in = ?1 WHERE id = ?2",
            params![opt_in, user_id.to_string()],
        )?;
        if changed == 0 {
            return Err(CoreError::NotFound(format!("user {}", user_id)));
        }
        Ok(opt_in)
    }

    // ========================================================================
    // Reference data: papers and questions
    // ========================================================================

    /// Insert a paper (content pipeline tooling, and tests).
    pub fn insert_paper(&self, paper: &Paper) -> Result<()> {
        self.conn.execute(
            "INSERT INTO papers (id, board, year, paper_number, total_marks)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                paper.id,
                &paper.board,
                paper.year,
                paper.paper_number,
                paper.total_marks
            ],
        )?;
        Ok(())
    }

    /// Look up a paper by id.
    pub fn paper(&self, paper_id: i64) -> Result<Option<Paper>> {
        let result = self.conn.query_row(
            "SELECT id, board, year, paper_number, total_marks FROM papers WHERE id = ?1",
            params![paper_id],
            |row| {
                Ok(Paper {
                    id: row.get(0)?,
                    board: row.get(1)?,
                    year: row.get(2)?,
                    paper_number: row.get(3)?,
                    total_marks: row.get(4)?,
                })
            },
        );
        match result {
            Ok(paper) => Ok(Some(paper)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Insert a question (content pipeline tooling, and tests).
    pub fn insert_question(&self, question: &Question) -> Result<()> {
        self.conn.execute(
            "INSERT INTO questions (id, paper_id, topic, sub_topic, marks_available)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                question.id,
                question.paper_id,
                &question.topic,
                &question.sub_topic,
                question.marks_available
            ],
        )?;
        Ok(())
    }

    /// All questions belonging to one paper.
    pub fn paper_questions(&self, paper_id: i64) -> Result<Vec<Question>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, paper_id, topic, sub_topic, marks_available
             FROM questions WHERE paper_id = ?1",
        )?;
        let rows = stmt.query_map(params![paper_id], |row| {
            Ok(Question {
                id: row.get(0)?,
                paper_id: row.get(1)?,
                topic: row.get(2)?,
                sub_topic: row.get(3)?,
                marks_available: row.get(4)?,
            })
        })?;

        let mut questions = Vec::new();
        for row in rows {
            questions.push(row?);
        }
        Ok(questions)
    }

    // ========================================================================
    // Submissions and responses
    // ========================================================================

    /// Replace the user's stored answers for one paper.
    ///
    /// Validates every answer against the paper's question set before
    /// touching anything, then deletes the old responses, inserts the new
    /// set, and upserts the submission row in one transaction. Returns the
    /// new total marks obtained.
    pub fn replace_submission(
        &self,
        user_id: &Uuid,
        paper_id: i64,
        answers: &[AnswerEntry],
        submission_date: NaiveDate,
        submitted_at: DateTime<Utc>,
    ) -> Result<i64> {
        self.require_user(user_id)?;
        self.paper(paper_id)?
            .ok_or_else(|| CoreError::NotFound(format!("paper {}", paper_id)))?;

        let questions = self.paper_questions(paper_id)?;
        let by_id: HashMap<i64, &Question> = questions.iter().map(|q| (q.id, q)).collect();

        let mut seen = HashSet::new();
        let mut total: i64 = 0;
        for answer in answers {
            let question = by_id.get(&answer.question_id).ok_or_else(|| {
                CoreError::validation(
                    "question_id",
                    format!(
                        "question {} does not belong to paper {}",
                        answer.question_id, paper_id
                    ),
                )
            })?;
            if !seen.insert(answer.question_id) {
                return Err(CoreError::validation(
                    "question_id",
                    format!("question {} answered twice", answer.question_id),
                ));
            }
            if answer.marks_obtained < 0 || answer.marks_obtained > question.marks_available {
                return Err(CoreError::validation(
                    "marks_obtained",
                    format!(
                        "question {}: {} is outside 0..={}",
                        answer.question_id, answer.marks_obtained, question.marks_available
                    ),
                ));
            }
            total += answer.marks_obtained;
        }

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM responses WHERE user_id = ?1
             AND question_id IN (SELECT id FROM questions WHERE paper_id = ?2)",
            params![user_id.to_string(), paper_id],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO responses (user_id, question_id, marks_obtained) VALUES (?1, ?2, ?3)",
            )?;
            for answer in answers {
                stmt.execute(params![
                    user_id.to_string(),
                    answer.question_id,
                    answer.marks_obtained
                ])?;
            }
        }
        tx.execute(
            "INSERT OR REPLACE INTO submissions
             (user_id, paper_id, total_obtained, submission_date, submitted_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user_id.to_string(),
                paper_id,
                total,
                submission_date,
                submitted_at
            ],
        )?;
        tx.commit()?;

        Ok(total)
    }

    /// Overall score (mean of per-paper percentages) and submission count.
    ///
    /// Each paper counts once regardless of size; zero submissions read as
    /// a 0.0 score.
    pub fn overall_and_count(&self, user_id: &Uuid) -> Result<(f64, i64)> {
        self.conn
            .query_row(
                r#"
                SELECT
                    AVG(CASE WHEN p.total_marks > 0
                        THEN 100.0 * s.total_obtained / p.total_marks
                        ELSE 0.0 END),
                    COUNT(*)
                FROM submissions s
                JOIN papers p ON p.id = s.paper_id
                WHERE s.user_id = ?1
                "#,
                params![user_id.to_string()],
                |row| {
                    let avg: Option<f64> = row.get(0)?;
                    let count: i64 = row.get(1)?;
                    Ok((avg.unwrap_or(0.0), count))
                },
            )
            .map_err(Into::into)
    }

    /// Mark totals grouped by topic, over the user's stored responses.
    pub fn topic_totals(&self, user_id: &Uuid) -> Result<Vec<TopicTotals>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT q.topic, SUM(r.marks_obtained), SUM(q.marks_available)
            FROM responses r
            JOIN questions q ON q.id = r.question_id
            WHERE r.user_id = ?1
            GROUP BY q.topic
            "#,
        )?;
        let rows = stmt.query_map(params![user_id.to_string()], |row| {
            Ok(TopicTotals {
                topic: row.get(0)?,
                obtained: row.get(1)?,
                available: row.get(2)?,
            })
        })?;

        let mut totals = Vec::new();
        for row in rows {
            totals.push(row?);
        }
        Ok(totals)
    }

    /// Mark totals grouped by question type. Untyped questions are skipped.
    pub fn sub_topic_totals(&self, user_id: &Uuid) -> Result<Vec<SubTopicTotals>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT q.sub_topic, SUM(r.marks_obtained), SUM(q.marks_available)
            FROM responses r
            JOIN questions q ON q.id = r.question_id
            WHERE r.user_id = ?1 AND q.sub_topic IS NOT NULL
            GROUP BY q.sub_topic
            "#,
        )?;
        let rows = stmt.query_map(params![user_id.to_string()], |row| {
            Ok(SubTopicTotals {
                sub_topic: row.get(0)?,
                obtained: row.get(1)?,
                available: row.get(2)?,
            })
        })?;

        let mut totals = Vec::new();
        for row in rows {
            totals.push(row?);
        }
        Ok(totals)
    }

    // ========================================================================
    // Streaks
    // ========================================================================

    /// Fetch the user's streak, creating the zero row on first access.
    pub fn streak(&self, user_id: &Uuid) -> Result<StreakRecord> {
        self.require_user(user_id)?;
        self.conn.execute(
            "INSERT OR IGNORE INTO streaks (user_id, current_streak, longest_streak, last_activity_date)
             VALUES (?1, 0, 0, NULL)",
            params![user_id.to_string()],
        )?;
        self.conn
            .query_row(
                "SELECT current_streak, longest_streak, last_activity_date
                 FROM streaks WHERE user_id = ?1",
                params![user_id.to_string()],
                |row| {
                    Ok(StreakRecord {
                        current_streak: row.get(0)?,
                        longest_streak: row.get(1)?,
                        last_activity_date: row.get(2)?,
                    })
                },
            )
            .map_err(Into::into)
    }

    /// Apply a streak transition, guarded against the last-activity date the
    /// decision was computed from. Returns false when another writer got
    /// there first; the caller re-reads and re-decides.
    pub fn apply_streak_transition(
        &self,
        user_id: &Uuid,
        observed_last: Option<NaiveDate>,
        transition: &StreakTransition,
        today: NaiveDate,
    ) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE streaks
             SET current_streak = ?1, longest_streak = ?2, last_activity_date = ?3
             WHERE user_id = ?4 AND last_activity_date IS ?5",
            params![
                transition.current_streak,
                transition.longest_streak,
                today,
                user_id.to_string(),
                observed_last
            ],
        )?;
        Ok(changed == 1)
    }

    // ========================================================================
    // Points
    // ========================================================================

    /// Fetch the user's ledger, creating the zero row on first access.
    pub fn points(&self, user_id: &Uuid) -> Result<PointsAccount> {
        self.require_user(user_id)?;
        self.conn.execute(
            "INSERT OR IGNORE INTO points (user_id, total_points, experience, level)
             VALUES (?1, 0, 0, 1)",
            params![user_id.to_string()],
        )?;
        self.conn
            .query_row(
                "SELECT total_points, experience, level FROM points WHERE user_id = ?1",
                params![user_id.to_string()],
                |row| {
                    Ok(PointsAccount {
                        total_points: row.get(0)?,
                        experience: row.get(1)?,
                        level: row.get(2)?,
                    })
                },
            )
            .map_err(Into::into)
    }

    /// Add a non-negative award to the ledger.
    ///
    /// The accumulators advance by relative arithmetic inside one
    /// transaction, so an award from a second writer on the same database
    /// file is never lost. Level is re-derived from the experience read
    /// back within the same transaction.
    pub fn add_points(&self, user_id: &Uuid, amount: i64) -> Result<PointsUpdate> {
        if amount < 0 {
            return Err(CoreError::validation(
                "amount",
                format!("awards cannot be negative, got {}", amount),
            ));
        }
        self.require_user(user_id)?;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT OR IGNORE INTO points (user_id, total_points, experience, level)
             VALUES (?1, 0, 0, 1)",
            params![user_id.to_string()],
        )?;
        tx.execute(
            "UPDATE points
             SET total_points = total_points + ?1, experience = experience + ?1
             WHERE user_id = ?2",
            params![amount, user_id.to_string()],
        )?;
        let (new_total, new_experience) = tx.query_row(
            "SELECT total_points, experience FROM points WHERE user_id = ?1",
            params![user_id.to_string()],
            |row| {
                let total: i64 = row.get(0)?;
                let experience: i64 = row.get(1)?;
                Ok((total, experience))
            },
        )?;
        let old_level = level_for_experience(new_experience - amount);
        let new_level = level_for_experience(new_experience);
        tx.execute(
            "UPDATE points SET level = ?1 WHERE user_id = ?2",
            params![new_level, user_id.to_string()],
        )?;
        tx.commit()?;

        Ok(PointsUpdate {
            total_points: new_total,
            experience: new_experience,
            level: new_level,
            leveled_up: new_level > old_level,
        })
    }

    // ========================================================================
    // Badges
    // ========================================================================

    /// All badges the user has earned, newest first.
    pub fn badges(&self, user_id: &Uuid) -> Result<Vec<BadgeRecord>> {
        self.require_user(user_id)?;
        let mut stmt = self.conn.prepare(
            "SELECT badge_id, earned_at FROM badges
             WHERE user_id = ?1 ORDER BY earned_at DESC, badge_id ASC",
        )?;
        let rows = stmt.query_map(params![user_id.to_string()], |row| {
            Ok(BadgeRecord {
                badge_id: row.get(0)?,
                earned_at: row.get(1)?,
            })
        })?;

        let mut badges = Vec::new();
        for row in rows {
            badges.push(row?);
        }
        Ok(badges)
    }

    /// Record a badge if not already earned. Returns true only for the
    /// first insert; repeats are silent no-ops.
    pub fn award_badge(
        &self,
        user_id: &Uuid,
        badge_id: &str,
        earned_at: DateTime<Utc>,
    ) -> Result<bool> {
        self.require_user(user_id)?;
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO badges (user_id, badge_id, earned_at) VALUES (?1, ?2, ?3)",
            params![user_id.to_string(), badge_id, earned_at],
        )?;
        Ok(inserted == 1)
    }

    // ========================================================================
    // Leaderboard
    // ========================================================================

    /// Opted-in users by points descending, ties broken by user id
    /// ascending so repeated reads return the same order.
    pub fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardRow>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT u.id, u.username, COALESCE(p.level, 1), COALESCE(p.total_points, 0)
            FROM users u
            LEFT JOIN points p ON p.user_id = u.id
            WHERE u.leaderboard_opt_in = 1
            ORDER BY COALESCE(p.total_points, 0) DESC, u.id ASC
            LIMIT ?1
            "#,
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(LeaderboardRow {
                user_id: uuid_column(row.get::<_, String>(0)?, 0)?,
                username: row.get(1)?,
                level: row.get(2)?,
                total_points: row.get(3)?,
            })
        })?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    // ========================================================================
    // Notifications
    // ========================================================================

    /// Queue a notification row for the external delivery service.
    pub fn insert_notification(&self, user_id: &Uuid, kind: &str, message: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO notifications (id, user_id, kind, message, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                Uuid::new_v4().to_string(),
                user_id.to_string(),
                kind,
                message,
                Utc::now()
            ],
        )?;
        Ok(())
    }

    /// Notifications queued for one user, oldest first.
    pub fn notifications_for(&self, user_id: &Uuid) -> Result<Vec<Notification>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, kind, message, created_at
             FROM notifications WHERE user_id = ?1 ORDER BY created_at ASC",
        )?;
        let rows = stmt.query_map(params![user_id.to_string()], |row| {
            Ok(Notification {
                id: uuid_column(row.get::<_, String>(0)?, 0)?,
                user_id: uuid_column(row.get::<_, String>(1)?, 1)?,
                kind: row.get(2)?,
                message: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?;

        let mut notifications = Vec::new();
        for row in rows {
            notifications.push(row?);
        }
        Ok(notifications)
    }
}

/// Parse a TEXT column back into a Uuid inside a row-mapping closure.
fn uuid_column(value: String, index: usize) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(&value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(index, rusqlite::types::Type::Text, Box::new(e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tally_common::streak;
    use tempfile::NamedTempFile;

    fn test_store() -> (NamedTempFile, Store) {
        let tmp = NamedTempFile::new().unwrap();
        let store = Store::open_at(tmp.path()).unwrap();
        (tmp, store)
    }

    fn seed_user(store: &Store, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        store
            .insert_user(&User {
                id,
                username: name.to_string(),
                leaderboard_opt_in: false,
                created_at: Utc::now(),
            })
            .unwrap();
        id
    }

    fn seed_paper_with_questions(store: &Store) -> i64 {
        store
            .insert_paper(&Paper {
                id: 1,
                board: "AQA".to_string(),
                year: 2025,
                paper_number: 1,
                total_marks: 20,
            })
            .unwrap();
        store
            .insert_question(&Question {
                id: 10,
                paper_id: 1,
                topic: "Algebra".to_string(),
                sub_topic: Some("quadratics".to_string()),
                marks_available: 10,
            })
            .unwrap();
        store
            .insert_question(&Question {
                id: 11,
                paper_id: 1,
                topic: "Calculus".to_string(),
                sub_topic: None,
                marks_available: 10,
            })
            .unwrap();
        1
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_unknown_user_is_not_found() {
        let (_tmp, store) = test_store();
        let ghost = Uuid::new_v4();
        assert!(store.user(&ghost).unwrap().is_none());
        assert!(matches!(
            store.streak(&ghost).unwrap_err(),
            CoreError::NotFound(_)
        ));
        assert!(matches!(
            store.points(&ghost).unwrap_err(),
            CoreError::NotFound(_)
        ));
    }

    #[test]
    fn test_lazy_rows_start_at_zero() {
        let (_tmp, store) = test_store();
        let user = seed_user(&store, "ada");

        let streak = store.streak(&user).unwrap();
        assert_eq!(streak.current_streak, 0);
        assert!(streak.last_activity_date.is_none());

        let points = store.points(&user).unwrap();
        assert_eq!(points.total_points, 0);
        assert_eq!(points.level, 1);

        let plan = store.plan(&user).unwrap();
        assert_eq!(plan.tier, PlanTier::Free);
    }

    #[test]
    fn test_replace_submission_validates_before_writing() {
        let (_tmp, store) = test_store();
        let user = seed_user(&store, "ada");
        let paper = seed_paper_with_questions(&store);
        let today = day(2026, 1, 5);
        let now = Utc::now();

        // Marks above available
        let err = store
            .replace_submission(
                &user,
                paper,
                &[AnswerEntry {
                    question_id: 10,
                    marks_obtained: 11,
                }],
                today,
                now,
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation { .. }));

        // Question from another paper
        let err = store
            .replace_submission(
                &user,
                paper,
                &[AnswerEntry {
                    question_id: 999,
                    marks_obtained: 1,
                }],
                today,
                now,
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation { .. }));

        // Duplicate answer
        let err = store
            .replace_submission(
                &user,
                paper,
                &[
                    AnswerEntry {
                        question_id: 10,
                        marks_obtained: 3,
                    },
                    AnswerEntry {
                        question_id: 10,
                        marks_obtained: 4,
                    },
                ],
                today,
                now,
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation { .. }));

        // Nothing landed
        let (_, count) = store.overall_and_count(&user).unwrap();
        assert_eq!(count, 0);
        assert!(store.topic_totals(&user).unwrap().is_empty());
    }

    #[test]
    fn test_resubmission_replaces_not_appends() {
        let (_tmp, store) = test_store();
        let user = seed_user(&store, "ada");
        let paper = seed_paper_with_questions(&store);
        let now = Utc::now();

        let first = store
            .replace_submission(
                &user,
                paper,
                &[
                    AnswerEntry {
                        question_id: 10,
                        marks_obtained: 4,
                    },
                    AnswerEntry {
                        question_id: 11,
                        marks_obtained: 2,
                    },
                ],
                day(2026, 1, 5),
                now,
            )
            .unwrap();
        assert_eq!(first, 6);

        let second = store
            .replace_submission(
                &user,
                paper,
                &[
                    AnswerEntry {
                        question_id: 10,
                        marks_obtained: 8,
                    },
                    AnswerEntry {
                        question_id: 11,
                        marks_obtained: 6,
                    },
                ],
                day(2026, 1, 6),
                now,
            )
            .unwrap();
        assert_eq!(second, 14);

        let (overall, count) = store.overall_and_count(&user).unwrap();
        assert_eq!(count, 1);
        assert_relative_eq!(overall, 70.0, epsilon = 1e-9);

        let totals = store.topic_totals(&user).unwrap();
        let algebra = totals.iter().find(|t| t.topic == "Algebra").unwrap();
        assert_eq!(algebra.obtained, 8);
        assert_eq!(algebra.available, 10);
    }

    #[test]
    fn test_streak_cas_rejects_stale_writer() {
        let (_tmp, store) = test_store();
        let user = seed_user(&store, "ada");
        let today = day(2026, 1, 5);

        let record = store.streak(&user).unwrap();
        let transition = streak::observe(&record, today).unwrap();

        // First writer wins
        assert!(store
            .apply_streak_transition(&user, record.last_activity_date, &transition, today)
            .unwrap());
        // Second writer computed from the same stale snapshot loses
        assert!(!store
            .apply_streak_transition(&user, record.last_activity_date, &transition, today)
            .unwrap());

        let after = store.streak(&user).unwrap();
        assert_eq!(after.current_streak, 1);
        assert_eq!(after.last_activity_date, Some(today));
    }

    #[test]
    fn test_add_points_levels_up_at_thousand() {
        let (_tmp, store) = test_store();
        let user = seed_user(&store, "ada");

        let first = store.add_points(&user, 999).unwrap();
        assert_eq!(first.level, 1);
        assert!(!first.leveled_up);

        let second = store.add_points(&user, 1).unwrap();
        assert_eq!(second.experience, 1000);
        assert_eq!(second.level, 2);
        assert!(second.leveled_up);

        assert!(matches!(
            store.add_points(&user, -5).unwrap_err(),
            CoreError::Validation { .. }
        ));
    }

    #[test]
    fn test_awards_from_two_handles_share_one_ledger() {
        let tmp = NamedTempFile::new().unwrap();
        let store_a = Store::open_at(tmp.path()).unwrap();
        let store_b = Store::open_at(tmp.path()).unwrap();
        let user = seed_user(&store_a, "ada");

        let first = store_a.add_points(&user, 600).unwrap();
        assert_eq!(first.total_points, 600);
        assert!(!first.leveled_up);

        // A second daemon on the same database file extends the ledger
        // rather than overwriting it.
        let second = store_b.add_points(&user, 500).unwrap();
        assert_eq!(second.total_points, 1100);
        assert_eq!(second.experience, 1100);
        assert_eq!(second.level, 2);
        assert!(second.leveled_up);

        let third = store_a.add_points(&user, 42).unwrap();
        assert_eq!(third.total_points, 1142);
        assert_eq!(third.level, 2);
        assert!(!third.leveled_up);

        let account = store_b.points(&user).unwrap();
        assert_eq!(account.total_points, 1142);
        assert_eq!(account.level, 2);
    }

    #[test]
    fn test_badge_award_is_idempotent() {
        let (_tmp, store) = test_store();
        let user = seed_user(&store, "ada");
        let now = Utc::now();

        assert!(store.award_badge(&user, "first_paper", now).unwrap());
        assert!(!store.award_badge(&user, "first_paper", now).unwrap());
        assert_eq!(store.badges(&user).unwrap().len(), 1);
    }

    #[test]
    fn test_leaderboard_order_and_opt_in() {
        let (_tmp, store) = test_store();
        let a = seed_user(&store, "ada");
        let b = seed_user(&store, "brian");
        let c = seed_user(&store, "carol");
        let hidden = seed_user(&store, "dora");

        store.set_leaderboard_opt_in(&a, true).unwrap();
        store.set_leaderboard_opt_in(&b, true).unwrap();
        store.set_leaderboard_opt_in(&c, true).unwrap();
        // dora never opts in but outscores everyone
        store.add_points(&hidden, 9000).unwrap();

        store.add_points(&a, 300).unwrap();
        store.add_points(&b, 500).unwrap();
        store.add_points(&c, 300).unwrap();

        let rows = store.leaderboard(50).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].username, "brian");
        // a and c tie at 300; user id ascending decides
        let tie_ids: Vec<Uuid> = rows[1..].iter().map(|r| r.user_id).collect();
        let mut expected = vec![a, c];
        expected.sort_by_key(|id| id.to_string());
        assert_eq!(tie_ids, expected);

        let capped = store.leaderboard(1).unwrap();
        assert_eq!(capped.len(), 1);
    }

    #[test]
    fn test_notifications_round_trip() {
        let (_tmp, store) = test_store();
        let user = seed_user(&store, "ada");

        store
            .insert_notification(&user, "level_up", "Level up! You reached level 2")
            .unwrap();
        let rows = store.notifications_for(&user).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].kind, "level_up");
    }
}
