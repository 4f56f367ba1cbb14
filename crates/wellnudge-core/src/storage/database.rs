//! SQLite persistence for the notification engine.
//!
//! Provides persistent storage for:
//! - Goals, their progress entries, and recommendations (status fields the
//!   response router mutates)
//! - Per-category streak records
//! - Hour-of-day response samples
//! - Key-value store for preferences

use chrono::{NaiveDate, NaiveDateTime};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use super::{data_dir, migrations};
use crate::error::{DatabaseError, Result};
use crate::gate::Preferences;
use crate::personalization::ResponsePatternHistory;
use crate::streak::{StreakAdvance, StreakRecord};

const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";
const PREFERENCES_KEY: &str = "notification_preferences";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalStatus {
    Active,
    Completed,
    Skipped,
}

impl GoalStatus {
    fn as_str(self) -> &'static str {
        match self {
            GoalStatus::Active => "active",
            GoalStatus::Completed => "completed",
            GoalStatus::Skipped => "skipped",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "completed" => GoalStatus::Completed,
            "skipped" => GoalStatus::Skipped,
            _ => GoalStatus::Active,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationStatus {
    Pending,
    Accepted,
    Declined,
    Viewed,
}

impl RecommendationStatus {
    fn as_str(self) -> &'static str {
        match self {
            RecommendationStatus::Pending => "pending",
            RecommendationStatus::Accepted => "accepted",
            RecommendationStatus::Declined => "declined",
            RecommendationStatus::Viewed => "viewed",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "accepted" => RecommendationStatus::Accepted,
            "declined" => RecommendationStatus::Declined,
            "viewed" => RecommendationStatus::Viewed,
            _ => RecommendationStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalRecord {
    pub id: String,
    pub title: String,
    pub category: String,
    pub status: GoalStatus,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub id: String,
    pub goal_id: String,
    pub recorded_at: NaiveDateTime,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationRecord {
    pub id: String,
    pub title: String,
    pub category: String,
    pub status: RecommendationStatus,
    pub updated_at: NaiveDateTime,
}

/// SQLite database for engine state.
///
/// The connection sits behind a mutex so the database can be shared
/// between the scheduler and the response router.
pub struct Database {
    conn: Mutex<Connection>,
}

fn fmt_datetime(at: NaiveDateTime) -> String {
    at.format(DATETIME_FORMAT).to_string()
}

fn parse_datetime(raw: &str) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_date(raw: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

impl Database {
    /// Open the database at `~/.config/wellnudge/wellnudge.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("wellnudge.db");
        Self::open_at(&path)
    }

    /// Open (or create) a database file at `path`.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        migrations::migrate(&conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    // ── key-value ────────────────────────────────────────────────────────

    pub fn kv_get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    pub fn kv_set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.lock().execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn load_preferences(&self) -> Result<Option<Preferences>> {
        match self.kv_get(PREFERENCES_KEY)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub fn save_preferences(&self, prefs: &Preferences) -> Result<()> {
        let json = serde_json::to_string(prefs)?;
        self.kv_set(PREFERENCES_KEY, &json)
    }

    // ── goals ────────────────────────────────────────────────────────────

    /// Insert or replace a goal.
    pub fn upsert_goal(&self, goal: &GoalRecord) -> Result<()> {
        self.conn.lock().execute(
            "INSERT INTO goals (id, title, category, status, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                category = excluded.category,
                status = excluded.status,
                updated_at = excluded.updated_at",
            params![
                goal.id,
                goal.title,
                goal.category,
                goal.status.as_str(),
                fmt_datetime(goal.updated_at),
            ],
        )?;
        Ok(())
    }

    pub fn goal(&self, id: &str) -> Result<Option<GoalRecord>> {
        let conn = self.conn.lock();
        let goal = conn
            .query_row(
                "SELECT id, title, category, status, updated_at FROM goals WHERE id = ?1",
                [id],
                |row| {
                    Ok(GoalRecord {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        category: row.get(2)?,
                        status: GoalStatus::parse(&row.get::<_, String>(3)?),
                        updated_at: parse_datetime(&row.get::<_, String>(4)?)?,
                    })
                },
            )
            .optional()?;
        Ok(goal)
    }

    /// Update a goal's status. Returns false when the goal does not exist.
    pub fn set_goal_status(&self, id: &str, status: GoalStatus, at: NaiveDateTime) -> Result<bool> {
        let changed = self.conn.lock().execute(
            "UPDATE goals SET status = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, status.as_str(), fmt_datetime(at)],
        )?;
        Ok(changed > 0)
    }

    pub fn add_progress_entry(&self, goal_id: &str, at: NaiveDateTime, note: &str) -> Result<ProgressEntry> {
        let entry = ProgressEntry {
            id: uuid::Uuid::new_v4().to_string(),
            goal_id: goal_id.to_string(),
            recorded_at: at,
            note: note.to_string(),
        };
        self.conn.lock().execute(
            "INSERT INTO progress_entries (id, goal_id, recorded_at, note) VALUES (?1, ?2, ?3, ?4)",
            params![entry.id, entry.goal_id, fmt_datetime(at), entry.note],
        )?;
        Ok(entry)
    }

    pub fn progress_entries(&self, goal_id: &str) -> Result<Vec<ProgressEntry>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, goal_id, recorded_at, note FROM progress_entries
             WHERE goal_id = ?1 ORDER BY recorded_at",
        )?;
        let rows = stmt.query_map([goal_id], |row| {
            Ok(ProgressEntry {
                id: row.get(0)?,
                goal_id: row.get(1)?,
                recorded_at: parse_datetime(&row.get::<_, String>(2)?)?,
                note: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // ── recommendations ──────────────────────────────────────────────────

    pub fn upsert_recommendation(&self, rec: &RecommendationRecord) -> Result<()> {
        self.conn.lock().execute(
            "INSERT INTO recommendations (id, title, category, status, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                category = excluded.category,
                status = excluded.status,
                updated_at = excluded.updated_at",
            params![
                rec.id,
                rec.title,
                rec.category,
                rec.status.as_str(),
                fmt_datetime(rec.updated_at),
            ],
        )?;
        Ok(())
    }

    pub fn recommendation(&self, id: &str) -> Result<Option<RecommendationRecord>> {
        let conn = self.conn.lock();
        let rec = conn
            .query_row(
                "SELECT id, title, category, status, updated_at FROM recommendations WHERE id = ?1",
                [id],
                |row| {
                    Ok(RecommendationRecord {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        category: row.get(2)?,
                        status: RecommendationStatus::parse(&row.get::<_, String>(3)?),
                        updated_at: parse_datetime(&row.get::<_, String>(4)?)?,
                    })
                },
            )
            .optional()?;
        Ok(rec)
    }

    /// Update a recommendation's status. Returns false when it does not exist.
    pub fn set_recommendation_status(
        &self,
        id: &str,
        status: RecommendationStatus,
        at: NaiveDateTime,
    ) -> Result<bool> {
        let changed = self.conn.lock().execute(
            "UPDATE recommendations SET status = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, status.as_str(), fmt_datetime(at)],
        )?;
        Ok(changed > 0)
    }

    // ── streaks ──────────────────────────────────────────────────────────

    pub fn streak(&self, category: &str) -> Result<Option<StreakRecord>> {
        let conn = self.conn.lock();
        Ok(Self::read_streak(&conn, category)?)
    }

    pub fn streaks(&self) -> Result<Vec<StreakRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT category, current_count, longest_count, last_updated
             FROM streaks ORDER BY category",
        )?;
        let rows = stmt.query_map([], Self::streak_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Apply a completion to the category's streak atomically.
    ///
    /// The read and the write happen in one transaction under the connection
    /// lock, so concurrent completions in one category serialize.
    pub fn advance_streak(&self, category: &str, today: NaiveDate) -> Result<StreakAdvance> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let existing = Self::read_streak(&tx, category)?;
        let advance = StreakRecord::advance(existing, category, today);

        if !matches!(advance, StreakAdvance::Unchanged(_)) {
            let record = advance.record();
            tx.execute(
                "INSERT INTO streaks (category, current_count, longest_count, last_updated)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(category) DO UPDATE SET
                    current_count = excluded.current_count,
                    longest_count = excluded.longest_count,
                    last_updated = excluded.last_updated",
                params![
                    record.category,
                    record.current_count,
                    record.longest_count,
                    record.last_updated.format(DATE_FORMAT).to_string(),
                ],
            )?;
        }
        tx.commit()?;
        Ok(advance)
    }

    /// Overwrite a streak record (imports and tests).
    pub fn put_streak(&self, record: &StreakRecord) -> Result<()> {
        self.conn.lock().execute(
            "INSERT OR REPLACE INTO streaks (category, current_count, longest_count, last_updated)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                record.category,
                record.current_count.max(1),
                record.longest_count,
                record.last_updated.format(DATE_FORMAT).to_string(),
            ],
        )?;
        Ok(())
    }

    fn read_streak(conn: &Connection, category: &str) -> rusqlite::Result<Option<StreakRecord>> {
        conn.query_row(
            "SELECT category, current_count, longest_count, last_updated
             FROM streaks WHERE category = ?1",
            [category],
            Self::streak_from_row,
        )
        .optional()
    }

    fn streak_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StreakRecord> {
        Ok(StreakRecord {
            category: row.get(0)?,
            current_count: row.get(1)?,
            longest_count: row.get(2)?,
            last_updated: parse_date(&row.get::<_, String>(3)?)?,
        })
    }

    // ── response samples ─────────────────────────────────────────────────

    pub fn insert_response_sample(&self, key: &str, hour: u8, at: NaiveDateTime) -> Result<()> {
        self.conn.lock().execute(
            "INSERT INTO response_samples (key, hour, recorded_at) VALUES (?1, ?2, ?3)",
            params![key, hour, fmt_datetime(at)],
        )?;
        Ok(())
    }

    /// Load every sample, grouped by key in insertion order.
    pub fn load_response_history(&self) -> Result<ResponsePatternHistory> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT key, hour FROM response_samples ORDER BY id")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, u8>(1)?)))?;

        let mut samples: BTreeMap<String, Vec<u8>> = BTreeMap::new();
        for row in rows {
            let (key, hour) = row?;
            samples.entry(key).or_default().push(hour);
        }
        Ok(ResponsePatternHistory::from_samples(samples))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 7, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn goal_status_updates() {
        let db = Database::open_memory().unwrap();
        db.upsert_goal(&GoalRecord {
            id: "g1".into(),
            title: "Drink water".into(),
            category: "hydration".into(),
            status: GoalStatus::Active,
            updated_at: at(1, 8),
        })
        .unwrap();

        assert!(db.set_goal_status("g1", GoalStatus::Completed, at(1, 9)).unwrap());
        assert!(!db.set_goal_status("missing", GoalStatus::Completed, at(1, 9)).unwrap());
        let goal = db.goal("g1").unwrap().unwrap();
        assert_eq!(goal.status, GoalStatus::Completed);
        assert_eq!(goal.updated_at, at(1, 9));
    }

    #[test]
    fn progress_entries_are_listed_in_order() {
        let db = Database::open_memory().unwrap();
        db.upsert_goal(&GoalRecord {
            id: "g1".into(),
            title: "Stretch".into(),
            category: "mobility".into(),
            status: GoalStatus::Active,
            updated_at: at(1, 8),
        })
        .unwrap();
        db.add_progress_entry("g1", at(2, 8), "").unwrap();
        db.add_progress_entry("g1", at(1, 8), "first").unwrap();
        let entries = db.progress_entries("g1").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].note, "first");
    }

    #[test]
    fn recommendation_status_updates() {
        let db = Database::open_memory().unwrap();
        db.upsert_recommendation(&RecommendationRecord {
            id: "r1".into(),
            title: "Wind down earlier".into(),
            category: "Sleep".into(),
            status: RecommendationStatus::Pending,
            updated_at: at(1, 8),
        })
        .unwrap();
        assert!(db
            .set_recommendation_status("r1", RecommendationStatus::Accepted, at(1, 21))
            .unwrap());
        assert_eq!(
            db.recommendation("r1").unwrap().unwrap().status,
            RecommendationStatus::Accepted
        );
    }

    #[test]
    fn advance_streak_persists_transitions() {
        let db = Database::open_memory().unwrap();
        let d1 = at(1, 0).date();
        let d2 = at(2, 0).date();

        assert!(matches!(db.advance_streak("yoga", d1).unwrap(), StreakAdvance::Started(_)));
        assert!(matches!(db.advance_streak("yoga", d1).unwrap(), StreakAdvance::Unchanged(_)));
        assert!(matches!(db.advance_streak("yoga", d2).unwrap(), StreakAdvance::Extended(_)));

        let record = db.streak("yoga").unwrap().unwrap();
        assert_eq!(record.current_count, 2);
        assert_eq!(record.longest_count, 2);
        assert_eq!(record.last_updated, d2);
        assert_eq!(db.streaks().unwrap().len(), 1);
    }

    #[test]
    fn preferences_round_trip_through_kv() {
        let db = Database::open_memory().unwrap();
        assert!(db.load_preferences().unwrap().is_none());
        let mut prefs = Preferences::default();
        prefs.categories.insert("marketing".into(), true);
        db.save_preferences(&prefs).unwrap();
        assert_eq!(db.load_preferences().unwrap(), Some(prefs));
    }

    #[test]
    fn response_history_groups_by_key() {
        let db = Database::open_memory().unwrap();
        db.insert_response_sample("a", 8, at(1, 8)).unwrap();
        db.insert_response_sample("b", 21, at(1, 21)).unwrap();
        db.insert_response_sample("a", 9, at(2, 9)).unwrap();
        let history = db.load_response_history().unwrap();
        assert_eq!(history.samples("a"), &[8, 9]);
        assert_eq!(history.samples("b"), &[21]);
    }
}
