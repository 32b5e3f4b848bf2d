//! Database module - SQLite cache of synced workouts

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, params};

use crate::exercises::MuscleGroupMap;
use crate::models::{ExerciseEntry, ExerciseTemplate, Session, SetRecord};

/// Database wrapper
pub struct Database {
    conn: Connection,
}

/// Fixed-width UTC timestamps so text ordering matches time ordering
fn to_db_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn from_db_time(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Flat row of the `sets` join, before regrouping into sessions
struct SetRow {
    session_id: String,
    exercise_idx: i64,
    exercise: String,
    template_id: Option<String>,
    set: SetRecord,
}

impl Database {
    /// Open or create database
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "PRAGMA foreign_keys = ON;
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                title TEXT,
                started_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS sets (
                session_id TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
                exercise_idx INTEGER NOT NULL,
                exercise TEXT NOT NULL,
                template_id TEXT,
                set_idx INTEGER NOT NULL,
                weight_kg REAL,
                reps INTEGER,
                rpe REAL,
                duration_secs INTEGER,
                PRIMARY KEY (session_id, exercise_idx, set_idx)
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_started_at ON sessions(started_at);
            CREATE TABLE IF NOT EXISTS exercise_templates (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                primary_muscle_group TEXT,
                secondary_muscle_groups TEXT NOT NULL DEFAULT '[]'
            );
            CREATE TABLE IF NOT EXISTS sync_state (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    /// Insert a session, replacing any stored copy with the same id
    pub fn upsert_session(&self, session: &Session) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        tx.execute("DELETE FROM sets WHERE session_id = ?1", params![session.id])?;
        tx.execute(
            "INSERT INTO sessions (id, title, started_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET title = excluded.title, started_at = excluded.started_at",
            params![session.id, session.title, to_db_time(session.started_at)],
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO sets (session_id, exercise_idx, exercise, template_id, set_idx, weight_kg, reps, rpe, duration_secs)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for (ex_idx, exercise) in session.exercises.iter().enumerate() {
                for (set_idx, set) in exercise.sets.iter().enumerate() {
                    stmt.execute(params![
                        session.id,
                        ex_idx as i64,
                        exercise.name,
                        exercise.template_id,
                        set_idx as i64,
                        set.weight_kg,
                        set.reps,
                        set.rpe,
                        set.duration_secs,
                    ])?;
                }
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Remove a session and its sets; returns whether it existed
    pub fn delete_session(&self, id: &str) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM sets WHERE session_id = ?1", params![id])?;
        let removed = tx.execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(removed > 0)
    }

    /// Store a batch; returns how many sessions were written
    pub fn upsert_sessions(&self, sessions: &[Session]) -> Result<usize> {
        for session in sessions {
            self.upsert_session(session)?;
        }
        Ok(sessions.len())
    }

    /// Sessions in chronological order, optionally only those started at or after `since`
    pub fn get_sessions(&self, since: Option<DateTime<Utc>>) -> Result<Vec<Session>> {
        let since = since.map(to_db_time).unwrap_or_default();

        let mut stmt = self.conn.prepare(
            "SELECT id, title, started_at FROM sessions WHERE started_at >= ?1 ORDER BY started_at ASC, id ASC",
        )?;
        let mut sessions = stmt
            .query_map(params![since], |row| {
                let started_at: String = row.get(2)?;
                Ok(Session {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    started_at: from_db_time(2, &started_at)?,
                    exercises: Vec::new(),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = self.conn.prepare(
            "SELECT s.session_id, s.exercise_idx, s.exercise, s.template_id, s.weight_kg, s.reps, s.rpe, s.duration_secs
             FROM sets s JOIN sessions w ON w.id = s.session_id
             WHERE w.started_at >= ?1
             ORDER BY s.session_id, s.exercise_idx, s.set_idx",
        )?;
        let rows = stmt
            .query_map(params![since], |row| {
                Ok(SetRow {
                    session_id: row.get(0)?,
                    exercise_idx: row.get(1)?,
                    exercise: row.get(2)?,
                    template_id: row.get(3)?,
                    set: SetRecord {
                        weight_kg: row.get(4)?,
                        reps: row.get(5)?,
                        rpe: row.get(6)?,
                        duration_secs: row.get(7)?,
                    },
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut by_session: BTreeMap<String, Vec<ExerciseEntry>> = BTreeMap::new();
        let mut last_key: Option<(String, i64)> = None;
        for row in rows {
            let entries = by_session.entry(row.session_id.clone()).or_default();
            let key = (row.session_id, row.exercise_idx);
            if last_key.as_ref() != Some(&key) {
                entries.push(ExerciseEntry {
                    name: row.exercise,
                    template_id: row.template_id,
                    sets: Vec::new(),
                });
                last_key = Some(key);
            }
            if let Some(entry) = entries.last_mut() {
                entry.sets.push(row.set);
            }
        }

        for session in &mut sessions {
            if let Some(exercises) = by_session.remove(&session.id) {
                session.exercises = exercises;
            }
        }

        Ok(sessions)
    }

    /// Start time of the most recent stored session
    pub fn latest_session_start(&self) -> Result<Option<DateTime<Utc>>> {
        let raw: Option<String> = self
            .conn
            .query_row("SELECT MAX(started_at) FROM sessions", [], |row| row.get(0))
            .optional()?
            .flatten();
        Ok(raw.map(|r| from_db_time(0, &r)).transpose()?)
    }

    /// Replace the stored exercise templates
    pub fn replace_templates(&self, templates: &[ExerciseTemplate]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM exercise_templates", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO exercise_templates (id, title, primary_muscle_group, secondary_muscle_groups)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for t in templates {
                stmt.execute(params![
                    t.id,
                    t.title,
                    t.primary_muscle_group,
                    serde_json::to_string(&t.secondary_muscle_groups)?,
                ])?;
            }
        }
        tx.commit()?;
        Ok(templates.len())
    }

    pub fn get_templates(&self) -> Result<Vec<ExerciseTemplate>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, primary_muscle_group, secondary_muscle_groups FROM exercise_templates ORDER BY id",
        )?;
        let templates = stmt
            .query_map([], |row| {
                let secondary: String = row.get(3)?;
                Ok(ExerciseTemplate {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    primary_muscle_group: row.get(2)?,
                    secondary_muscle_groups: serde_json::from_str(&secondary)
                        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(templates)
    }

    pub fn template_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM exercise_templates", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// `base` plus whatever the stored templates add on top of it
    pub fn muscle_map(&self, base: MuscleGroupMap) -> Result<MuscleGroupMap> {
        let mut map = base;
        map.extend_missing(&MuscleGroupMap::from_templates(&self.get_templates()?));
        Ok(map)
    }

    /// When the last successful sync started
    pub fn last_sync(&self) -> Result<Option<DateTime<Utc>>> {
        let raw: Option<String> = self
            .conn
            .query_row("SELECT value FROM sync_state WHERE key = 'last_sync'", [], |row| row.get(0))
            .optional()?;
        Ok(raw.map(|r| from_db_time(0, &r)).transpose()?)
    }

    pub fn set_last_sync(&self, at: DateTime<Utc>) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sync_state (key, value) VALUES ('last_sync', ?1)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![to_db_time(at)],
        )?;
        Ok(())
    }

    pub fn session_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 18, 0, 0).unwrap() + Duration::days(n)
    }

    fn create_session(id: &str, days: i64) -> Session {
        let mut session = Session::new(
            id,
            day(days),
            vec![
                ExerciseEntry::new("Squat", vec![SetRecord::weighted(100.0, 5), SetRecord::weighted(105.0, 3)]),
                ExerciseEntry::new("Pull Up", vec![SetRecord::bodyweight(8)]),
            ],
        );
        session.title = Some(format!("Session {}", id));
        session
    }

    #[test]
    fn test_roundtrip_session() {
        let db = Database::open(":memory:").unwrap();
        let session = create_session("a", 0);
        db.upsert_session(&session).unwrap();

        let stored = db.get_sessions(None).unwrap();
        assert_eq!(stored, vec![session]);
    }

    #[test]
    fn test_upsert_replaces_sets() {
        let db = Database::open(":memory:").unwrap();
        let mut session = create_session("a", 0);
        db.upsert_session(&session).unwrap();

        session.exercises.truncate(1);
        session.exercises[0].sets.push(SetRecord::weighted(110.0, 1));
        db.upsert_session(&session).unwrap();

        let stored = db.get_sessions(None).unwrap();
        assert_eq!(db.session_count().unwrap(), 1);
        assert_eq!(stored[0].exercises.len(), 1);
        assert_eq!(stored[0].exercises[0].sets.len(), 3);
    }

    #[test]
    fn test_get_sessions_ordered_and_filtered() {
        let db = Database::open(":memory:").unwrap();
        db.upsert_sessions(&[create_session("c", 10), create_session("a", 0), create_session("b", 5)])
            .unwrap();

        let all = db.get_sessions(None).unwrap();
        let ids: Vec<_> = all.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);

        let recent = db.get_sessions(Some(day(5))).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, "b");
    }

    #[test]
    fn test_latest_session_start() {
        let db = Database::open(":memory:").unwrap();
        assert_eq!(db.latest_session_start().unwrap(), None);

        db.upsert_sessions(&[create_session("a", 0), create_session("b", 5)]).unwrap();
        assert_eq!(db.latest_session_start().unwrap(), Some(day(5)));
    }

    #[test]
    fn test_empty_session_kept() {
        let db = Database::open(":memory:").unwrap();
        db.upsert_session(&Session::new("empty", day(0), Vec::new())).unwrap();

        let stored = db.get_sessions(None).unwrap();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].exercises.is_empty());
    }

    #[test]
    fn test_delete_session() {
        let db = Database::open(":memory:").unwrap();
        db.upsert_sessions(&[create_session("a", 0), create_session("b", 5)]).unwrap();

        assert!(db.delete_session("a").unwrap());
        assert!(!db.delete_session("a").unwrap());

        let stored = db.get_sessions(None).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, "b");
        let orphans: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM sets WHERE session_id = 'a'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[test]
    fn test_templates_feed_muscle_map() {
        let db = Database::open(":memory:").unwrap();
        let templates = vec![ExerciseTemplate {
            id: "D04AC939".to_string(),
            title: "Pendulum Squat (Machine)".to_string(),
            primary_muscle_group: Some("quadriceps".to_string()),
            secondary_muscle_groups: vec!["glutes".to_string()],
        }];
        db.replace_templates(&templates).unwrap();

        assert_eq!(db.template_count().unwrap(), 1);
        assert_eq!(db.get_templates().unwrap(), templates);

        let map = db.muscle_map(MuscleGroupMap::builtin()).unwrap();
        assert_eq!(
            map.classify("Renamed", Some("D04AC939")),
            &[crate::exercises::MuscleGroup::Quads, crate::exercises::MuscleGroup::Glutes]
        );
    }

    #[test]
    fn test_last_sync() {
        let db = Database::open(":memory:").unwrap();
        assert_eq!(db.last_sync().unwrap(), None);

        db.set_last_sync(day(1)).unwrap();
        db.set_last_sync(day(2)).unwrap();
        assert_eq!(db.last_sync().unwrap(), Some(day(2)));
    }
}
