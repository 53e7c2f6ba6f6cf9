//! SQLite storage layer -- the append-only event log.

pub mod schema;

use anyhow::Result;
use r2d2::Pool as R2D2Pool;
use r2d2_sqlite::SqliteConnectionManager;
use serde::{Deserialize, Serialize};

/// Connection Pool type
pub type Pool = R2D2Pool<SqliteConnectionManager>;

/// Open (or create) the SQLite database and return a connection pool.
pub fn open_pool(path: &str) -> Result<Pool> {
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let manager = SqliteConnectionManager::file(path).with_init(|c| {
        c.execute_batch(
            "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA temp_store = MEMORY;
                 PRAGMA busy_timeout = 5000;",
        )
    });

    let pool = R2D2Pool::new(manager)?;

    // Run migrations on a single connection
    let conn = pool.get()?;
    schema::migrate(&conn)?;

    Ok(pool)
}

/// Open an in-memory database, for tests and one-shot CLI runs.
pub fn open_memory_pool() -> Result<Pool> {
    let manager = SqliteConnectionManager::memory();
    let pool = R2D2Pool::builder().max_size(1).build(manager)?;
    let conn = pool.get()?;
    schema::migrate(&conn)?;
    Ok(pool)
}

/// Category of a scored event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Drift,
    Secret,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Drift => "drift",
            EventKind::Secret => "secret",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the append-only event log, as returned to API callers.
/// The `details` payload is intentionally not exposed on the list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRow {
    pub id: i64,
    pub ts: i64,
    pub kind: String,
    pub score: f64,
}

/// Append one scored event. A single atomic insert; rows are never updated
/// or deleted afterwards.
pub fn append_event(pool: &Pool, kind: EventKind, details: &str, score: f64) -> Result<i64> {
    let conn = pool.get()?;
    let ts = chrono::Utc::now().timestamp();

    conn.execute(
        "INSERT INTO events (ts, kind, details, score) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![ts, kind.as_str(), details, score],
    )?;

    Ok(conn.last_insert_rowid())
}

/// Fetch the most recent events, newest first.
pub fn recent_events(pool: &Pool, limit: usize) -> Result<Vec<EventRow>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT id, ts, kind, score FROM events ORDER BY ts DESC, id DESC LIMIT ?1",
    )?;

    let rows = stmt.query_map([limit], |row| {
        Ok(EventRow {
            id: row.get(0)?,
            ts: row.get(1)?,
            kind: row.get(2)?,
            score: row.get(3)?,
        })
    })?;

    let mut events = Vec::new();
    for r in rows {
        events.push(r?);
    }
    Ok(events)
}

/// Total number of persisted events. Used by tests and the CLI.
pub fn count_events(pool: &Pool) -> Result<i64> {
    let conn = pool.get()?;
    let count = conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_list_newest_first() {
        let pool = open_memory_pool().unwrap();

        let first = append_event(&pool, EventKind::Drift, "{\"features\":[1,2,3]}", 0.2).unwrap();
        let second = append_event(&pool, EventKind::Secret, "diff text", 0.4).unwrap();
        assert!(second > first);

        let events = recent_events(&pool, 200).unwrap();
        assert_eq!(events.len(), 2);
        // Same-second inserts fall back to id ordering
        assert_eq!(events[0].id, second);
        assert_eq!(events[0].kind, "secret");
        assert_eq!(events[0].score, 0.4);
        assert_eq!(events[1].kind, "drift");
    }

    #[test]
    fn test_limit_is_honored() {
        let pool = open_memory_pool().unwrap();
        for i in 0..5 {
            append_event(&pool, EventKind::Drift, "{}", i as f64 / 10.0).unwrap();
        }
        let events = recent_events(&pool, 3).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(count_events(&pool).unwrap(), 5);
    }
}
