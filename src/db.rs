//! Database module for Wally
//!
//! Provides persistence for learned knowledge entries.

mod schema;

pub use schema::*;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Failed to encode parameters: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Write abandoned by its caller before commit")]
    Abandoned,
}

pub type DbResult<T> = Result<T, DbError>;

const GATE_PENDING: u8 = 0;
const GATE_COMMITTING: u8 = 1;
const GATE_ABANDONED: u8 = 2;

/// One-shot decision between a blocking writer and the caller waiting on it.
///
/// Whichever side moves first wins: the writer claims the commit, or the
/// caller abandons the write. A write whose caller gave up is rolled back.
#[derive(Debug, Default)]
pub struct CommitGate(AtomicU8);

impl CommitGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writer side. `false` means the caller already gave up.
    pub fn try_commit(&self) -> bool {
        self.0
            .compare_exchange(GATE_PENDING, GATE_COMMITTING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Caller side. `false` means the writer is already committing.
    pub fn try_abandon(&self) -> bool {
        self.0
            .compare_exchange(GATE_PENDING, GATE_ABANDONED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // SQLite rolls back an interrupted statement, so a poisoned lock is still usable
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn run_migrations(&self) -> DbResult<()> {
        let conn = self.lock();
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    // ==================== Knowledge Operations ====================

    /// Append a knowledge entry, stamping it with the current time.
    ///
    /// The row is committed only if `gate` still allows it once the insert
    /// has run; otherwise the transaction is rolled back.
    pub fn insert_knowledge(
        &self,
        entry: &NewKnowledgeEntry,
        gate: &CommitGate,
    ) -> DbResult<KnowledgeEntry> {
        let mut conn = self.lock();
        let now = Utc::now();
        let params_json = serde_json::to_string(&entry.resulting_parameters)?;
        let clarification =
            (!entry.clarification_query.is_empty()).then_some(entry.clarification_query.as_str());

        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO knowledge_entries (user_id, original_query, clarification_query, resulting_action, resulting_parameters, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.user_id,
                entry.original_query,
                clarification,
                entry.resulting_action,
                params_json,
                format_datetime(&now),
            ],
        )?;
        let id = tx.last_insert_rowid();

        if !gate.try_commit() {
            tx.rollback()?;
            return Err(DbError::Abandoned);
        }
        tx.commit()?;

        Ok(KnowledgeEntry {
            id,
            user_id: entry.user_id.clone(),
            original_query: entry.original_query.clone(),
            clarification_query: entry.clarification_query.clone(),
            resulting_action: entry.resulting_action.clone(),
            resulting_parameters: entry.resulting_parameters.clone(),
            timestamp: now,
        })
    }

    /// Most recent entries for a user, newest first
    pub fn recent_knowledge(&self, user_id: &str, limit: usize) -> DbResult<Vec<KnowledgeEntry>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, original_query, clarification_query, resulting_action, resulting_parameters, timestamp
             FROM knowledge_entries
             WHERE user_id = ?1
             ORDER BY timestamp DESC, id DESC
             LIMIT ?2",
        )?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![user_id, limit], parse_knowledge_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// Count entries stored for a user
    #[allow(dead_code)] // Used in tests
    pub fn count_knowledge(&self, user_id: &str) -> DbResult<i64> {
        let conn = self.lock();
        conn.query_row(
            "SELECT COUNT(*) FROM knowledge_entries WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .map_err(DbError::from)
    }
}

/// Parse a knowledge row from the database
fn parse_knowledge_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<KnowledgeEntry> {
    let id: i64 = row.get(0)?;
    let params_json: String = row.get(5)?;
    let resulting_parameters = serde_json::from_str(&params_json).unwrap_or_else(|e| {
        tracing::warn!(entry_id = id, error = %e, "Undecodable knowledge parameters, using empty map");
        Parameters::new()
    });

    Ok(KnowledgeEntry {
        id,
        user_id: row.get(1)?,
        original_query: row.get(2)?,
        clarification_query: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        resulting_action: row.get(4)?,
        resulting_parameters,
        timestamp: parse_datetime(&row.get::<_, String>(6)?),
    })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
