//! Relational store implementation using SQLite.
//!
//! Persists transcripts and their normalized entities: participants (shared
//! across transcripts, keyed by email), topics (keyed by name), and the
//! transcript-owned action items and decisions. Link tables are idempotent
//! and child rows carry content-scoped idempotency keys, so the whole
//! ingestion write set is safe to repeat.

mod analytics_ops;
mod ingest_ops;
mod query_ops;

pub use analytics_ops::{ParticipantStat, SentimentTrendPoint, TopicStat};
pub use ingest_ops::{IngestedTranscript, PendingEmbedding};
pub use query_ops::TranscriptFilter;

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, OpenFlags};
use tracing::{debug, info};

use crate::error::Result;

/// Current schema version.
const SCHEMA_VERSION: i32 = 1;

/// Relational store backed by SQLite.
///
/// Uses WAL mode for concurrent reads. All access goes through a
/// `Mutex<Connection>`; no lock is held across await points by callers.
pub struct RelationalStore {
    pub(crate) conn: Mutex<Connection>,
}

impl std::fmt::Debug for RelationalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationalStore").finish_non_exhaustive()
    }
}

impl RelationalStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|_| {
                    crate::error::StoreError::Database(rusqlite::Error::InvalidPath(
                        path.to_path_buf(),
                    ))
                })?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
        )?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize()?;

        info!("Relational store opened at {:?}", path);
        Ok(store)
    }

    /// Create an in-memory store (useful for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize()?;
        Ok(store)
    }

    fn initialize(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        self.create_schema(&conn)
    }

    fn create_schema(&self, conn: &Connection) -> Result<()> {
        let current_version: i32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap_or(0);

        if current_version >= SCHEMA_VERSION {
            debug!("Schema up to date (version {})", current_version);
            return Ok(());
        }

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS transcripts (
                id INTEGER PRIMARY KEY,
                transcript_id TEXT NOT NULL UNIQUE,
                title TEXT NOT NULL,
                occurred_at TEXT NOT NULL,
                duration_minutes REAL NOT NULL,
                transcript_text TEXT NOT NULL,
                metadata TEXT NOT NULL DEFAULT '{}',
                sentiment TEXT NOT NULL DEFAULT 'neutral',
                summary TEXT NOT NULL DEFAULT '',
                key_insights TEXT NOT NULL DEFAULT '[]',
                embedding_indexed INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_transcripts_occurred_at
                ON transcripts(occurred_at);

            CREATE TABLE IF NOT EXISTS participants (
                id INTEGER PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS topics (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS transcript_participants (
                transcript_id INTEGER NOT NULL
                    REFERENCES transcripts(id) ON DELETE CASCADE,
                participant_id INTEGER NOT NULL
                    REFERENCES participants(id) ON DELETE CASCADE,
                role TEXT NOT NULL DEFAULT 'participant',
                PRIMARY KEY (transcript_id, participant_id)
            );

            CREATE TABLE IF NOT EXISTS transcript_topics (
                transcript_id INTEGER NOT NULL
                    REFERENCES transcripts(id) ON DELETE CASCADE,
                topic_id INTEGER NOT NULL
                    REFERENCES topics(id) ON DELETE CASCADE,
                PRIMARY KEY (transcript_id, topic_id)
            );

            CREATE TABLE IF NOT EXISTS action_items (
                id INTEGER PRIMARY KEY,
                transcript_id INTEGER NOT NULL
                    REFERENCES transcripts(id) ON DELETE CASCADE,
                description TEXT NOT NULL,
                item_key TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS decisions (
                id INTEGER PRIMARY KEY,
                transcript_id INTEGER NOT NULL
                    REFERENCES transcripts(id) ON DELETE CASCADE,
                description TEXT NOT NULL,
                item_key TEXT NOT NULL UNIQUE
            );
            "#,
        )?;

        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;

        info!("Schema created (version {})", SCHEMA_VERSION);
        Ok(())
    }

    /// Execute a function within a transaction.
    ///
    /// All operations within the closure are atomic; an error rolls back
    /// every change.
    pub fn with_transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        match f(&tx) {
            Ok(result) => {
                tx.commit()?;
                Ok(result)
            }
            // Transaction rolls back when dropped
            Err(e) => Err(e),
        }
    }

    /// Number of transcript rows.
    pub fn transcript_count(&self) -> Result<usize> {
        self.count_table("transcripts")
    }

    /// Number of participant rows.
    pub fn participant_count(&self) -> Result<usize> {
        self.count_table("participants")
    }

    /// Number of topic rows.
    pub fn topic_count(&self) -> Result<usize> {
        self.count_table("topics")
    }

    fn count_table(&self, table: &str) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 =
            conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::params;

    #[test]
    fn test_open_in_memory() {
        let store = RelationalStore::open_in_memory().unwrap();
        assert_eq!(store.transcript_count().unwrap(), 0);
        assert_eq!(store.participant_count().unwrap(), 0);
        assert_eq!(store.topic_count().unwrap(), 0);
    }

    #[test]
    fn test_open_on_disk_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("hindsight.db");
        let store = RelationalStore::open(&path).unwrap();
        assert_eq!(store.transcript_count().unwrap(), 0);
        assert!(path.exists());
    }

    #[test]
    fn test_with_transaction_rolls_back_on_error() {
        let store = RelationalStore::open_in_memory().unwrap();

        let result: Result<()> = store.with_transaction(|conn| {
            conn.execute(
                "INSERT INTO topics (name) VALUES (?1)",
                params!["doomed"],
            )?;
            Err(crate::error::StoreError::InvalidData("boom".to_string()))
        });

        assert!(result.is_err());
        assert_eq!(store.topic_count().unwrap(), 0);
    }

    #[test]
    fn test_reopen_keeps_schema_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hindsight.db");
        drop(RelationalStore::open(&path).unwrap());

        // Second open must not fail on existing schema
        let store = RelationalStore::open(&path).unwrap();
        assert_eq!(store.transcript_count().unwrap(), 0);
    }
}
