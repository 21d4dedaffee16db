//! Vector index for transcript embeddings, backed by sqlite-vec.
//!
//! The index lives in its own database, separate from the relational store;
//! the only shared key is the caller-supplied `transcript_id`. Each record
//! holds the embedding, a copy of the transcript text (for similarity
//! explanation without a relational round trip), and a small denormalized
//! metadata map.
//!
//! Dimensionality is fixed at creation and enforced on every write and
//! query: a mismatch is a fatal configuration error, never a silent
//! truncation.

pub mod error;

use std::path::Path;
use std::sync::{Mutex, Once};

use rusqlite::{Connection, OpenFlags, params};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use zerocopy::IntoBytes;

pub use error::{IndexError, Result};

/// One stored embedding and its sidecar document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// Business key shared with the relational store.
    pub transcript_id: String,
    /// The embedding vector.
    pub embedding: Vec<f32>,
    /// Copy of the embedded text.
    pub document: String,
    /// Denormalized display metadata (title, occurred_at, relational id).
    pub metadata: serde_json::Value,
}

/// A nearest-neighbor hit.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    /// Business key of the matched record.
    pub transcript_id: String,
    /// Distance from the query vector; non-negative, lower is closer.
    pub distance: f32,
}

/// A record's stored document and metadata, without the vector.
#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub transcript_id: String,
    pub document: String,
    pub metadata: serde_json::Value,
}

static VEC_EXTENSION: Once = Once::new();

/// Register the sqlite-vec extension for all future connections.
///
/// `sqlite3_auto_extension` applies process-wide; registering once is enough.
fn init_vector_extension() {
    VEC_EXTENSION.call_once(|| {
        use rusqlite::ffi::sqlite3_auto_extension;
        use sqlite_vec::sqlite3_vec_init;

        unsafe {
            #[allow(clippy::missing_transmute_annotations)]
            sqlite3_auto_extension(Some(std::mem::transmute(sqlite3_vec_init as *const ())));
        }
    });
}

/// Vector index backed by a sqlite-vec vec0 virtual table.
pub struct VectorIndex {
    conn: Mutex<Connection>,
    dims: usize,
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("dims", &self.dims)
            .finish_non_exhaustive()
    }
}

impl VectorIndex {
    /// Open or create an index at the given path with the given dimensions.
    ///
    /// Fails with [`IndexError::DimensionMismatch`] if the database was
    /// created with different dimensions, and [`IndexError::Config`] if it
    /// was written by a different embedding provider.
    pub fn open(path: impl AsRef<Path>, dims: usize, provider: &str) -> Result<Self> {
        init_vector_extension();
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|_| {
                    IndexError::Database(rusqlite::Error::InvalidPath(path.to_path_buf()))
                })?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
        )?;

        let index = Self {
            conn: Mutex::new(conn),
            dims,
        };
        index.initialize(provider)?;

        info!(dims, provider, "Vector index opened at {:?}", path);
        Ok(index)
    }

    /// Create an in-memory index (useful for testing).
    pub fn open_in_memory(dims: usize, provider: &str) -> Result<Self> {
        init_vector_extension();
        let conn = Connection::open_in_memory()?;
        let index = Self {
            conn: Mutex::new(conn),
            dims,
        };
        index.initialize(provider)?;
        Ok(index)
    }

    fn initialize(&self, provider: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS vector_documents (
                transcript_id TEXT PRIMARY KEY,
                document TEXT NOT NULL,
                metadata TEXT NOT NULL DEFAULT '{}'
            );
            "#,
        )?;

        let stored_dims: Option<String> = conn
            .query_row(
                "SELECT value FROM meta WHERE key = 'embedding.dimensions'",
                [],
                |row| row.get(0),
            )
            .ok();
        if let Some(stored) = stored_dims {
            if let Ok(existing) = stored.parse::<usize>() {
                if existing != self.dims {
                    return Err(IndexError::DimensionMismatch {
                        expected: existing,
                        actual: self.dims,
                    });
                }
            }
        }

        let stored_provider: Option<String> = conn
            .query_row(
                "SELECT value FROM meta WHERE key = 'embedding.provider'",
                [],
                |row| row.get(0),
            )
            .ok();
        if let Some(existing) = stored_provider {
            if existing != provider {
                return Err(IndexError::Config(format!(
                    "index was written by embedding provider '{existing}', \
                     refusing to open as '{provider}'"
                )));
            }
        }

        conn.execute_batch(&format!(
            "CREATE VIRTUAL TABLE IF NOT EXISTS transcript_vectors USING vec0(\
                 transcript_id TEXT PRIMARY KEY, \
                 embedding float[{}]\
             )",
            self.dims
        ))?;

        conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES ('embedding.dimensions', ?1)",
            params![self.dims.to_string()],
        )?;
        conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES ('embedding.provider', ?1)",
            params![provider],
        )?;

        Ok(())
    }

    /// Dimensionality this index was opened with.
    pub fn dimensions(&self) -> usize {
        self.dims
    }

    /// Insert or replace the record for its `transcript_id`.
    pub fn upsert(&self, record: &EmbeddingRecord) -> Result<()> {
        self.check_dims(record.embedding.len())?;
        let metadata = serde_json::to_string(&record.metadata)?;

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        // vec0 has no upsert; replace by delete + insert
        tx.execute(
            "DELETE FROM transcript_vectors WHERE transcript_id = ?1",
            params![record.transcript_id],
        )?;
        tx.execute(
            "INSERT INTO transcript_vectors (transcript_id, embedding) VALUES (?1, ?2)",
            params![record.transcript_id, record.embedding.as_bytes()],
        )?;
        tx.execute(
            "INSERT OR REPLACE INTO vector_documents (transcript_id, document, metadata) \
             VALUES (?1, ?2, ?3)",
            params![record.transcript_id, record.document, metadata],
        )?;
        tx.commit()?;

        debug!(transcript_id = %record.transcript_id, "Stored embedding");
        Ok(())
    }

    /// Return up to `limit` nearest neighbors, closest first.
    pub fn search(&self, query: &[f32], limit: usize) -> Result<Vec<Neighbor>> {
        self.check_dims(query.len())?;
        if limit == 0 {
            return Ok(Vec::new());
        }

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT transcript_id, distance \
             FROM transcript_vectors \
             WHERE embedding MATCH ?1 \
             ORDER BY distance \
             LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![query.as_bytes(), limit as i64], |row| {
            Ok(Neighbor {
                transcript_id: row.get(0)?,
                distance: row.get(1)?,
            })
        })?;
        let neighbors = rows.collect::<std::result::Result<Vec<_>, _>>()?;

        debug!(found = neighbors.len(), limit, "Vector search complete");
        Ok(neighbors)
    }

    /// Fetch a record's stored document and metadata.
    pub fn get_document(&self, transcript_id: &str) -> Result<Option<StoredDocument>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT document, metadata FROM vector_documents WHERE transcript_id = ?1",
        )?;
        let mut rows = stmt.query(params![transcript_id])?;

        match rows.next()? {
            Some(row) => {
                let document: String = row.get(0)?;
                let metadata: String = row.get(1)?;
                Ok(Some(StoredDocument {
                    transcript_id: transcript_id.to_string(),
                    document,
                    metadata: serde_json::from_str(&metadata)?,
                }))
            }
            None => Ok(None),
        }
    }

    /// Remove a record. Returns whether one existed.
    pub fn remove(&self, transcript_id: &str) -> Result<bool> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let removed = tx.execute(
            "DELETE FROM transcript_vectors WHERE transcript_id = ?1",
            params![transcript_id],
        )?;
        tx.execute(
            "DELETE FROM vector_documents WHERE transcript_id = ?1",
            params![transcript_id],
        )?;
        tx.commit()?;
        Ok(removed > 0)
    }

    /// Whether a record exists for this id.
    pub fn contains(&self, transcript_id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM transcript_vectors WHERE transcript_id = ?1",
            params![transcript_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Number of stored records.
    pub fn count(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM transcript_vectors", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn check_dims(&self, actual: usize) -> Result<()> {
        if actual != self.dims {
            return Err(IndexError::DimensionMismatch {
                expected: self.dims,
                actual,
            });
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
