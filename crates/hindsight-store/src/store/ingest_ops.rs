//! Ingestion writes: the transactional persist of one transcript and the
//! durable marker for the vector-index finalize step.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use tracing::debug;

use hindsight_types::{ExtractedEntities, TranscriptSubmission};

use crate::error::{Result, StoreError};

use super::RelationalStore;

/// Outcome of persisting a transcript submission.
#[derive(Debug, Clone, Copy)]
pub struct IngestedTranscript {
    /// Relational surrogate id of the transcript row.
    pub db_id: i64,
    /// Whether this call created the row (false on re-ingestion).
    pub created: bool,
}

/// A transcript whose vector-index finalize step has not completed.
#[derive(Debug, Clone)]
pub struct PendingEmbedding {
    pub db_id: i64,
    pub transcript_id: String,
    pub title: String,
    pub occurred_at: String,
    pub transcript_text: String,
}

impl RelationalStore {
    /// Persist one transcript submission and its derived entities as a single
    /// transaction.
    ///
    /// Every write is idempotent: the transcript row is keyed by its business
    /// id and never mutated once created, participants upsert by email with
    /// last-write-wins names, links ignore duplicates, and child rows carry
    /// content-scoped keys. Re-running the same submission leaves the store
    /// unchanged apart from participant name updates.
    pub fn apply_ingestion(
        &self,
        submission: &TranscriptSubmission,
        entities: &ExtractedEntities,
        summary: &str,
        key_insights: &[String],
    ) -> Result<IngestedTranscript> {
        let occurred_at = normalize_timestamp(&submission.occurred_at)?;
        let metadata = match &submission.metadata {
            Some(value) => serde_json::to_string(value)?,
            None => "{}".to_string(),
        };
        let insights_json = serde_json::to_string(key_insights)?;
        let created_at = Utc::now().to_rfc3339();

        self.with_transaction(|conn| {
            let inserted = conn.execute(
                r#"
                INSERT INTO transcripts
                    (transcript_id, title, occurred_at, duration_minutes,
                     transcript_text, metadata, sentiment, summary, key_insights,
                     created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                ON CONFLICT(transcript_id) DO NOTHING
                "#,
                params![
                    submission.transcript_id,
                    submission.title,
                    occurred_at,
                    submission.duration_minutes,
                    submission.transcript,
                    metadata,
                    entities.sentiment.as_str(),
                    summary,
                    insights_json,
                    created_at,
                ],
            )?;

            let db_id: i64 = conn.query_row(
                "SELECT id FROM transcripts WHERE transcript_id = ?1",
                params![submission.transcript_id],
                |row| row.get(0),
            )?;

            for p in &submission.participants {
                let participant_id = upsert_participant(conn, &p.email, &p.name)?;
                conn.execute(
                    r#"
                    INSERT OR IGNORE INTO transcript_participants
                        (transcript_id, participant_id, role)
                    VALUES (?1, ?2, ?3)
                    "#,
                    params![
                        db_id,
                        participant_id,
                        p.role.as_deref().unwrap_or("participant")
                    ],
                )?;
            }

            for topic in &entities.topics {
                let topic_id = upsert_topic(conn, topic)?;
                conn.execute(
                    "INSERT OR IGNORE INTO transcript_topics (transcript_id, topic_id) \
                     VALUES (?1, ?2)",
                    params![db_id, topic_id],
                )?;
            }

            insert_children(
                conn,
                "action_items",
                db_id,
                &submission.transcript_id,
                &entities.action_items,
            )?;
            insert_children(
                conn,
                "decisions",
                db_id,
                &submission.transcript_id,
                &entities.decisions,
            )?;

            debug!(
                transcript_id = %submission.transcript_id,
                db_id,
                created = inserted > 0,
                "Transcript persisted"
            );

            Ok(IngestedTranscript {
                db_id,
                created: inserted > 0,
            })
        })
    }

    /// Record that the vector index holds an embedding for this transcript.
    pub fn mark_embedding_indexed(&self, transcript_id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE transcripts SET embedding_indexed = 1 WHERE transcript_id = ?1",
            params![transcript_id],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(format!(
                "transcript '{transcript_id}' does not exist"
            )));
        }
        Ok(())
    }

    /// Transcripts whose finalize step never completed, oldest first.
    ///
    /// Used to resume the vector upsert after a crash between the relational
    /// commit and the index write.
    pub fn list_unindexed(&self) -> Result<Vec<PendingEmbedding>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, transcript_id, title, occurred_at, transcript_text \
             FROM transcripts WHERE embedding_indexed = 0 ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(PendingEmbedding {
                db_id: row.get(0)?,
                transcript_id: row.get(1)?,
                title: row.get(2)?,
                occurred_at: row.get(3)?,
                transcript_text: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }
}

fn upsert_participant(conn: &Connection, email: &str, name: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO participants (email, name) VALUES (?1, ?2) \
         ON CONFLICT(email) DO UPDATE SET name = excluded.name",
        params![email, name],
    )?;
    let id = conn.query_row(
        "SELECT id FROM participants WHERE email = ?1",
        params![email],
        |row| row.get(0),
    )?;
    Ok(id)
}

fn upsert_topic(conn: &Connection, name: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO topics (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
        params![name],
    )?;
    let id = conn.query_row(
        "SELECT id FROM topics WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )?;
    Ok(id)
}

fn insert_children(
    conn: &Connection,
    table: &str,
    db_id: i64,
    transcript_id: &str,
    descriptions: &[String],
) -> Result<()> {
    let sql = format!(
        "INSERT OR IGNORE INTO {table} (transcript_id, description, item_key) \
         VALUES (?1, ?2, ?3)"
    );
    let mut stmt = conn.prepare(&sql)?;
    for (ordinal, description) in descriptions.iter().enumerate() {
        let key = content_key(transcript_id, table, ordinal, description);
        stmt.execute(params![db_id, description, key])?;
    }
    Ok(())
}

/// Content-scoped idempotency key for child rows, which have no natural key
/// of their own. Derived from the business id, table, ordinal, and text so a
/// retried ingestion maps onto the same rows.
fn content_key(transcript_id: &str, table: &str, ordinal: usize, description: &str) -> String {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in format!("{transcript_id}\u{1f}{table}\u{1f}{ordinal}\u{1f}{description}").bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    format!("{hash:016x}")
}

fn normalize_timestamp(raw: &str) -> Result<String> {
    let parsed = DateTime::parse_from_rfc3339(raw)
        .map_err(|e| StoreError::InvalidData(format!("bad occurred_at '{raw}': {e}")))?;
    Ok(parsed.with_timezone(&Utc).to_rfc3339())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hindsight_types::{ParticipantSpec, Sentiment};

    fn submission(transcript_id: &str) -> TranscriptSubmission {
        TranscriptSubmission {
            transcript_id: transcript_id.to_string(),
            title: "Weekly Sync".to_string(),
            occurred_at: "2025-05-01T09:00:00Z".to_string(),
            duration_minutes: 30.0,
            participants: vec![
                ParticipantSpec {
                    name: "Ada Diaz".to_string(),
                    email: "ada@example.com".to_string(),
                    role: Some("organizer".to_string()),
                },
                ParticipantSpec {
                    name: "Ben Ochoa".to_string(),
                    email: "ben@example.com".to_string(),
                    role: None,
                },
            ],
            transcript: "Ada: hello. Ben: hi.".to_string(),
            metadata: None,
        }
    }

    fn entities() -> ExtractedEntities {
        ExtractedEntities {
            topics: vec!["budget".to_string(), "hiring".to_string()],
            action_items: vec!["Ada to send numbers".to_string()],
            decisions: vec!["Pause hiring".to_string()],
            sentiment: Sentiment::Neutral,
        }
    }

    fn child_count(store: &RelationalStore, table: &str) -> i64 {
        let conn = store.conn.lock().unwrap();
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_apply_ingestion_persists_everything() {
        let store = RelationalStore::open_in_memory().unwrap();
        let result = store
            .apply_ingestion(&submission("m-1"), &entities(), "Summary.", &[])
            .unwrap();

        assert!(result.created);
        assert_eq!(store.transcript_count().unwrap(), 1);
        assert_eq!(store.participant_count().unwrap(), 2);
        assert_eq!(store.topic_count().unwrap(), 2);
        assert_eq!(child_count(&store, "action_items"), 1);
        assert_eq!(child_count(&store, "decisions"), 1);
        assert_eq!(child_count(&store, "transcript_participants"), 2);
        assert_eq!(child_count(&store, "transcript_topics"), 2);
    }

    #[test]
    fn test_reingest_is_idempotent() {
        let store = RelationalStore::open_in_memory().unwrap();
        let first = store
            .apply_ingestion(&submission("m-1"), &entities(), "Summary.", &[])
            .unwrap();
        let second = store
            .apply_ingestion(&submission("m-1"), &entities(), "Summary.", &[])
            .unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.db_id, second.db_id);
        assert_eq!(store.transcript_count().unwrap(), 1);
        assert_eq!(store.participant_count().unwrap(), 2);
        assert_eq!(child_count(&store, "action_items"), 1);
        assert_eq!(child_count(&store, "decisions"), 1);
        assert_eq!(child_count(&store, "transcript_participants"), 2);
    }

    #[test]
    fn test_participant_name_is_last_write_wins() {
        let store = RelationalStore::open_in_memory().unwrap();
        store
            .apply_ingestion(&submission("m-1"), &entities(), "", &[])
            .unwrap();

        let mut changed = submission("m-1");
        changed.participants[0].name = "Ada D. Diaz".to_string();
        store.apply_ingestion(&changed, &entities(), "", &[]).unwrap();

        let conn = store.conn.lock().unwrap();
        let name: String = conn
            .query_row(
                "SELECT name FROM participants WHERE email = 'ada@example.com'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(name, "Ada D. Diaz");
        drop(conn);
        assert_eq!(store.participant_count().unwrap(), 2);
    }

    #[test]
    fn test_shared_participants_and_topics_deduplicate() {
        let store = RelationalStore::open_in_memory().unwrap();
        store
            .apply_ingestion(&submission("m-1"), &entities(), "", &[])
            .unwrap();
        store
            .apply_ingestion(&submission("m-2"), &entities(), "", &[])
            .unwrap();

        assert_eq!(store.transcript_count().unwrap(), 2);
        assert_eq!(store.participant_count().unwrap(), 2);
        assert_eq!(store.topic_count().unwrap(), 2);
        // Each transcript links to both shared participants and topics
        assert_eq!(child_count(&store, "transcript_participants"), 4);
        assert_eq!(child_count(&store, "transcript_topics"), 4);
    }

    #[test]
    fn test_topic_names_are_case_sensitive() {
        let store = RelationalStore::open_in_memory().unwrap();
        let mut e = entities();
        e.topics = vec!["Budget".to_string(), "budget".to_string()];
        store.apply_ingestion(&submission("m-1"), &e, "", &[]).unwrap();
        assert_eq!(store.topic_count().unwrap(), 2);
    }

    #[test]
    fn test_duplicate_descriptions_get_distinct_keys() {
        let store = RelationalStore::open_in_memory().unwrap();
        let mut e = entities();
        // Same text twice is two real action items (different ordinals)
        e.action_items = vec!["Follow up".to_string(), "Follow up".to_string()];
        store.apply_ingestion(&submission("m-1"), &e, "", &[]).unwrap();
        assert_eq!(child_count(&store, "action_items"), 2);
    }

    #[test]
    fn test_embedding_indexed_marker() {
        let store = RelationalStore::open_in_memory().unwrap();
        store
            .apply_ingestion(&submission("m-1"), &entities(), "", &[])
            .unwrap();

        let pending = store.list_unindexed().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].transcript_id, "m-1");

        store.mark_embedding_indexed("m-1").unwrap();
        assert!(store.list_unindexed().unwrap().is_empty());

        assert!(store.mark_embedding_indexed("missing").is_err());
    }

    #[test]
    fn test_occurred_at_normalized_to_utc() {
        let store = RelationalStore::open_in_memory().unwrap();
        let mut sub = submission("m-1");
        sub.occurred_at = "2025-05-01T11:00:00+02:00".to_string();
        store.apply_ingestion(&sub, &entities(), "", &[]).unwrap();

        let conn = store.conn.lock().unwrap();
        let stored: String = conn
            .query_row("SELECT occurred_at FROM transcripts", [], |row| row.get(0))
            .unwrap();
        assert!(stored.starts_with("2025-05-01T09:00:00"));
    }
}
