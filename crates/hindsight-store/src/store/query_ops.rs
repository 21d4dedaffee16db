//! Read paths: batched hydration for search fusion, the detail view, the
//! filtered list, and deletion.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, params, params_from_iter};

use hindsight_types::{ParticipantRef, Sentiment, TranscriptDetail, TranscriptRecord};

use crate::error::{Result, StoreError};

use super::RelationalStore;

/// Optional filters for the transcript list.
#[derive(Debug, Clone, Default)]
pub struct TranscriptFilter {
    /// Matches a participant's exact email or a substring of their name.
    pub participant: Option<String>,
    /// Inclusive lower bound on `occurred_at` (RFC 3339).
    pub start_date: Option<String>,
    /// Inclusive upper bound on `occurred_at` (RFC 3339).
    pub end_date: Option<String>,
}

impl RelationalStore {
    /// Hydrate full transcript records for the given business ids in one
    /// batched lookup.
    ///
    /// Returns records in the order of `ids`; ids with no matching row are
    /// silently absent from the result (the caller decides whether that is a
    /// consistency gap worth logging).
    pub fn hydrate_by_business_ids(&self, ids: &[String]) -> Result<Vec<TranscriptRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.conn.lock().unwrap();
        let placeholders = vec!["?"; ids.len()].join(", ");

        let mut stmt = conn.prepare(&format!(
            "SELECT id, transcript_id, title, occurred_at, duration_minutes, \
             transcript_text, metadata, sentiment, summary, key_insights, \
             embedding_indexed, created_at \
             FROM transcripts WHERE transcript_id IN ({placeholders})"
        ))?;

        let mut by_business_id: HashMap<String, TranscriptRecord> = HashMap::new();
        let mut db_ids: Vec<i64> = Vec::new();

        let rows = stmt.query_map(params_from_iter(ids.iter()), raw_row)?;
        for raw in rows {
            let record = into_record(raw?)?;
            db_ids.push(record.id);
            by_business_id.insert(record.transcript_id.clone(), record);
        }

        attach_participants(&conn, &db_ids, &mut by_business_id)?;
        attach_topics(&conn, &db_ids, &mut by_business_id)?;

        let mut records = Vec::with_capacity(by_business_id.len());
        for id in ids {
            if let Some(record) = by_business_id.remove(id) {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Fetch one transcript with its participants, topics, action items, and
    /// decisions. Returns `None` when the business id is unknown.
    pub fn get_detail(&self, transcript_id: &str) -> Result<Option<TranscriptDetail>> {
        let mut records = self.hydrate_by_business_ids(&[transcript_id.to_string()])?;
        let Some(record) = records.pop() else {
            return Ok(None);
        };

        let conn = self.conn.lock().unwrap();
        let action_items = child_descriptions(&conn, "action_items", record.id)?;
        let decisions = child_descriptions(&conn, "decisions", record.id)?;

        Ok(Some(TranscriptDetail {
            record,
            action_items,
            decisions,
        }))
    }

    /// List transcripts newest-first with optional participant/date filters.
    pub fn list_transcripts(&self, filter: &TranscriptFilter) -> Result<Vec<TranscriptRecord>> {
        let ids: Vec<String> = {
            let conn = self.conn.lock().unwrap();

            let mut sql = String::from("SELECT transcript_id FROM transcripts t");
            let mut clauses: Vec<&str> = Vec::new();
            let mut bindings: Vec<String> = Vec::new();

            if let Some(participant) = &filter.participant {
                clauses.push(
                    "EXISTS (SELECT 1 FROM transcript_participants tp \
                     JOIN participants p ON p.id = tp.participant_id \
                     WHERE tp.transcript_id = t.id \
                       AND (p.email = ? OR p.name LIKE ?))",
                );
                bindings.push(participant.clone());
                bindings.push(format!("%{participant}%"));
            }
            if let Some(start) = &filter.start_date {
                clauses.push("t.occurred_at >= ?");
                bindings.push(start.clone());
            }
            if let Some(end) = &filter.end_date {
                clauses.push("t.occurred_at <= ?");
                bindings.push(end.clone());
            }

            if !clauses.is_empty() {
                sql.push_str(" WHERE ");
                sql.push_str(&clauses.join(" AND "));
            }
            sql.push_str(" ORDER BY t.occurred_at DESC");

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(bindings.iter()), |row| row.get(0))?;
            rows.collect::<std::result::Result<Vec<String>, _>>()?
        };

        self.hydrate_by_business_ids(&ids)
    }

    /// Delete a transcript and its owned/link rows (cascade). Shared
    /// participants and topics survive. Returns whether a row existed.
    pub fn delete_by_business_id(&self, transcript_id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM transcripts WHERE transcript_id = ?1",
            params![transcript_id],
        )?;
        Ok(deleted > 0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row Assembly
// ─────────────────────────────────────────────────────────────────────────────

struct RawRow {
    id: i64,
    transcript_id: String,
    title: String,
    occurred_at: String,
    duration_minutes: f64,
    transcript_text: String,
    metadata: String,
    sentiment: String,
    summary: String,
    key_insights: String,
    embedding_indexed: i64,
    created_at: String,
}

fn raw_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        id: row.get(0)?,
        transcript_id: row.get(1)?,
        title: row.get(2)?,
        occurred_at: row.get(3)?,
        duration_minutes: row.get(4)?,
        transcript_text: row.get(5)?,
        metadata: row.get(6)?,
        sentiment: row.get(7)?,
        summary: row.get(8)?,
        key_insights: row.get(9)?,
        embedding_indexed: row.get(10)?,
        created_at: row.get(11)?,
    })
}

fn into_record(raw: RawRow) -> Result<TranscriptRecord> {
    Ok(TranscriptRecord {
        id: raw.id,
        transcript_id: raw.transcript_id,
        title: raw.title,
        occurred_at: parse_timestamp(&raw.occurred_at)?,
        duration_minutes: raw.duration_minutes,
        transcript_text: raw.transcript_text,
        metadata: serde_json::from_str(&raw.metadata)?,
        sentiment: Sentiment::from_label(&raw.sentiment).unwrap_or_default(),
        summary: raw.summary,
        key_insights: serde_json::from_str(&raw.key_insights)?,
        embedding_indexed: raw.embedding_indexed != 0,
        created_at: parse_timestamp(&raw.created_at)?,
        participants: Vec::new(),
        topics: Vec::new(),
    })
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::InvalidData(format!("bad stored timestamp '{raw}': {e}")))
}

fn attach_participants(
    conn: &Connection,
    db_ids: &[i64],
    records: &mut HashMap<String, TranscriptRecord>,
) -> Result<()> {
    if db_ids.is_empty() {
        return Ok(());
    }
    let placeholders = vec!["?"; db_ids.len()].join(", ");
    let mut stmt = conn.prepare(&format!(
        "SELECT tp.transcript_id, p.name, p.email, tp.role \
         FROM transcript_participants tp \
         JOIN participants p ON p.id = tp.participant_id \
         WHERE tp.transcript_id IN ({placeholders}) \
         ORDER BY p.email"
    ))?;

    let mut by_db_id: HashMap<i64, Vec<ParticipantRef>> = HashMap::new();
    let rows = stmt.query_map(params_from_iter(db_ids.iter()), |row| {
        Ok((
            row.get::<_, i64>(0)?,
            ParticipantRef {
                name: row.get(1)?,
                email: row.get(2)?,
                role: row.get(3)?,
            },
        ))
    })?;
    for row in rows {
        let (db_id, participant) = row?;
        by_db_id.entry(db_id).or_default().push(participant);
    }

    for record in records.values_mut() {
        if let Some(participants) = by_db_id.remove(&record.id) {
            record.participants = participants;
        }
    }
    Ok(())
}

fn attach_topics(
    conn: &Connection,
    db_ids: &[i64],
    records: &mut HashMap<String, TranscriptRecord>,
) -> Result<()> {
    if db_ids.is_empty() {
        return Ok(());
    }
    let placeholders = vec!["?"; db_ids.len()].join(", ");
    let mut stmt = conn.prepare(&format!(
        "SELECT tt.transcript_id, topics.name \
         FROM transcript_topics tt \
         JOIN topics ON topics.id = tt.topic_id \
         WHERE tt.transcript_id IN ({placeholders}) \
         ORDER BY topics.name"
    ))?;

    let mut by_db_id: HashMap<i64, Vec<String>> = HashMap::new();
    let rows = stmt.query_map(params_from_iter(db_ids.iter()), |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
    })?;
    for row in rows {
        let (db_id, topic) = row?;
        by_db_id.entry(db_id).or_default().push(topic);
    }

    for record in records.values_mut() {
        if let Some(topics) = by_db_id.remove(&record.id) {
            record.topics = topics;
        }
    }
    Ok(())
}

fn child_descriptions(conn: &Connection, table: &str, db_id: i64) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT description FROM {table} WHERE transcript_id = ?1 ORDER BY id"
    ))?;
    let rows = stmt.query_map(params![db_id], |row| row.get(0))?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hindsight_types::{ExtractedEntities, ParticipantSpec, TranscriptSubmission};

    fn ingest(store: &RelationalStore, id: &str, occurred_at: &str, emails: &[(&str, &str)]) {
        let submission = TranscriptSubmission {
            transcript_id: id.to_string(),
            title: format!("Meeting {id}"),
            occurred_at: occurred_at.to_string(),
            duration_minutes: 25.0,
            participants: emails
                .iter()
                .map(|(name, email)| ParticipantSpec {
                    name: name.to_string(),
                    email: email.to_string(),
                    role: None,
                })
                .collect(),
            transcript: "words were said".to_string(),
            metadata: Some(serde_json::json!({"room": "4a"})),
        };
        let entities = ExtractedEntities {
            topics: vec!["planning".to_string()],
            action_items: vec!["do the thing".to_string()],
            decisions: vec!["the thing will be done".to_string()],
            sentiment: hindsight_types::Sentiment::Positive,
        };
        store
            .apply_ingestion(&submission, &entities, "A meeting happened.", &["insight".to_string()])
            .unwrap();
    }

    #[test]
    fn test_hydrate_preserves_input_order_and_drops_missing() {
        let store = RelationalStore::open_in_memory().unwrap();
        ingest(&store, "m-1", "2025-01-01T10:00:00Z", &[("Ada", "ada@example.com")]);
        ingest(&store, "m-2", "2025-01-02T10:00:00Z", &[("Ben", "ben@example.com")]);

        let records = store
            .hydrate_by_business_ids(&[
                "m-2".to_string(),
                "ghost".to_string(),
                "m-1".to_string(),
            ])
            .unwrap();

        let ids: Vec<&str> = records.iter().map(|r| r.transcript_id.as_str()).collect();
        assert_eq!(ids, vec!["m-2", "m-1"]);
    }

    #[test]
    fn test_hydrate_attaches_participants_topics_and_fields() {
        let store = RelationalStore::open_in_memory().unwrap();
        ingest(
            &store,
            "m-1",
            "2025-01-01T10:00:00Z",
            &[("Ada", "ada@example.com"), ("Ben", "ben@example.com")],
        );

        let records = store.hydrate_by_business_ids(&["m-1".to_string()]).unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.participants.len(), 2);
        assert_eq!(record.topics, vec!["planning"]);
        assert_eq!(record.summary, "A meeting happened.");
        assert_eq!(record.key_insights, vec!["insight"]);
        assert_eq!(record.metadata["room"], "4a");
        assert!(!record.embedding_indexed);
    }

    #[test]
    fn test_hydrate_empty_input() {
        let store = RelationalStore::open_in_memory().unwrap();
        assert!(store.hydrate_by_business_ids(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_get_detail_includes_children() {
        let store = RelationalStore::open_in_memory().unwrap();
        ingest(&store, "m-1", "2025-01-01T10:00:00Z", &[("Ada", "ada@example.com")]);

        let detail = store.get_detail("m-1").unwrap().unwrap();
        assert_eq!(detail.action_items, vec!["do the thing"]);
        assert_eq!(detail.decisions, vec!["the thing will be done"]);
        assert_eq!(detail.record.transcript_id, "m-1");

        assert!(store.get_detail("ghost").unwrap().is_none());
    }

    #[test]
    fn test_list_orders_newest_first() {
        let store = RelationalStore::open_in_memory().unwrap();
        ingest(&store, "old", "2025-01-01T10:00:00Z", &[("Ada", "ada@example.com")]);
        ingest(&store, "new", "2025-03-01T10:00:00Z", &[("Ada", "ada@example.com")]);

        let records = store.list_transcripts(&TranscriptFilter::default()).unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.transcript_id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old"]);
    }

    #[test]
    fn test_list_filters_by_participant_and_date() {
        let store = RelationalStore::open_in_memory().unwrap();
        ingest(&store, "m-1", "2025-01-01T10:00:00Z", &[("Ada Diaz", "ada@example.com")]);
        ingest(&store, "m-2", "2025-02-01T10:00:00Z", &[("Ben Ochoa", "ben@example.com")]);

        let by_email = store
            .list_transcripts(&TranscriptFilter {
                participant: Some("ada@example.com".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_email.len(), 1);
        assert_eq!(by_email[0].transcript_id, "m-1");

        let by_name = store
            .list_transcripts(&TranscriptFilter {
                participant: Some("Ochoa".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].transcript_id, "m-2");

        let in_window = store
            .list_transcripts(&TranscriptFilter {
                start_date: Some("2025-01-15T00:00:00Z".to_string()),
                end_date: Some("2025-02-15T00:00:00Z".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(in_window.len(), 1);
        assert_eq!(in_window[0].transcript_id, "m-2");
    }

    #[test]
    fn test_delete_cascades_but_keeps_shared_entities() {
        let store = RelationalStore::open_in_memory().unwrap();
        ingest(&store, "m-1", "2025-01-01T10:00:00Z", &[("Ada", "ada@example.com")]);
        ingest(&store, "m-2", "2025-01-02T10:00:00Z", &[("Ada", "ada@example.com")]);

        assert!(store.delete_by_business_id("m-1").unwrap());
        assert!(!store.delete_by_business_id("m-1").unwrap());

        assert_eq!(store.transcript_count().unwrap(), 1);
        // The shared participant row survives, linked to the remaining transcript
        assert_eq!(store.participant_count().unwrap(), 1);

        let conn = store.conn.lock().unwrap();
        let links: i64 = conn
            .query_row("SELECT COUNT(*) FROM transcript_participants", [], |row| row.get(0))
            .unwrap();
        let items: i64 = conn
            .query_row("SELECT COUNT(*) FROM action_items", [], |row| row.get(0))
            .unwrap();
        assert_eq!(links, 1);
        assert_eq!(items, 1);
    }
}
