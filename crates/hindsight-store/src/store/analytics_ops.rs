//! Aggregate reads over the relational schema.
//!
//! These are presentation queries; they fold link rows in Rust rather than
//! leaning on SQL array aggregates SQLite does not have.

use serde::Serialize;

use crate::error::Result;

use super::RelationalStore;

/// How often a topic was discussed, and where.
#[derive(Debug, Clone, Serialize)]
pub struct TopicStat {
    pub topic: String,
    pub count: usize,
    pub transcript_titles: Vec<String>,
}

/// A participant's meeting activity.
#[derive(Debug, Clone, Serialize)]
pub struct ParticipantStat {
    pub name: String,
    pub email: String,
    pub meeting_count: usize,
    pub meetings: Vec<String>,
}

/// Average sentiment for one calendar day.
#[derive(Debug, Clone, Serialize)]
pub struct SentimentTrendPoint {
    pub date: String,
    pub avg_sentiment: f64,
    pub meeting_count: i64,
}

impl RelationalStore {
    /// Topic frequency with the titles of the transcripts that mention each,
    /// most-discussed first.
    pub fn topic_frequency(&self) -> Result<Vec<TopicStat>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT t.name, tr.title \
             FROM topics t \
             LEFT JOIN transcript_topics tt ON tt.topic_id = t.id \
             LEFT JOIN transcripts tr ON tr.id = tt.transcript_id \
             ORDER BY t.name, tr.title",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
        })?;

        let mut stats: Vec<TopicStat> = Vec::new();
        for row in rows {
            let (topic, title) = row?;
            if stats.last().map(|s| s.topic.as_str()) != Some(topic.as_str()) {
                stats.push(TopicStat {
                    topic,
                    count: 0,
                    transcript_titles: Vec::new(),
                });
            }
            if let Some(title) = title {
                let stat = stats.last_mut().unwrap();
                stat.count += 1;
                stat.transcript_titles.push(title);
            }
        }

        stats.sort_by(|a, b| b.count.cmp(&a.count));
        Ok(stats)
    }

    /// Per-participant meeting counts, most active first.
    pub fn participant_activity(&self) -> Result<Vec<ParticipantStat>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT p.name, p.email, tr.title \
             FROM participants p \
             LEFT JOIN transcript_participants tp ON tp.participant_id = p.id \
             LEFT JOIN transcripts tr ON tr.id = tp.transcript_id \
             ORDER BY p.email, tr.title",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })?;

        let mut stats: Vec<ParticipantStat> = Vec::new();
        for row in rows {
            let (name, email, title) = row?;
            if stats.last().map(|s| s.email.as_str()) != Some(email.as_str()) {
                stats.push(ParticipantStat {
                    name,
                    email,
                    meeting_count: 0,
                    meetings: Vec::new(),
                });
            }
            if let Some(title) = title {
                let stat = stats.last_mut().unwrap();
                stat.meeting_count += 1;
                stat.meetings.push(title);
            }
        }

        stats.sort_by(|a, b| b.meeting_count.cmp(&a.meeting_count));
        Ok(stats)
    }

    /// Per-day average sentiment (positive = 1, neutral = 0, negative = -1).
    pub fn sentiment_trend(&self) -> Result<Vec<SentimentTrendPoint>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT DATE(occurred_at) AS day, \
                    AVG(CASE sentiment \
                        WHEN 'positive' THEN 1.0 \
                        WHEN 'negative' THEN -1.0 \
                        ELSE 0.0 END) AS avg_sentiment, \
                    COUNT(*) AS meeting_count \
             FROM transcripts \
             GROUP BY day \
             ORDER BY day ASC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(SentimentTrendPoint {
                date: row.get(0)?,
                avg_sentiment: row.get(1)?,
                meeting_count: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hindsight_types::{
        ExtractedEntities, ParticipantSpec, Sentiment, TranscriptSubmission,
    };

    fn ingest(
        store: &RelationalStore,
        id: &str,
        occurred_at: &str,
        topics: &[&str],
        sentiment: Sentiment,
    ) {
        let submission = TranscriptSubmission {
            transcript_id: id.to_string(),
            title: format!("Meeting {id}"),
            occurred_at: occurred_at.to_string(),
            duration_minutes: 30.0,
            participants: vec![ParticipantSpec {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                role: None,
            }],
            transcript: "text".to_string(),
            metadata: None,
        };
        let entities = ExtractedEntities {
            topics: topics.iter().map(|t| t.to_string()).collect(),
            action_items: vec![],
            decisions: vec![],
            sentiment,
        };
        store.apply_ingestion(&submission, &entities, "", &[]).unwrap();
    }

    #[test]
    fn test_topic_frequency_counts_and_orders() {
        let store = RelationalStore::open_in_memory().unwrap();
        ingest(&store, "m-1", "2025-01-01T10:00:00Z", &["budget", "hiring"], Sentiment::Neutral);
        ingest(&store, "m-2", "2025-01-02T10:00:00Z", &["budget"], Sentiment::Neutral);

        let stats = store.topic_frequency().unwrap();
        assert_eq!(stats[0].topic, "budget");
        assert_eq!(stats[0].count, 2);
        assert_eq!(stats[0].transcript_titles.len(), 2);
        assert_eq!(stats[1].topic, "hiring");
        assert_eq!(stats[1].count, 1);
    }

    #[test]
    fn test_participant_activity() {
        let store = RelationalStore::open_in_memory().unwrap();
        ingest(&store, "m-1", "2025-01-01T10:00:00Z", &[], Sentiment::Neutral);
        ingest(&store, "m-2", "2025-01-02T10:00:00Z", &[], Sentiment::Neutral);

        let stats = store.participant_activity().unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].email, "ada@example.com");
        assert_eq!(stats[0].meeting_count, 2);
        assert_eq!(stats[0].meetings.len(), 2);
    }

    #[test]
    fn test_sentiment_trend_groups_by_day() {
        let store = RelationalStore::open_in_memory().unwrap();
        ingest(&store, "m-1", "2025-01-01T09:00:00Z", &[], Sentiment::Positive);
        ingest(&store, "m-2", "2025-01-01T15:00:00Z", &[], Sentiment::Negative);
        ingest(&store, "m-3", "2025-01-02T09:00:00Z", &[], Sentiment::Positive);

        let trend = store.sentiment_trend().unwrap();
        assert_eq!(trend.len(), 2);
        assert_eq!(trend[0].date, "2025-01-01");
        assert_eq!(trend[0].meeting_count, 2);
        assert!(trend[0].avg_sentiment.abs() < f64::EPSILON);
        assert_eq!(trend[1].date, "2025-01-02");
        assert!((trend[1].avg_sentiment - 1.0).abs() < f64::EPSILON);
    }
}
