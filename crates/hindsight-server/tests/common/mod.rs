//! Common test utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use reqwest::Client;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

use hindsight_index::VectorIndex;
use hindsight_llm::{MockAnalyzer, MockEmbedder};
use hindsight_pipeline::Pipeline;
use hindsight_server::{Server, ServerConfig};
use hindsight_store::RelationalStore;
use hindsight_types::{ExtractedEntities, Sentiment};

const DIMS: usize = 8;

/// A test server running in the background against in-memory stores and
/// mock model adapters.
pub struct TestServer {
    /// The server's address.
    pub addr: SocketAddr,
    /// HTTP client configured for this server.
    pub client: Client,
    /// Handle to the server task.
    _handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a test server with the default mock extraction.
    pub async fn start() -> Result<Self> {
        Self::start_with_analyzer(MockAnalyzer::new(ExtractedEntities {
            topics: vec!["budget".to_string(), "hiring".to_string(), "roadmap".to_string()],
            action_items: vec!["Ada to circulate the budget".to_string()],
            decisions: vec!["Roadmap approved".to_string()],
            sentiment: Sentiment::Positive,
        }))
        .await
    }

    /// Start a test server with a specific analyzer.
    pub async fn start_with_analyzer(analyzer: MockAnalyzer) -> Result<Self> {
        let pipeline = Pipeline::new(
            Arc::new(analyzer),
            Arc::new(MockEmbedder::new(DIMS)),
            Arc::new(RelationalStore::open_in_memory()?),
            Arc::new(VectorIndex::open_in_memory(DIMS, "mock")?),
        )?;

        let server = Server::new(Arc::new(pipeline), ServerConfig::default());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            let _ = server.serve_on(listener).await;
        });

        let client = Client::new();
        wait_for_server(&client, addr).await?;

        Ok(Self {
            addr,
            client,
            _handle: handle,
        })
    }

    /// Get the base URL for the server.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// GET request builder for a path.
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.get(format!("{}{}", self.base_url(), path))
    }

    /// POST request builder for a path.
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.post(format!("{}{}", self.base_url(), path))
    }

    /// DELETE request builder for a path.
    pub fn delete(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.delete(format!("{}{}", self.base_url(), path))
    }

    /// Ingest a canned submission with the given id and transcript text.
    pub async fn ingest(&self, transcript_id: &str, transcript: &str) -> Result<reqwest::Response> {
        let resp = self
            .post("/api/ingest")
            .json(&submission_body(transcript_id, transcript))
            .send()
            .await?;
        Ok(resp)
    }
}

/// A well-formed submission body.
pub fn submission_body(transcript_id: &str, transcript: &str) -> serde_json::Value {
    serde_json::json!({
        "transcript_id": transcript_id,
        "title": format!("Meeting {transcript_id}"),
        "occurred_at": "2025-05-20T14:00:00Z",
        "duration_minutes": 45.0,
        "participants": [
            {"name": "Ada Diaz", "email": "ada@example.com", "role": "organizer"},
            {"name": "Ben Ochoa", "email": "ben@example.com"}
        ],
        "transcript": transcript,
        "metadata": {"source": "integration-test"}
    })
}

async fn wait_for_server(client: &Client, addr: SocketAddr) -> Result<()> {
    let deadline = Duration::from_secs(5);
    timeout(deadline, async {
        loop {
            if let Ok(resp) = client.get(format!("http://{addr}/health")).send().await {
                if resp.status().is_success() {
                    return;
                }
            }
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .map_err(|_| anyhow::anyhow!("server did not become healthy within {deadline:?}"))
}
