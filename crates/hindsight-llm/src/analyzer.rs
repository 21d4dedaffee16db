//! Transcript analysis via an OpenAI-compatible chat completions API.
//!
//! The [`TranscriptAnalyzer`] trait covers the three independent derivations
//! the ingestion pipeline needs: entity extraction, summarization, and
//! insight generation. All three demand structured output from the model and
//! are strict about gross shape (the response must parse at all) while being
//! lenient about missing optional fields.

use async_trait::async_trait;
use reqwest::{Client, header};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use hindsight_types::{ExtractedEntities, Sentiment};

use crate::error::{LlmError, Result};

/// Default OpenAI API base URL.
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default chat model for analysis calls.
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default per-request timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

// ─────────────────────────────────────────────────────────────────────────────
// Analyzer Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Derives structured facts from raw transcript text.
///
/// The three operations are independent of one another and may run
/// concurrently. None of them retries internally; retry policy belongs to
/// the caller.
#[async_trait]
pub trait TranscriptAnalyzer: Send + Sync {
    /// Extract topics, action items, decisions, and sentiment.
    async fn extract(&self, transcript_text: &str) -> Result<ExtractedEntities>;

    /// Produce a 2–3 sentence synopsis of the meeting.
    async fn summarize(&self, text: &str) -> Result<String>;

    /// Produce 3–5 strategic observations about the meeting.
    async fn derive_insights(&self, text: &str) -> Result<Vec<String>>;

    /// Name of this analyzer implementation.
    fn name(&self) -> &str;
}

/// A shared analyzer handle usable across tasks.
pub type SharedAnalyzer = Arc<dyn TranscriptAnalyzer>;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration for the OpenAI-compatible analyzer.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// API key for authentication.
    pub api_key: String,
    /// Base URL for the API.
    pub base_url: String,
    /// Chat model to use.
    pub model: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl AnalyzerConfig {
    /// Create a config with the given API key and default endpoint/model.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Create config from the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            LlmError::Config("OPENAI_API_KEY environment variable not set".to_string())
        })?;
        Ok(Self::new(api_key))
    }

    /// Set a custom base URL (for compatible providers).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the chat model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// OpenAI-compatible Analyzer
// ─────────────────────────────────────────────────────────────────────────────

/// Analyzer backed by an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiAnalyzer {
    client: Client,
    config: AnalyzerConfig,
}

impl OpenAiAnalyzer {
    /// Create a new analyzer with the given configuration.
    pub fn new(config: AnalyzerConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Create an analyzer from environment configuration.
    pub fn from_env() -> Result<Self> {
        Self::new(AnalyzerConfig::from_env()?)
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    /// Issue one chat completion and return the assistant message content.
    async fn chat(
        &self,
        system: &str,
        user: String,
        temperature: f32,
        json_mode: bool,
    ) -> Result<String> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature,
            response_format: json_mode.then(|| ResponseFormat {
                kind: "json_object",
            }),
        };

        let response = self
            .client
            .post(self.completions_url())
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.config.api_key),
            )
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Backend(format!(
                "chat completion failed: HTTP {status} - {body}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Backend(format!("malformed completion response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| LlmError::Extraction("model returned no content".to_string()))
    }
}

#[async_trait]
impl TranscriptAnalyzer for OpenAiAnalyzer {
    async fn extract(&self, transcript_text: &str) -> Result<ExtractedEntities> {
        if transcript_text.trim().is_empty() {
            return Err(LlmError::InvalidRequest(
                "transcript text must not be empty".to_string(),
            ));
        }

        let prompt = format!(
            "Analyze the following meeting transcript and extract:\n\
             1. Main topics discussed (3-7 key themes)\n\
             2. Action items (specific tasks assigned with who should do them)\n\
             3. Key decisions made\n\
             4. Overall sentiment (positive, neutral, or negative)\n\n\
             Transcript:\n{transcript_text}\n\n\
             Return your response in the following JSON format:\n\
             {{\"topics\": [\"topic1\", ...], \"action_items\": [\"action1\", ...], \
             \"decisions\": [\"decision1\", ...], \"sentiment\": \"positive/neutral/negative\"}}"
        );

        let content = self
            .chat(
                "You are an assistant specialized in analyzing meeting transcripts. \
                 Always respond with valid JSON.",
                prompt,
                0.3,
                true,
            )
            .await?;

        parse_extraction(&content)
    }

    async fn summarize(&self, text: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Err(LlmError::InvalidRequest(
                "transcript text must not be empty".to_string(),
            ));
        }

        let prompt = format!(
            "Summarize the following meeting transcript in 2-3 concise sentences. \
             Focus on the main purpose of the meeting and key outcomes.\n\n\
             Transcript:\n{text}"
        );

        let content = self
            .chat(
                "You are an assistant specialized in summarizing meeting transcripts \
                 concisely and accurately.",
                prompt,
                0.3,
                false,
            )
            .await?;

        Ok(content.trim().to_string())
    }

    async fn derive_insights(&self, text: &str) -> Result<Vec<String>> {
        if text.trim().is_empty() {
            return Err(LlmError::InvalidRequest(
                "transcript text must not be empty".to_string(),
            ));
        }

        let prompt = format!(
            "Analyze the following meeting transcript and generate 3-5 key insights. \
             These should be strategic observations, important patterns, or critical \
             takeaways that provide value beyond surface-level information.\n\n\
             Transcript:\n{text}\n\n\
             Return your response as JSON: {{\"insights\": [\"insight1\", ...]}}"
        );

        let content = self
            .chat(
                "You are an assistant specialized in analyzing meetings and extracting \
                 strategic insights. Always respond with valid JSON.",
                prompt,
                0.4,
                true,
            )
            .await?;

        parse_insights(&content)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Response Parsing
// ─────────────────────────────────────────────────────────────────────────────

/// Raw extraction payload as the model emits it.
///
/// Sentiment arrives as a free string so an off-vocabulary label degrades to
/// neutral instead of failing the whole call.
#[derive(Debug, Deserialize)]
struct RawExtraction {
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default)]
    action_items: Vec<String>,
    #[serde(default)]
    decisions: Vec<String>,
    #[serde(default)]
    sentiment: Option<String>,
}

/// Parse the extraction response. Strict about gross shape, lenient about
/// missing fields.
fn parse_extraction(content: &str) -> Result<ExtractedEntities> {
    let raw: RawExtraction = serde_json::from_str(content)
        .map_err(|e| LlmError::Extraction(format!("unparseable extraction response: {e}")))?;

    let sentiment = raw
        .sentiment
        .as_deref()
        .and_then(Sentiment::from_label)
        .unwrap_or_default();

    Ok(ExtractedEntities {
        topics: raw.topics,
        action_items: raw.action_items,
        decisions: raw.decisions,
        sentiment,
    })
}

#[derive(Debug, Deserialize)]
struct RawInsights {
    #[serde(default)]
    insights: Vec<String>,
}

fn parse_insights(content: &str) -> Result<Vec<String>> {
    let raw: RawInsights = serde_json::from_str(content)
        .map_err(|e| LlmError::Extraction(format!("unparseable insights response: {e}")))?;
    Ok(raw.insights)
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Mock Analyzer
// ─────────────────────────────────────────────────────────────────────────────

/// Deterministic analyzer for tests. Returns configured values without any
/// network call, or a fixed error when constructed with [`MockAnalyzer::failing`].
#[derive(Debug, Clone)]
pub struct MockAnalyzer {
    extraction: ExtractedEntities,
    summary: String,
    insights: Vec<String>,
    failure: Option<String>,
}

impl MockAnalyzer {
    /// Create a mock returning the given extraction and canned summary/insights.
    pub fn new(extraction: ExtractedEntities) -> Self {
        Self {
            extraction,
            summary: "A short meeting about the usual things.".to_string(),
            insights: vec!["The team is aligned on next steps.".to_string()],
            failure: None,
        }
    }

    /// Create a mock whose every operation fails with a backend error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            extraction: ExtractedEntities::default(),
            summary: String::new(),
            insights: Vec::new(),
            failure: Some(message.into()),
        }
    }

    /// Override the canned summary.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    /// Override the canned insights.
    pub fn with_insights(mut self, insights: Vec<String>) -> Self {
        self.insights = insights;
        self
    }

    fn check_failure(&self) -> Result<()> {
        match &self.failure {
            Some(msg) => Err(LlmError::Backend(msg.clone())),
            None => Ok(()),
        }
    }
}

impl Default for MockAnalyzer {
    fn default() -> Self {
        Self::new(ExtractedEntities {
            topics: vec!["planning".to_string(), "budget".to_string()],
            action_items: vec!["Follow up next week".to_string()],
            decisions: vec!["Proceed with the plan".to_string()],
            sentiment: Sentiment::Positive,
        })
    }
}

#[async_trait]
impl TranscriptAnalyzer for MockAnalyzer {
    async fn extract(&self, transcript_text: &str) -> Result<ExtractedEntities> {
        self.check_failure()?;
        if transcript_text.trim().is_empty() {
            return Err(LlmError::InvalidRequest(
                "transcript text must not be empty".to_string(),
            ));
        }
        Ok(self.extraction.clone())
    }

    async fn summarize(&self, _text: &str) -> Result<String> {
        self.check_failure()?;
        Ok(self.summary.clone())
    }

    async fn derive_insights(&self, _text: &str) -> Result<Vec<String>> {
        self.check_failure()?;
        Ok(self.insights.clone())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
