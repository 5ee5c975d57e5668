//! Advisory text-generation client (Gemini-style `generateContent` API).

use anyhow::anyhow;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::CycleError;
use crate::models::Recommendation;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Advisory collaborator: one "generate text from prompt" call per cycle,
/// parsed into a structured recommendation.
#[async_trait]
pub trait Advisor: Send + Sync {
    async fn advise(&self, market_summary: &str) -> Result<Recommendation, CycleError>;
}

/// Client for the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    http: Client,
    api_url: String,
    api_key: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<ContentPart<'a>>,
}

#[derive(Serialize)]
struct ContentPart<'a> {
    parts: Vec<TextPart<'a>>,
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl GeminiClient {
    pub fn new(api_url: String, api_key: String) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Ok(Self {
            http,
            api_url,
            api_key,
        })
    }

    /// Read the advisory endpoint settings from the environment.
    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| anyhow!("GEMINI_API_KEY not set"))?;
        let api_url = std::env::var("GEMINI_API_URL")
            .map_err(|_| anyhow!("GEMINI_API_URL not set"))?;
        Self::new(api_url, api_key)
    }
}

#[async_trait]
impl Advisor for GeminiClient {
    async fn advise(&self, market_summary: &str) -> Result<Recommendation, CycleError> {
        let url = format!("{}?key={}", self.api_url, self.api_key);
        let body = GenerateRequest {
            contents: vec![ContentPart {
                parts: vec![TextPart {
                    text: market_summary,
                }],
            }],
        };

        let response = self.http.post(&url).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(CycleError::Transport(format!(
                "advisory request failed: {status} - {text}"
            )));
        }

        let parsed: GenerateResponse = response.json().await?;
        let text = parsed
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.clone())
            .ok_or_else(|| {
                CycleError::DataUnavailable("advisory response has no candidates".into())
            })?;

        debug!(response = %text, "advisory text received");
        Ok(Recommendation::parse(&text))
    }
}
