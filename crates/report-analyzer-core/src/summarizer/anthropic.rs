use super::{send_with_retries, Summarizer, SummarizerSettings, MAX_OUTPUT_TOKENS, SYSTEM_PROMPT};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone)]
pub struct AnthropicSummarizer {
    http: Client,
    url: String,
    api_key: String,
    model: String,
    max_retries: u32,
}

impl AnthropicSummarizer {
    pub fn new(settings: &SummarizerSettings) -> Result<Self> {
        let api_key = settings.require_api_key("Anthropic")?.to_string();
        let base = settings
            .endpoint
            .clone()
            .unwrap_or_else(|| "https://api.anthropic.com".to_string());
        let url = format!("{}/v1/messages", base.trim_end_matches('/'));
        let http = Client::builder()
            .user_agent("report-analyzer/0.3")
            .timeout(settings.timeout())
            .build()
            .context("failed to build Anthropic HTTP client")?;
        Ok(Self {
            http,
            url,
            api_key,
            model: settings
                .model
                .clone()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| "claude-3-haiku-20240307".to_string()),
            max_retries: settings.max_retries,
        })
    }
}

#[async_trait]
impl Summarizer for AnthropicSummarizer {
    async fn summarize(&self, text: &str) -> Result<String> {
        let payload = AnthropicRequest {
            model: &self.model,
            system: SYSTEM_PROMPT,
            messages: vec![AnthropicMessage {
                role: "user",
                content: text,
            }],
            max_tokens: MAX_OUTPUT_TOKENS,
        };

        let response = send_with_retries("Anthropic", self.max_retries, || {
            self.http
                .post(&self.url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&payload)
        })
        .await?;

        let message: AnthropicResponse = response
            .json()
            .await
            .context("failed to parse Anthropic response")?;
        message
            .content
            .into_iter()
            .find_map(|part| part.text)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| anyhow!("Anthropic response missing message content"))
    }
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    system: &'static str,
    messages: Vec<AnthropicMessage<'a>>,
    max_tokens: u32,
}

#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Deserialize)]
struct AnthropicContent {
    #[serde(default)]
    text: Option<String>,
}
