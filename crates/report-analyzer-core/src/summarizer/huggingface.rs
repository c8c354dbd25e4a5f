use super::{send_with_retries, Summarizer, SummarizerSettings};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const DEFAULT_ENDPOINT: &str = "https://api-inference.huggingface.co";
const DEFAULT_MODEL: &str = "facebook/bart-large-cnn";
const MAX_SUMMARY_TOKENS: u32 = 150;
const MIN_SUMMARY_TOKENS: u32 = 30;

/// Summarizer backed by the Hugging Face Inference API summarization task.
#[derive(Debug, Clone)]
pub struct HuggingFaceSummarizer {
    http: Client,
    url: String,
    api_key: String,
    max_retries: u32,
}

impl HuggingFaceSummarizer {
    pub fn new(settings: &SummarizerSettings) -> Result<Self> {
        let api_key = settings.require_api_key("Hugging Face")?.to_string();
        let base = settings
            .endpoint
            .clone()
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let model = settings
            .model
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let url = format!("{}/models/{}", base.trim_end_matches('/'), model);
        let http = Client::builder()
            .user_agent("report-analyzer/0.3")
            .timeout(settings.timeout())
            .build()
            .context("failed to build Hugging Face HTTP client")?;
        Ok(Self {
            http,
            url,
            api_key,
            max_retries: settings.max_retries,
        })
    }
}

#[async_trait]
impl Summarizer for HuggingFaceSummarizer {
    async fn summarize(&self, text: &str) -> Result<String> {
        let payload = SummarizationRequest {
            inputs: text,
            parameters: SummarizationParameters {
                max_length: MAX_SUMMARY_TOKENS,
                min_length: MIN_SUMMARY_TOKENS,
                do_sample: false,
            },
        };

        // 503 is returned while the model is cold-loading, so retries cover it.
        let response = send_with_retries("Hugging Face", self.max_retries, || {
            self.http
                .post(&self.url)
                .bearer_auth(&self.api_key)
                .json(&payload)
        })
        .await?;

        let outputs: Vec<SummarizationOutput> = response
            .json()
            .await
            .context("failed to parse Hugging Face response")?;
        outputs
            .into_iter()
            .next()
            .map(|output| output.summary_text.trim().to_string())
            .filter(|summary| !summary.is_empty())
            .ok_or_else(|| anyhow!("Hugging Face response missing summary_text"))
    }
}

#[derive(Serialize)]
struct SummarizationRequest<'a> {
    inputs: &'a str,
    parameters: SummarizationParameters,
}

#[derive(Serialize)]
struct SummarizationParameters {
    max_length: u32,
    min_length: u32,
    do_sample: bool,
}

#[derive(Deserialize)]
struct SummarizationOutput {
    summary_text: String,
}
