mod anthropic;
mod huggingface;
mod openai;
mod settings;

use std::{sync::Arc, time::Duration};

use anyhow::{bail, Result};
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use tokio::time::sleep;
use tracing::{debug, warn};

pub use anthropic::AnthropicSummarizer;
pub use huggingface::HuggingFaceSummarizer;
pub use openai::OpenAiSummarizer;
pub use settings::SummarizerSettings;

/// Text-to-text model that condenses a report into a short paragraph.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize `text`; callers already bound its length.
    async fn summarize(&self, text: &str) -> Result<String>;
}

/// Supported summarization backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    HuggingFace,
    OpenAi,
    Anthropic,
    None,
}

impl ProviderKind {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "huggingface" | "hf" => Ok(Self::HuggingFace),
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "none" | "disabled" | "" => Ok(Self::None),
            other => bail!("unsupported summarizer provider `{other}`"),
        }
    }
}

/// Build the summarizer described by `settings`, or `None` when summarization is disabled.
pub fn build_summarizer(settings: &SummarizerSettings) -> Result<Option<Arc<dyn Summarizer>>> {
    let summarizer: Arc<dyn Summarizer> = match ProviderKind::parse(&settings.provider)? {
        ProviderKind::None => return Ok(None),
        ProviderKind::HuggingFace => Arc::new(HuggingFaceSummarizer::new(settings)?),
        ProviderKind::OpenAi => Arc::new(OpenAiSummarizer::new(settings)?),
        ProviderKind::Anthropic => Arc::new(AnthropicSummarizer::new(settings)?),
    };
    debug!(provider = %settings.provider, "summarizer configured");
    Ok(Some(summarizer))
}

pub(crate) const SYSTEM_PROMPT: &str = "You are a clinical documentation assistant. Summarize the medical report you are given in one short plain-language paragraph of at most 120 words. Mention notable measurements. Do not add diagnoses or advice that the report does not contain. Respond with the summary text only.";

/// Maximum tokens requested from chat-style backends.
pub(crate) const MAX_OUTPUT_TOKENS: u32 = 200;

/// Send a request built by `make_request`, retrying transport errors and non-success statuses
/// with exponential backoff. The final failing response is returned as an error.
pub(crate) async fn send_with_retries<F>(
    provider: &str,
    max_retries: u32,
    make_request: F,
) -> Result<Response>
where
    F: Fn() -> RequestBuilder,
{
    let mut attempt = 0u32;
    let mut backoff = Duration::from_millis(200);
    loop {
        match make_request().send().await {
            Ok(resp) if resp.status().is_success() => return Ok(resp),
            Ok(resp) => {
                if attempt >= max_retries {
                    let status = resp.status();
                    let body = resp.text().await.unwrap_or_default();
                    bail!("{provider} API error ({status}): {body}");
                }
                warn!(provider, status = %resp.status(), attempt, "retrying summarizer call");
            }
            Err(err) => {
                if attempt >= max_retries {
                    return Err(anyhow::Error::new(err)
                        .context(format!("failed to call {provider} API")));
                }
                warn!(provider, error = %err, attempt, "retrying summarizer call");
            }
        }
        sleep(backoff).await;
        backoff = (backoff * 2).min(Duration::from_secs(5));
        attempt += 1;
    }
}

/// First `max_chars` characters of `input`.
pub fn truncate_chars(input: &str, max_chars: usize) -> &str {
    match input.char_indices().nth(max_chars) {
        Some((idx, _)) => &input[..idx],
        None => input,
    }
}
