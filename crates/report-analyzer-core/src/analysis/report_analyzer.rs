use std::{sync::Arc, time::Duration};

use anyhow::Result;
use chrono::Utc;
use tokio::time::timeout;
use tracing::{debug, error, instrument};

use super::{
    aggregate_risk,
    indicators::{default_matcher, IndicatorMatcher},
    AnalysisError, AnalysisReport, MIN_TEXT_CHARS,
};
use crate::summarizer::{truncate_chars, Summarizer};

/// Characters of report text handed to the summarizer.
pub const SUMMARY_INPUT_CHARS: usize = 1024;
pub const SUMMARY_UNAVAILABLE: &str = "AI summarization model not available";
pub const SUMMARY_FAILED: &str = "Unable to generate AI summary";

const DEFAULT_SUMMARY_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs the full pipeline: indicator extraction, classification, risk aggregation and the
/// optional narrative summary.
pub struct ReportAnalyzer {
    matcher: &'static IndicatorMatcher,
    summarizer: Option<Arc<dyn Summarizer>>,
    summary_timeout: Duration,
}

impl ReportAnalyzer {
    pub fn new(summarizer: Option<Arc<dyn Summarizer>>) -> Result<Self> {
        Ok(Self {
            matcher: default_matcher()?,
            summarizer,
            summary_timeout: DEFAULT_SUMMARY_TIMEOUT,
        })
    }

    pub fn with_summary_timeout(mut self, summary_timeout: Duration) -> Self {
        self.summary_timeout = summary_timeout;
        self
    }

    pub fn has_summarizer(&self) -> bool {
        self.summarizer.is_some()
    }

    #[instrument(name = "analyze_report", skip(self, text), fields(text_len = text.len()))]
    pub async fn analyze(&self, text: &str) -> Result<AnalysisReport, AnalysisError> {
        if text.trim().chars().count() < MIN_TEXT_CHARS {
            return Err(AnalysisError::TextTooShort);
        }

        let findings = self.matcher.extract_findings(text);
        let risk_level = aggregate_risk(findings.values());
        debug!(findings = findings.len(), ?risk_level, "indicators evaluated");

        let summary = self.summarize(text).await;

        Ok(AnalysisReport {
            summary,
            findings,
            risk_level,
            analysis_date: Utc::now(),
            text_length: text.chars().count(),
        })
    }

    async fn summarize(&self, text: &str) -> String {
        let Some(summarizer) = &self.summarizer else {
            return SUMMARY_UNAVAILABLE.to_string();
        };
        let excerpt = truncate_chars(text, SUMMARY_INPUT_CHARS);
        match timeout(self.summary_timeout, summarizer.summarize(excerpt)).await {
            Ok(Ok(summary)) => summary,
            Ok(Err(err)) => {
                error!(error = %format!("{err:#}"), "summarization failed");
                SUMMARY_FAILED.to_string()
            }
            Err(_) => {
                error!(timeout = ?self.summary_timeout, "summarization timed out");
                SUMMARY_FAILED.to_string()
            }
        }
    }
}
