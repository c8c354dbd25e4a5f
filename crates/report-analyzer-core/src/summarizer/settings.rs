use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, time::Duration};

use super::ProviderKind;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for the optional summarization backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizerSettings {
    pub provider: String,
    pub api_key: String,
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_retries: u32,
}

impl Default for SummarizerSettings {
    fn default() -> Self {
        Self {
            provider: "huggingface".to_string(),
            api_key: String::new(),
            endpoint: None,
            model: None,
            timeout_secs: None,
            max_retries: 2,
        }
    }
}

impl SummarizerSettings {
    const PROVIDER_ENV: &'static str = "REPORT_ANALYZER_PROVIDER";
    const API_KEY_ENV: &'static str = "REPORT_ANALYZER_API_KEY";
    const ENDPOINT_ENV: &'static str = "REPORT_ANALYZER_ENDPOINT";
    const MODEL_ENV: &'static str = "REPORT_ANALYZER_MODEL";
    const TIMEOUT_ENV: &'static str = "REPORT_ANALYZER_TIMEOUT_SECS";
    const RETRIES_ENV: &'static str = "REPORT_ANALYZER_MAX_RETRIES";

    /// Load settings from environment variables on top of the defaults.
    ///
    /// * `REPORT_ANALYZER_PROVIDER`: `huggingface` (default), `openai`, `anthropic` or `none`.
    /// * `REPORT_ANALYZER_API_KEY`: API key/token for the provider.
    /// * `REPORT_ANALYZER_ENDPOINT`: Optional custom base URL.
    pub fn from_env() -> Self {
        Self::default().merge_env()
    }

    /// Overlay any summarizer variables present in the environment onto `self`.
    pub fn merge_env(self) -> Self {
        self.merge_vars(&std::env::vars().collect())
    }

    fn merge_vars(mut self, vars: &HashMap<String, String>) -> Self {
        let non_blank = |key: &str| {
            vars.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        if let Some(provider) = non_blank(Self::PROVIDER_ENV) {
            self.provider = provider;
        }
        if let Some(api_key) = non_blank(Self::API_KEY_ENV) {
            self.api_key = api_key;
        }
        if let Some(endpoint) = non_blank(Self::ENDPOINT_ENV) {
            self.endpoint = Some(endpoint);
        }
        if let Some(model) = non_blank(Self::MODEL_ENV) {
            self.model = Some(model);
        }
        if let Some(timeout) = non_blank(Self::TIMEOUT_ENV).and_then(|v| v.parse::<u64>().ok()) {
            self.timeout_secs = Some(timeout);
        }
        if let Some(retries) = non_blank(Self::RETRIES_ENV).and_then(|v| v.parse::<u32>().ok()) {
            self.max_retries = retries;
        }
        self
    }

    /// Whether these settings ask for a summarizer at all.
    pub fn is_enabled(&self) -> bool {
        !matches!(ProviderKind::parse(&self.provider), Ok(ProviderKind::None))
    }

    /// Deadline applied to each summarization call.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    /// API key, failing with a hint about the environment variable when it is blank.
    pub(crate) fn require_api_key(&self, provider_label: &str) -> Result<&str> {
        let key = self.api_key.trim();
        if key.is_empty() {
            bail!(
                "{provider_label} API key must be provided via {}",
                Self::API_KEY_ENV
            );
        }
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_to_huggingface_provider() {
        let settings = SummarizerSettings::default().merge_vars(&HashMap::new());
        assert_eq!(settings.provider, "huggingface");
        assert!(settings.api_key.is_empty());
        assert!(settings.endpoint.is_none());
        assert_eq!(settings.max_retries, 2);
        assert_eq!(settings.timeout(), Duration::from_secs(30));
        assert!(settings.is_enabled());
    }

    #[test]
    fn env_values_override_base() {
        let base = SummarizerSettings {
            provider: "openai".into(),
            model: Some("from-file".into()),
            ..SummarizerSettings::default()
        };
        let settings = base.merge_vars(&vars(&[
            (SummarizerSettings::PROVIDER_ENV, "anthropic"),
            (SummarizerSettings::API_KEY_ENV, "secret"),
            (SummarizerSettings::TIMEOUT_ENV, "45"),
            (SummarizerSettings::RETRIES_ENV, "5"),
        ]));
        assert_eq!(settings.provider, "anthropic");
        assert_eq!(settings.api_key, "secret");
        assert_eq!(settings.model.as_deref(), Some("from-file"));
        assert_eq!(settings.timeout_secs, Some(45));
        assert_eq!(settings.max_retries, 5);
    }

    #[test]
    fn blank_and_malformed_values_are_ignored() {
        let settings = SummarizerSettings::default().merge_vars(&vars(&[
            (SummarizerSettings::PROVIDER_ENV, "   "),
            (SummarizerSettings::TIMEOUT_ENV, "soon"),
            (SummarizerSettings::RETRIES_ENV, "-1"),
        ]));
        assert_eq!(settings.provider, "huggingface");
        assert!(settings.timeout_secs.is_none());
        assert_eq!(settings.max_retries, 2);
    }

    #[test]
    fn none_provider_is_disabled() {
        let settings = SummarizerSettings::default()
            .merge_vars(&vars(&[(SummarizerSettings::PROVIDER_ENV, "none")]));
        assert!(!settings.is_enabled());
    }

    #[test]
    fn missing_key_error_names_env_var() {
        let err = SummarizerSettings::default()
            .require_api_key("OpenAI")
            .unwrap_err();
        assert!(err.to_string().contains(SummarizerSettings::API_KEY_ENV));
    }

    #[test]
    fn deserializes_partial_config_sections() {
        let settings: SummarizerSettings =
            serde_json::from_str(r#"{"provider": "openai", "timeout_secs": 10}"#).unwrap();
        assert_eq!(settings.provider, "openai");
        assert_eq!(settings.timeout(), Duration::from_secs(10));
        assert_eq!(settings.max_retries, 2);
    }
}
