use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, File};
use report_analyzer_core::SummarizerSettings;
use serde::Deserialize;

const DEFAULT_ADDR: &str = "0.0.0.0:5000";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Settings for the `serve` command.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
    pub max_upload_bytes: usize,
    /// Directory served as the web frontend, if any.
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            static_dir: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub summarizer: SummarizerSettings,
}

impl AppConfig {
    /// Load the optional config file, then let `REPORT_ANALYZER_*` variables override the
    /// summarizer section.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self {
                summarizer: SummarizerSettings::from_env(),
                ..Self::default()
            });
        };
        let mut app = Self::from_file(path)?;
        app.summarizer = app.summarizer.merge_env();
        Ok(app)
    }

    fn from_file(path: &Path) -> Result<Self> {
        Config::builder()
            .add_source(File::from(path))
            .build()
            .with_context(|| format!("failed to read config file {}", path.display()))?
            .try_deserialize()
            .with_context(|| format!("invalid configuration in {}", path.display()))
    }
}
