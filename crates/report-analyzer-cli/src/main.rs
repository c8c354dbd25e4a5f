use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use report_analyzer_core::{
    build_summarizer, extract_text, render_report, DocumentKind, OutputFormat, ReportAnalyzer,
    SummarizerSettings, INDICATORS,
};
use tokio::io::AsyncReadExt;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod server;

use config::AppConfig;

#[derive(Parser, Debug)]
#[command(
    name = "report-analyzer",
    author,
    version,
    about = "Medical report analyzer: lab indicators, risk level and summary"
)]
struct Cli {
    /// Optional configuration file (TOML, YAML or JSON)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze a report file (.pdf or .txt) or stdin
    Analyze {
        /// Report to analyze; reads plain text from stdin when omitted
        file: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = FormatArg::Human)]
        format: FormatArg,
        /// Skip the narrative summary even if a provider is configured
        #[arg(long)]
        no_summary: bool,
        /// Deadline for the summary call, e.g. `10s` or `1m`
        #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
        summary_timeout: Option<Duration>,
    },
    /// List the recognized indicators with their aliases and normal ranges
    Indicators {
        /// Emit the table as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run the HTTP API
    Serve {
        /// Listen address, overriding the config file
        #[arg(long, value_name = "ADDR")]
        addr: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Human,
    Json,
    Yaml,
}

impl From<FormatArg> for OutputFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Human => OutputFormat::Human,
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Yaml => OutputFormat::Yaml,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    match cli.command {
        Commands::Analyze {
            file,
            format,
            no_summary,
            summary_timeout,
        } => {
            let settings = if no_summary {
                None
            } else {
                Some(&config.summarizer)
            };
            analyze(file.as_deref(), format.into(), settings, summary_timeout).await?
        }
        Commands::Indicators { json } => list_indicators(json)?,
        Commands::Serve { addr } => {
            let mut server_config = config.server.clone();
            if let Some(addr) = addr {
                server_config.addr = addr;
            }
            let analyzer = Arc::new(build_analyzer(Some(&config.summarizer), None)?);
            server::serve(&server_config, analyzer).await?
        }
    }
    Ok(())
}

async fn analyze(
    file: Option<&Path>,
    format: OutputFormat,
    settings: Option<&SummarizerSettings>,
    summary_timeout: Option<Duration>,
) -> Result<()> {
    let text = read_document(file).await?;
    let analyzer = build_analyzer(settings, summary_timeout)?;
    let report = analyzer.analyze(&text).await?;
    print!("{}", render_report(&report, format)?);
    Ok(())
}

/// Build the analyzer, falling back to findings-only analysis when the summarizer cannot be
/// constructed.
fn build_analyzer(
    settings: Option<&SummarizerSettings>,
    summary_timeout: Option<Duration>,
) -> Result<ReportAnalyzer> {
    let summarizer = match settings.filter(|settings| settings.is_enabled()) {
        Some(settings) => match build_summarizer(settings) {
            Ok(summarizer) => summarizer,
            Err(err) => {
                warn!(error = %err, "summarizer unavailable; continuing without summaries");
                None
            }
        },
        None => None,
    };
    let timeout = summary_timeout.or_else(|| settings.map(SummarizerSettings::timeout));
    let mut analyzer = ReportAnalyzer::new(summarizer)?;
    if let Some(timeout) = timeout {
        analyzer = analyzer.with_summary_timeout(timeout);
    }
    info!(
        summarizer = analyzer.has_summarizer(),
        "report analyzer ready"
    );
    Ok(analyzer)
}

async fn read_document(file: Option<&Path>) -> Result<String> {
    let Some(path) = file else {
        let mut text = String::new();
        tokio::io::stdin()
            .read_to_string(&mut text)
            .await
            .context("failed to read report from stdin")?;
        return Ok(text);
    };

    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    let Some(kind) = DocumentKind::from_filename(name) else {
        bail!(
            "unsupported file type for {}: only .pdf and .txt reports are accepted",
            path.display()
        );
    };
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read report {}", path.display()))?;
    let text = tokio::task::spawn_blocking(move || extract_text(&bytes, kind))
        .await
        .context("text extraction task failed")?;
    Ok(text)
}

fn list_indicators(json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(INDICATORS)?);
        return Ok(());
    }

    println!("{} indicator(s) recognized", INDICATORS.len());
    for spec in INDICATORS {
        let (low, high) = spec.normal_range;
        println!(
            "- {id:<15} [{low} - {high}] :: {aliases}",
            id = spec.id,
            aliases = spec.keywords.join(", ")
        );
    }
    Ok(())
}

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tokio=warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}
