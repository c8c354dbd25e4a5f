pub mod analysis;
pub mod extract;
pub mod report;
pub mod summarizer;

pub use analysis::{
    aggregate_risk, classify,
    indicators::{default_matcher, IndicatorMatcher, RawMatch, INDICATORS},
    report_analyzer::{ReportAnalyzer, SUMMARY_FAILED, SUMMARY_INPUT_CHARS, SUMMARY_UNAVAILABLE},
    AnalysisError, AnalysisReport, Finding, IndicatorSpec, NormalRange, RiskLevel, Status,
    MIN_TEXT_CHARS,
};
pub use extract::{extract_text, try_extract_text, DocumentKind, ExtractionError};
pub use report::{render_report, OutputFormat};
pub use summarizer::{build_summarizer, ProviderKind, Summarizer, SummarizerSettings};
