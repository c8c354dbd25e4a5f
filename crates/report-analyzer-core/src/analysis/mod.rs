use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod indicators;
pub mod report_analyzer;

/// Inclusive `(low, high)` bounds of the values considered normal for an indicator.
pub type NormalRange = (f64, f64);

/// Minimum number of characters (after trimming) a report must contain to be analyzed.
pub const MIN_TEXT_CHARS: usize = 10;

/// Static definition of a tracked clinical indicator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSpec {
    /// Stable identifier used as the key in [`AnalysisReport::findings`].
    pub id: &'static str,
    /// Lower-case aliases, tried in declared order.
    pub keywords: &'static [&'static str],
    /// Inclusive bounds of the normal range.
    pub normal_range: NormalRange,
}

/// Position of a single value relative to its normal range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Low,
    Normal,
    High,
}

impl Status {
    pub fn is_abnormal(self) -> bool {
        !matches!(self, Self::Normal)
    }
}

/// Classify a value against an inclusive range.
pub fn classify(value: f64, range: NormalRange) -> Status {
    let (low, high) = range;
    if value < low {
        Status::Low
    } else if value > high {
        Status::High
    } else {
        Status::Normal
    }
}

/// Coarse overall severity of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    /// Map the number of out-of-range findings into a risk level.
    pub fn from_abnormal_count(count: usize) -> Self {
        match count {
            0 => Self::Low,
            1 | 2 => Self::Moderate,
            _ => Self::High,
        }
    }
}

/// Fold the statuses of a finding set into one risk level.
pub fn aggregate_risk<'a, I>(findings: I) -> RiskLevel
where
    I: IntoIterator<Item = &'a Finding>,
{
    let abnormal = findings
        .into_iter()
        .filter(|finding| finding.status.is_abnormal())
        .count();
    RiskLevel::from_abnormal_count(abnormal)
}

/// One indicator detected in a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    #[serde(skip)]
    pub indicator_id: String,
    pub value: f64,
    pub normal_range: NormalRange,
    pub status: Status,
    /// Alias that anchored the value.
    pub keyword: String,
}

impl Finding {
    /// Build a finding for `spec`, deriving the status from its normal range.
    pub fn new(spec: &IndicatorSpec, value: f64, keyword: impl Into<String>) -> Self {
        Self {
            indicator_id: spec.id.to_string(),
            value,
            normal_range: spec.normal_range,
            status: classify(value, spec.normal_range),
            keyword: keyword.into(),
        }
    }
}

/// Result of a successful analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub summary: String,
    pub findings: BTreeMap<String, Finding>,
    pub risk_level: RiskLevel,
    pub analysis_date: DateTime<Utc>,
    /// Character count of the untrimmed input.
    pub text_length: usize,
}

impl AnalysisReport {
    pub fn abnormal_count(&self) -> usize {
        self.findings
            .values()
            .filter(|finding| finding.status.is_abnormal())
            .count()
    }
}

/// Reasons an analysis is rejected before any indicator is evaluated.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("Text too short to analyze")]
    TextTooShort,
}
