use std::fmt::Write;

use crate::analysis::{indicators::INDICATORS, AnalysisReport, RiskLevel, Status};

/// Format styles supported by [`render_report`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
    Yaml,
}

/// Produce a report string from an `AnalysisReport` using the desired format.
pub fn render_report(report: &AnalysisReport, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Human => render_human(report),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(report)?),
    }
}

fn render_human(report: &AnalysisReport) -> anyhow::Result<String> {
    let mut out = String::new();
    writeln!(out, "Risk Level: {}", risk_label(report.risk_level))?;
    writeln!(
        out,
        "Abnormal Findings: {} of {}",
        report.abnormal_count(),
        report.findings.len()
    )?;
    writeln!(out, "Text Length: {} chars", report.text_length)?;
    writeln!(out, "Analyzed At: {}", report.analysis_date.to_rfc3339())?;
    writeln!(out)?;

    if report.findings.is_empty() {
        writeln!(out, "No indicators detected.")?;
    } else {
        writeln!(out, "Findings:")?;
        // Table order, not key order, so related indicators stay together.
        for spec in INDICATORS {
            let Some(finding) = report.findings.get(spec.id) else {
                continue;
            };
            writeln!(
                out,
                "  - {id:<15} {value:>10} [{low} - {high}] {status:<6} (keyword: {keyword})",
                id = spec.id,
                value = finding.value,
                low = finding.normal_range.0,
                high = finding.normal_range.1,
                status = status_label(finding.status),
                keyword = finding.keyword,
            )?;
        }
    }

    writeln!(out)?;
    writeln!(out, "Summary:")?;
    writeln!(out, "  {}", report.summary.trim())?;
    Ok(out)
}

fn risk_label(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::Low => "LOW",
        RiskLevel::Moderate => "MODERATE",
        RiskLevel::High => "HIGH",
    }
}

fn status_label(status: Status) -> &'static str {
    match status {
        Status::Low => "LOW",
        Status::Normal => "normal",
        Status::High => "HIGH",
    }
}
