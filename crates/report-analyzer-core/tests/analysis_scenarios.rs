use std::{fs, path::PathBuf};

use report_analyzer_core::{AnalysisError, ReportAnalyzer, RiskLevel, SUMMARY_UNAVAILABLE};
use serde_json::{json, Value};

fn fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn read_fixture(name: &str) -> String {
    let path = fixture_dir().join(name);
    fs::read_to_string(&path)
        .unwrap_or_else(|err| panic!("failed to read fixture {}: {err}", path.display()))
}

/// Analyze a fixture without a summarizer and return the report as JSON minus its timestamp.
async fn analyze_fixture(name: &str) -> (String, Value) {
    let input = read_fixture(name);
    let analyzer = ReportAnalyzer::new(None).expect("analyzer should build");
    let report = analyzer
        .analyze(&input)
        .await
        .unwrap_or_else(|err| panic!("analysis failed for fixture {name}: {err}"));

    let mut value = serde_json::to_value(&report).unwrap();
    let date = value
        .as_object_mut()
        .and_then(|obj| obj.remove("analysis_date"))
        .expect("report should carry analysis_date");
    assert!(date.as_str().is_some_and(|d| d.contains('T')));
    (input, value)
}

#[tokio::test(flavor = "current_thread")]
async fn normal_panel_is_low_risk() {
    let (input, value) = analyze_fixture("normal_panel.txt").await;
    assert_eq!(
        value,
        json!({
            "summary": SUMMARY_UNAVAILABLE,
            "findings": {
                "glucose": {"value": 92.0, "normal_range": [70.0, 100.0], "status": "normal", "keyword": "glucose"},
                "hemoglobin": {"value": 13.8, "normal_range": [12.0, 17.0], "status": "normal", "keyword": "hemoglobin"},
                "cholesterol": {"value": 182.0, "normal_range": [0.0, 200.0], "status": "normal", "keyword": "cholesterol"},
                "blood_pressure": {"value": 118.0, "normal_range": [90.0, 140.0], "status": "normal", "keyword": "blood pressure"},
                "rbc": {"value": 4.9, "normal_range": [4.5, 6.0], "status": "normal", "keyword": "rbc"},
                "wbc": {"value": 6500.0, "normal_range": [4000.0, 11000.0], "status": "normal", "keyword": "wbc"},
                "platelets": {"value": 250000.0, "normal_range": [150000.0, 450000.0], "status": "normal", "keyword": "plt"},
            },
            "risk_level": "low",
            "text_length": input.chars().count(),
        })
    );
}

#[tokio::test(flavor = "current_thread")]
async fn abnormal_panel_is_high_risk() {
    let (_, value) = analyze_fixture("abnormal_panel.txt").await;
    assert_eq!(value["risk_level"], "high");
    assert_eq!(
        value["findings"],
        json!({
            "glucose": {"value": 182.0, "normal_range": [70.0, 100.0], "status": "high", "keyword": "blood sugar"},
            "hemoglobin": {"value": 9.1, "normal_range": [12.0, 17.0], "status": "low", "keyword": "hgb"},
            "cholesterol": {"value": 165.0, "normal_range": [0.0, 200.0], "status": "normal", "keyword": "ldl"},
            "blood_pressure": {"value": 150.0, "normal_range": [90.0, 140.0], "status": "high", "keyword": "bp"},
            "wbc": {"value": 13200.0, "normal_range": [4000.0, 11000.0], "status": "high", "keyword": "wbc"},
        })
    );
}

#[tokio::test(flavor = "current_thread")]
async fn narrative_without_indicators_has_no_findings() {
    let (_, value) = analyze_fixture("narrative_only.txt").await;
    assert_eq!(value["findings"], json!({}));
    assert_eq!(value["risk_level"], "low");
}

#[tokio::test(flavor = "current_thread")]
async fn whitespace_only_input_is_rejected() {
    let analyzer = ReportAnalyzer::new(None).unwrap();
    let err = analyzer.analyze("   ").await.unwrap_err();
    assert_eq!(err, AnalysisError::TextTooShort);
    assert_eq!(
        json!({ "error": err.to_string() }),
        json!({ "error": "Text too short to analyze" })
    );
}

#[tokio::test(flavor = "current_thread")]
async fn scenario_b_counts_three_abnormal_findings() {
    let analyzer = ReportAnalyzer::new(None).unwrap();
    let report = analyzer
        .analyze("glucose: 250, hemoglobin: 8, wbc: 15000")
        .await
        .unwrap();
    assert_eq!(report.abnormal_count(), 3);
    assert_eq!(report.risk_level, RiskLevel::High);
    assert_eq!(report.summary, SUMMARY_UNAVAILABLE);
}
