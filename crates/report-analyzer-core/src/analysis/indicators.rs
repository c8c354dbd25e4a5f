use std::collections::BTreeMap;

use aho_corasick::AhoCorasick;
use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use regex::Regex;
use tracing::trace;

use super::{Finding, IndicatorSpec};

/// Indicators tracked by the analyzer.
///
/// Order matters: indicators are evaluated top to bottom and, within an indicator, the first
/// alias that is followed by a number wins even if a later alias appears earlier in the text.
pub static INDICATORS: &[IndicatorSpec] = &[
    IndicatorSpec {
        id: "glucose",
        keywords: &["glucose", "blood sugar", "glu"],
        normal_range: (70.0, 100.0),
    },
    IndicatorSpec {
        id: "hemoglobin",
        keywords: &["hemoglobin", "hgb", "hb"],
        normal_range: (12.0, 17.0),
    },
    IndicatorSpec {
        id: "cholesterol",
        keywords: &["cholesterol", "chol", "ldl", "hdl"],
        normal_range: (0.0, 200.0),
    },
    IndicatorSpec {
        id: "blood_pressure",
        keywords: &["blood pressure", "bp", "systolic", "diastolic"],
        normal_range: (90.0, 140.0),
    },
    IndicatorSpec {
        id: "rbc",
        keywords: &["red blood cell", "rbc", "erythrocyte"],
        normal_range: (4.5, 6.0),
    },
    IndicatorSpec {
        id: "wbc",
        keywords: &["white blood cell", "wbc", "leukocyte"],
        normal_range: (4000.0, 11000.0),
    },
    IndicatorSpec {
        id: "platelets",
        keywords: &["platelet", "plt"],
        normal_range: (150000.0, 450000.0),
    },
];

/// Separators allowed between an alias and its value, followed by an unsigned ASCII decimal.
/// A bare fractional part (`.5`) is accepted.
const VALUE_SUFFIX: &str = r"[:\s]*([0-9]+(?:\.[0-9]+)?|\.[0-9]+)";

/// Value detected for an indicator before classification.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMatch {
    pub value: f64,
    pub keyword: &'static str,
}

struct CompiledAlias {
    keyword: &'static str,
    value_regex: Regex,
}

impl CompiledAlias {
    fn value_in(&self, lowered: &str) -> Option<f64> {
        let token = self.value_regex.captures(lowered)?.get(1)?.as_str();
        match token.parse::<f64>() {
            Ok(value) if value.is_finite() => Some(value),
            Ok(_) => {
                trace!(keyword = self.keyword, len = token.len(), "discarding out-of-range value");
                None
            }
            Err(err) => {
                trace!(keyword = self.keyword, token, %err, "discarding unparseable value");
                None
            }
        }
    }
}

/// Compiled form of an indicator table: one automaton for alias presence plus one anchored
/// value pattern per alias.
pub struct IndicatorMatcher {
    specs: &'static [IndicatorSpec],
    automaton: AhoCorasick,
    // Parallel to `specs`; alias order preserved. Pattern ids in the automaton follow the
    // flattened order of this table.
    aliases: Vec<Vec<CompiledAlias>>,
}

static DEFAULT_MATCHER: OnceCell<IndicatorMatcher> = OnceCell::new();

/// Matcher for [`INDICATORS`], compiled on first use and shared for the life of the process.
pub fn default_matcher() -> Result<&'static IndicatorMatcher> {
    DEFAULT_MATCHER.get_or_try_init(|| IndicatorMatcher::new(INDICATORS))
}

impl IndicatorMatcher {
    pub fn new(specs: &'static [IndicatorSpec]) -> Result<Self> {
        let mut patterns = Vec::new();
        let mut aliases = Vec::with_capacity(specs.len());
        for spec in specs {
            let mut compiled = Vec::with_capacity(spec.keywords.len());
            for &keyword in spec.keywords {
                let source = format!("{}{VALUE_SUFFIX}", regex::escape(keyword));
                let value_regex = Regex::new(&source).with_context(|| {
                    format!("invalid value pattern for indicator `{}`", spec.id)
                })?;
                patterns.push(keyword);
                compiled.push(CompiledAlias {
                    keyword,
                    value_regex,
                });
            }
            aliases.push(compiled);
        }
        let automaton =
            AhoCorasick::new(&patterns).context("failed to build indicator alias automaton")?;
        Ok(Self {
            specs,
            automaton,
            aliases,
        })
    }

    /// Detect a value per indicator, keyed by indicator id.
    pub fn extract_findings_raw(&self, text: &str) -> BTreeMap<&'static str, RawMatch> {
        let lowered = text.to_lowercase();
        let present = self.present_aliases(&lowered);

        let mut matches = BTreeMap::new();
        let mut pattern_idx = 0;
        for (spec, aliases) in self.specs.iter().zip(&self.aliases) {
            let first_pattern = pattern_idx;
            pattern_idx += aliases.len();
            for (offset, alias) in aliases.iter().enumerate() {
                if !present[first_pattern + offset] {
                    continue;
                }
                if let Some(value) = alias.value_in(&lowered) {
                    trace!(indicator = spec.id, keyword = alias.keyword, value, "indicator matched");
                    matches.insert(
                        spec.id,
                        RawMatch {
                            value,
                            keyword: alias.keyword,
                        },
                    );
                    break;
                }
            }
        }
        matches
    }

    /// Detect and classify every indicator found in `text`.
    pub fn extract_findings(&self, text: &str) -> BTreeMap<String, Finding> {
        let raw = self.extract_findings_raw(text);
        self.specs
            .iter()
            .filter_map(|spec| {
                raw.get(spec.id).map(|hit| {
                    (
                        spec.id.to_string(),
                        Finding::new(spec, hit.value, hit.keyword),
                    )
                })
            })
            .collect()
    }

    fn present_aliases(&self, lowered: &str) -> Vec<bool> {
        let mut present = vec![false; self.automaton.patterns_len()];
        for mat in self.automaton.find_overlapping_iter(lowered) {
            present[mat.pattern().as_usize()] = true;
        }
        present
    }
}
