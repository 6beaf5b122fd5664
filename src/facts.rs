//! Health-report fact extraction using fixed regex patterns.
//!
//! Pure functions, no async. Each pattern is searched against the whole
//! text and contributes at most one fact (first match wins per category).
//! Confidences are fixed per pattern, not learned.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::parser::round3;
use crate::schema::{FactCategory, HealthFact};

const HINT_NO_FACTS: &str = "No structured health facts matched; please check text quality";

const BLOOD_PRESSURE_CONFIDENCE: f64 = 0.82;
const BLOOD_GLUCOSE_CONFIDENCE: f64 = 0.78;
/// Quality floor with zero facts; each fact adds 0.2, capped at 1.0.
const QUALITY_FLOOR: f64 = 0.45;
const QUALITY_PER_FACT: f64 = 0.2;

static BLOOD_PRESSURE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{2,3})\s*/\s*(\d{2,3})").expect("blood pressure pattern is valid"));
static BLOOD_GLUCOSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(血糖|glucose)[^\d]*(\d+(?:\.\d+)?)").expect("glucose pattern is valid")
});

/// Facts, quality, and hints for one report parse.
#[derive(Debug, Clone)]
pub struct ReportFindings {
    pub facts: Vec<HealthFact>,
    pub quality_score: f64,
    pub hints: Vec<String>,
}

/// Scan report text for recognized health values.
pub fn parse_report_facts(text: &str) -> ReportFindings {
    let mut facts = Vec::new();

    if let Some(cap) = BLOOD_PRESSURE.captures(text) {
        facts.push(HealthFact {
            category: FactCategory::BloodPressure,
            label: FactCategory::BloodPressure.label().to_string(),
            value: Some(format!("{}/{}", &cap[1], &cap[2])),
            confidence: BLOOD_PRESSURE_CONFIDENCE,
            evidence: cap[0].to_string(),
        });
    }

    if let Some(cap) = BLOOD_GLUCOSE.captures(text) {
        facts.push(HealthFact {
            category: FactCategory::BloodGlucose,
            label: FactCategory::BloodGlucose.label().to_string(),
            value: Some(cap[2].to_string()),
            confidence: BLOOD_GLUCOSE_CONFIDENCE,
            evidence: cap[0].to_string(),
        });
    }

    let hints = if facts.is_empty() {
        vec![HINT_NO_FACTS.to_string()]
    } else {
        Vec::new()
    };

    // Linear confidence proxy, not a statistical estimate.
    let quality_score = round3((QUALITY_FLOOR + facts.len() as f64 * QUALITY_PER_FACT).min(1.0));

    ReportFindings {
        facts,
        quality_score,
        hints,
    }
}
