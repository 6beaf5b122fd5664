//! Policy clause extraction: ordered pattern table, first-match-wins per line.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::parser::round3;
use crate::schema::{ClauseType, PolicyClause};

const HINT_NO_CLAUSES: &str = "No known policy clauses matched";

const CLAUSE_CONFIDENCE: f64 = 0.75;
/// Quality floor with zero clauses; each clause adds 0.08, capped at 1.0.
const QUALITY_FLOOR: f64 = 0.4;
const QUALITY_PER_CLAUSE: f64 = 0.08;
/// Titles are the matching line cut to this many characters.
const TITLE_CHARS: usize = 24;

/// Priority-ordered clause patterns; the first match wins for a line.
static CLAUSE_PATTERNS: Lazy<Vec<(ClauseType, Regex)>> = Lazy::new(|| {
    [
        (ClauseType::PreExisting, r"既往症"),
        (ClauseType::WaitingPeriod, r"等待期"),
        (ClauseType::Exclusion, r"免责|责任免除"),
        (ClauseType::Disclosure, r"告知"),
        (ClauseType::DiseaseDefinition, r"疾病定义|特定疾病"),
    ]
    .into_iter()
    .map(|(clause_type, pattern)| {
        let regex = Regex::new(&format!("(?i){pattern}")).expect("clause pattern is valid");
        (clause_type, regex)
    })
    .collect()
});

/// Clauses, quality, and hints for one policy parse.
#[derive(Debug, Clone)]
pub struct PolicyFindings {
    pub sections: Vec<PolicyClause>,
    pub quality_score: f64,
    pub hints: Vec<String>,
}

/// Scan policy text line-by-line for recognized clause types.
///
/// Every non-empty line is independently eligible to produce exactly zero or
/// one clause; earlier lines never suppress later ones.
pub fn parse_policy_sections(text: &str) -> PolicyFindings {
    let mut sections = Vec::new();

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some((clause_type, _)) = CLAUSE_PATTERNS
            .iter()
            .find(|(_, regex)| regex.is_match(line))
        {
            sections.push(PolicyClause {
                clause_type: *clause_type,
                title: truncate_chars(line, TITLE_CHARS),
                content: line.to_string(),
                confidence: CLAUSE_CONFIDENCE,
            });
        }
    }

    let hints = if sections.is_empty() {
        vec![HINT_NO_CLAUSES.to_string()]
    } else {
        Vec::new()
    };

    let quality_score =
        round3((QUALITY_FLOOR + sections.len() as f64 * QUALITY_PER_CLAUSE).min(1.0));

    PolicyFindings {
        sections,
        quality_score,
        hints,
    }
}

/// Cut a line to at most `max` characters, never splitting a scalar value.
fn truncate_chars(line: &str, max: usize) -> String {
    line.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clause_types_matched_per_line() {
        let findings = parse_policy_sections("第1条 既往症定义\n第2条 等待期说明");
        assert_eq!(findings.sections.len(), 2);
        assert_eq!(findings.sections[0].clause_type, ClauseType::PreExisting);
        assert_eq!(findings.sections[1].clause_type, ClauseType::WaitingPeriod);
        assert!(findings.quality_score > 0.4);
        assert!(findings.hints.is_empty());
    }

    #[test]
    fn test_first_pattern_wins_within_a_line() {
        // Line mentions both a pre-existing condition and the waiting period;
        // pre_existing is earlier in the priority order.
        let findings = parse_policy_sections("既往症在等待期内不予赔付");
        assert_eq!(findings.sections.len(), 1);
        assert_eq!(findings.sections[0].clause_type, ClauseType::PreExisting);
    }

    #[test]
    fn test_exclusion_alternatives() {
        let findings = parse_policy_sections("第5条 责任免除\n第6条 免责条款");
        assert_eq!(findings.sections.len(), 2);
        assert!(findings
            .sections
            .iter()
            .all(|s| s.clause_type == ClauseType::Exclusion));
    }

    #[test]
    fn test_title_truncated_to_24_chars() {
        let long_line = format!("告知{}", "条".repeat(40));
        let findings = parse_policy_sections(&long_line);
        assert_eq!(findings.sections.len(), 1);
        assert_eq!(findings.sections[0].title.chars().count(), 24);
        assert_eq!(findings.sections[0].content, long_line);
    }

    #[test]
    fn test_confidence_and_quality_constants() {
        let findings = parse_policy_sections("特定疾病定义如下");
        assert_eq!(findings.sections.len(), 1);
        assert_eq!(findings.sections[0].confidence, 0.75);
        assert_eq!(findings.quality_score, 0.48);
    }

    #[test]
    fn test_no_clauses_emits_hint_and_floor_quality() {
        let findings = parse_policy_sections("普通条款，无关键词");
        assert!(findings.sections.is_empty());
        assert_eq!(findings.quality_score, 0.4);
        assert_eq!(findings.hints, vec![HINT_NO_CLAUSES.to_string()]);
    }
}
