//! Request/response wire types for the parse endpoints.
//!
//! These mirror the JSON contract consumed by the task worker: three POST
//! operations (`/parse/document`, `/parse/report`, `/parse/policy`) plus a
//! multipart upload variant of the document parse.

use serde::{Deserialize, Serialize};

fn default_filename() -> String {
    "unknown".to_string()
}

fn default_mime_type() -> String {
    "application/pdf".to_string()
}

fn default_true() -> bool {
    true
}

/// Body of `POST /parse/document`.
///
/// Exactly one of `raw_text` / `content_base64` is expected; when both are
/// present a non-blank `raw_text` wins and the payload is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ParseDocumentRequest {
    #[serde(default = "default_filename")]
    pub filename: String,
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
    #[serde(default)]
    pub content_base64: Option<String>,
    #[serde(default)]
    pub raw_text: Option<String>,
    #[serde(default = "default_true")]
    pub enable_ocr: bool,
}

/// A blank-line-delimited block of extracted text, 1-indexed in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paragraph {
    pub loc: String,
    pub page: u32,
    pub index: u32,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParseDocumentResponse {
    pub text: String,
    pub paragraphs: Vec<Paragraph>,
    pub quality_score: f64,
    pub hints: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParseReportRequest {
    pub text: String,
}

/// Category of a recognized health-report value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactCategory {
    BloodPressure,
    BloodGlucose,
}

impl FactCategory {
    pub fn label(self) -> &'static str {
        match self {
            Self::BloodPressure => "blood_pressure",
            Self::BloodGlucose => "blood_glucose",
        }
    }
}

/// A structured value surfaced from health-report text by a fixed pattern.
#[derive(Debug, Clone, Serialize)]
pub struct HealthFact {
    pub category: FactCategory,
    pub label: String,
    pub value: Option<String>,
    pub confidence: f64,
    /// Substring of the source text that triggered the match.
    pub evidence: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParseReportResponse {
    pub facts: Vec<HealthFact>,
    pub quality_score: f64,
    pub hints: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParsePolicyRequest {
    pub text: String,
}

/// Recognized insurance-policy clause categories, in match priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClauseType {
    PreExisting,
    WaitingPeriod,
    Exclusion,
    Disclosure,
    DiseaseDefinition,
}

/// A single matching line from policy text.
#[derive(Debug, Clone, Serialize)]
pub struct PolicyClause {
    pub clause_type: ClauseType,
    /// The matching line truncated to 24 characters.
    pub title: String,
    /// The full matching line.
    pub content: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParsePolicyResponse {
    pub sections: Vec<PolicyClause>,
    pub quality_score: f64,
    pub hints: Vec<String>,
}

/// Error body returned with non-2xx parse responses.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<String>,
}
