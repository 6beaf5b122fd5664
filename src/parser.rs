//! Text normalization and quality-scoring pipeline.
//!
//! Pure functions plus one async orchestration entry point. The pipeline
//! segments extracted text into paragraphs, derives a bounded quality score
//! from length and paragraph count, and attaches advisory hints. No state,
//! no side effects beyond tracing.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::provider::TextProvider;
use crate::schema::Paragraph;

/// Hint emitted when neither raw text nor an encoded payload is supplied.
pub const HINT_EMPTY_PAYLOAD: &str = "Empty payload";
const HINT_PDF_SPARSE: &str = "PDF text sparse; OCR fallback may be required";
const HINT_OCR_EMPTY: &str = "OCR could not detect enough text";
const HINT_UNKNOWN_MIME: &str = "Unknown mime_type, treating as plain text";
const HINT_LOW_QUALITY: &str = "Low OCR quality, recommend re-uploading a clearer file";
const HINT_NO_PARAGRAPHS: &str = "No readable paragraphs extracted";
const HINT_FEW_PARAGRAPHS: &str = "Very few paragraphs found; result may be incomplete";

/// Character count of a "well-formed, fully extracted document".
const LENGTH_DENOMINATOR: f64 = 2400.0;
/// Paragraph count of a well-formed document.
const PARAGRAPH_DENOMINATOR: f64 = 20.0;
/// Below this score the low-quality hint fires.
const LOW_QUALITY_THRESHOLD: f64 = 0.35;
/// PDF extractions shorter than this (trimmed chars) are considered sparse.
const PDF_SPARSE_CHARS: usize = 30;

static BLANK_LINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n").expect("blank-line pattern is valid"));

/// Result of parsing a single document, request-scoped.
#[derive(Debug, Clone)]
pub struct ParseOutput {
    pub text: String,
    pub paragraphs: Vec<Paragraph>,
    pub quality_score: f64,
    pub hints: Vec<String>,
}

impl ParseOutput {
    /// True when no usable content came out of the parse.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.paragraphs.is_empty()
    }
}

/// Errors that propagate to the HTTP boundary as client failures.
///
/// Provider failures never appear here; they collapse to empty text inside
/// the provider itself.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
}

/// Parse a document from either raw text or a base64 payload.
///
/// A non-blank `raw_text` wins outright and the payload is ignored. An empty
/// request yields a zero-score output with a single advisory hint.
pub async fn parse_document(
    provider: &dyn TextProvider,
    raw_text: &str,
    content_base64: &str,
    mime_type: &str,
    enable_ocr: bool,
) -> Result<ParseOutput, ParseError> {
    if !raw_text.trim().is_empty() {
        return Ok(finish(raw_text.to_string(), Vec::new()));
    }
    if !content_base64.trim().is_empty() {
        let payload = BASE64.decode(content_base64.trim())?;
        return Ok(parse_bytes(provider, &payload, mime_type, enable_ocr).await);
    }
    Ok(ParseOutput {
        text: String::new(),
        paragraphs: Vec::new(),
        quality_score: 0.0,
        hints: vec![HINT_EMPTY_PAYLOAD.to_string()],
    })
}

/// Parse decoded document bytes, dispatching on the declared mime type.
///
/// Extraction is best-effort: provider failures surface only as empty text
/// plus hints, never as errors.
pub async fn parse_bytes(
    provider: &dyn TextProvider,
    payload: &[u8],
    mime_type: &str,
    enable_ocr: bool,
) -> ParseOutput {
    let mut hints = Vec::new();

    let text = if mime_type == "application/pdf" {
        let text = provider.extract_pdf(payload).await;
        if text.trim().chars().count() < PDF_SPARSE_CHARS && enable_ocr {
            hints.push(HINT_PDF_SPARSE.to_string());
        }
        text
    } else if mime_type.starts_with("image/") {
        let text = provider.extract_image(payload, enable_ocr).await;
        if text.trim().is_empty() {
            hints.push(HINT_OCR_EMPTY.to_string());
        }
        text
    } else {
        hints.push(HINT_UNKNOWN_MIME.to_string());
        decode_lossy(payload)
    };

    finish(text, hints)
}

/// Segment, score, and attach quality hints to extracted text.
fn finish(text: String, mut hints: Vec<String>) -> ParseOutput {
    let paragraphs = to_paragraphs(&text);
    let quality_score = calc_quality_score(&text, &paragraphs);
    hints.extend(quality_hints(quality_score, paragraphs.len()));
    ParseOutput {
        text,
        paragraphs,
        quality_score,
        hints: dedup(hints),
    }
}

/// Split text into non-empty paragraphs on runs of blank lines.
///
/// Line endings are normalized first; blocks that trim to nothing are
/// discarded, so indices stay contiguous from 1. Page is always 1 — the
/// provider boundary does not carry pagination.
pub fn to_paragraphs(text: &str) -> Vec<Paragraph> {
    let normalized = text.replace("\r\n", "\n");
    BLANK_LINES
        .split(&normalized)
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .enumerate()
        .map(|(i, block)| Paragraph {
            loc: format!("para_{}", i + 1),
            page: 1,
            index: (i + 1) as u32,
            text: block.to_string(),
        })
        .collect()
}

/// Combine a length score and a paragraph-count score into `[0, 1]`.
pub fn calc_quality_score(text: &str, paragraphs: &[Paragraph]) -> f64 {
    let length_score = (text.trim().chars().count() as f64 / LENGTH_DENOMINATOR).min(1.0);
    let para_score = (paragraphs.len() as f64 / PARAGRAPH_DENOMINATOR).min(1.0);
    round3((length_score * 0.7 + para_score * 0.3).clamp(0.0, 1.0))
}

/// Advisory hints derived from the score and paragraph count.
///
/// The zero-paragraph case fires both paragraph hints; the overlap is part
/// of the contract with existing consumers.
pub fn quality_hints(score: f64, paragraph_count: usize) -> Vec<String> {
    let mut hints = Vec::new();
    if score < LOW_QUALITY_THRESHOLD {
        hints.push(HINT_LOW_QUALITY.to_string());
    }
    if paragraph_count == 0 {
        hints.push(HINT_NO_PARAGRAPHS.to_string());
    }
    if paragraph_count < 3 {
        hints.push(HINT_FEW_PARAGRAPHS.to_string());
    }
    hints
}

/// Round to 3 decimal places.
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Drop duplicate hints, preserving first-occurrence order.
pub fn dedup(hints: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    hints.into_iter().filter(|h| seen.insert(h.clone())).collect()
}

/// Best-effort UTF-8 decode; invalid sequences are dropped, never an error.
fn decode_lossy(payload: &[u8]) -> String {
    let text = String::from_utf8_lossy(payload);
    if text.contains('\u{FFFD}') {
        text.replace('\u{FFFD}', "")
    } else {
        text.into_owned()
    }
}
