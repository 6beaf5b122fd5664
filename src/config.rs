//! Environment-driven settings, read once at startup.

/// Runtime settings. Everything is optional with sensible defaults; the
/// parsing rules themselves are compile-time constants, not configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Socket address the server binds to.
    pub addr: String,
    /// Base URL of the OCR sidecar; image extraction yields empty text
    /// when unset.
    pub ocr_url: Option<String>,
}

impl Settings {
    pub fn from_env() -> Self {
        Self {
            addr: std::env::var("DOCPARSE_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string()),
            ocr_url: std::env::var("DOCPARSE_OCR_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
        }
    }
}
