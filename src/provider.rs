//! Text extraction provider boundary.
//!
//! Providers are total: every failure mode (corrupt payload, library error,
//! sidecar unreachable) collapses to an empty string so the pipeline stays
//! best-effort. Failures are logged, never propagated.

use tracing::{debug, warn};

/// Capability boundary for turning document bytes into plain text.
#[async_trait::async_trait]
pub trait TextProvider: Send + Sync {
    /// Best-effort PDF text extraction.
    async fn extract_pdf(&self, data: &[u8]) -> String;
    /// Best-effort image OCR; skipped entirely when OCR is disabled.
    async fn extract_image(&self, data: &[u8], ocr_enabled: bool) -> String;
}

/// Default provider: local lopdf extraction for PDFs, optional HTTP OCR
/// sidecar for images.
pub struct LocalProvider {
    ocr_url: Option<String>,
    client: reqwest::Client,
}

impl LocalProvider {
    pub fn new(ocr_url: Option<String>) -> Self {
        Self {
            ocr_url,
            client: reqwest::Client::new(),
        }
    }

    async fn ocr_request(&self, base_url: &str, data: &[u8]) -> anyhow::Result<String> {
        use reqwest::multipart::{Form, Part};

        let part = Part::bytes(data.to_vec()).file_name("image");
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(format!("{}/ocr", base_url))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("OCR sidecar error ({}): {}", status, error_text);
        }

        #[derive(serde::Deserialize)]
        struct OcrResponse {
            text: String,
        }

        let body: OcrResponse = response.json().await?;
        Ok(body.text)
    }
}

#[async_trait::async_trait]
impl TextProvider for LocalProvider {
    async fn extract_pdf(&self, data: &[u8]) -> String {
        match pdf_text(data) {
            Ok(text) => text,
            Err(e) => {
                warn!("PDF extraction failed: {}", e);
                String::new()
            }
        }
    }

    async fn extract_image(&self, data: &[u8], ocr_enabled: bool) -> String {
        if !ocr_enabled {
            return String::new();
        }
        let Some(url) = &self.ocr_url else {
            debug!("No OCR sidecar configured; skipping image extraction");
            return String::new();
        };
        match self.ocr_request(url, data).await {
            Ok(text) => text,
            Err(e) => {
                warn!("OCR extraction failed: {}", e);
                String::new()
            }
        }
    }
}

/// Extract text from a PDF using lopdf, joining pages with blank lines so
/// page boundaries become paragraph boundaries downstream.
fn pdf_text(data: &[u8]) -> anyhow::Result<String> {
    use lopdf::Document;
    use std::io::Cursor;

    let doc = Document::load_from(Cursor::new(data))
        .map_err(|e| anyhow::anyhow!("Failed to load PDF: {}", e))?;

    let mut pages = Vec::new();
    for (page_num, _) in doc.get_pages() {
        if let Ok(content) = doc.extract_text(&[page_num]) {
            pages.push(content);
        }
    }

    Ok(pages.join("\n\n"))
}

/// Provider that extracts nothing, for exercising the pipeline in isolation.
#[cfg(test)]
pub struct NullProvider;

#[cfg(test)]
#[async_trait::async_trait]
impl TextProvider for NullProvider {
    async fn extract_pdf(&self, _data: &[u8]) -> String {
        String::new()
    }

    async fn extract_image(&self, _data: &[u8], _ocr_enabled: bool) -> String {
        String::new()
    }
}
