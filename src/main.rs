//! docparse - document parsing server for health reports and policy documents.
//!
//! Extracts text from uploaded documents (PDF, image, plain text) and applies
//! fixed regex heuristics to surface health-report values and insurance-policy
//! clause types.

mod clauses;
mod config;
mod facts;
mod parser;
mod provider;
mod schema;

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use config::Settings;
use parser::ParseOutput;
use provider::{LocalProvider, TextProvider};
use schema::{
    ErrorResponse, ParseDocumentRequest, ParseDocumentResponse, ParsePolicyRequest,
    ParsePolicyResponse, ParseReportRequest, ParseReportResponse,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    provider: Arc<dyn TextProvider>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docparse=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env();
    match &settings.ocr_url {
        Some(url) => info!("OCR sidecar configured at {}", url),
        None => info!("No OCR sidecar configured; image extraction disabled"),
    }

    let state = AppState {
        provider: Arc::new(LocalProvider::new(settings.ocr_url.clone())),
    };

    let app = app(state);

    let listener = tokio::net::TcpListener::bind(&settings.addr).await?;
    info!("Server listening on http://{}", settings.addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the router.
fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/parse/document", post(parse_document_api))
        .route("/parse/report", post(parse_report_api))
        .route("/parse/policy", post(parse_policy_api))
        .route("/parse/upload", post(parse_upload))
        .layer(DefaultBodyLimit::max(25 * 1024 * 1024)) // 25MB
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint.
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Parse a document supplied as raw text or a base64 payload.
async fn parse_document_api(
    State(state): State<AppState>,
    Json(request): Json<ParseDocumentRequest>,
) -> Result<Json<ParseDocumentResponse>, ApiError> {
    info!(
        "Parsing document: {} ({})",
        request.filename, request.mime_type
    );

    let output = parser::parse_document(
        state.provider.as_ref(),
        request.raw_text.as_deref().unwrap_or(""),
        request.content_base64.as_deref().unwrap_or(""),
        &request.mime_type,
        request.enable_ocr,
    )
    .await
    .map_err(|e| bad_request(e.to_string(), Vec::new()))?;

    into_document_response(output)
}

/// Scan report text for structured health facts.
async fn parse_report_api(Json(request): Json<ParseReportRequest>) -> Json<ParseReportResponse> {
    let findings = facts::parse_report_facts(&request.text);
    Json(ParseReportResponse {
        facts: findings.facts,
        quality_score: findings.quality_score,
        hints: findings.hints,
    })
}

/// Scan policy text for recognized clause types.
async fn parse_policy_api(Json(request): Json<ParsePolicyRequest>) -> Json<ParsePolicyResponse> {
    let findings = clauses::parse_policy_sections(&request.text);
    Json(ParsePolicyResponse {
        sections: findings.sections,
        quality_score: findings.quality_score,
        hints: findings.hints,
    })
}

/// Parse an uploaded file (multipart), running the same document pipeline on
/// the raw bytes. The `mime_type` field overrides the part's content type.
async fn parse_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ParseDocumentResponse>, ApiError> {
    let mut filename = String::from("document");
    let mut mime_type: Option<String> = None;
    let mut enable_ocr = true;
    let mut file_data = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("Multipart error: {}", e), Vec::new()))?
    {
        match field.name() {
            Some("file") => {
                if let Some(name) = field.file_name() {
                    filename = name.to_string();
                }
                if mime_type.is_none() {
                    mime_type = field.content_type().map(str::to_string);
                }
                file_data = field
                    .bytes()
                    .await
                    .map_err(|e| bad_request(format!("Failed to read file: {}", e), Vec::new()))?
                    .to_vec();
            }
            Some("mime_type") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| bad_request(format!("Multipart error: {}", e), Vec::new()))?;
                if !value.trim().is_empty() {
                    mime_type = Some(value.trim().to_string());
                }
            }
            Some("enable_ocr") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| bad_request(format!("Multipart error: {}", e), Vec::new()))?;
                enable_ocr = value.trim() != "false";
            }
            _ => {}
        }
    }

    if file_data.is_empty() {
        return Err(bad_request("No file uploaded".to_string(), Vec::new()));
    }

    let mime_type = mime_type.unwrap_or_else(|| guess_mime_type(&filename));
    info!(
        "Received file: {} ({} bytes) as {}",
        filename,
        file_data.len(),
        mime_type
    );

    let output =
        parser::parse_bytes(state.provider.as_ref(), &file_data, &mime_type, enable_ocr).await;
    into_document_response(output)
}

// ============================================================================
// Helper functions
// ============================================================================

/// Map a parse output to the wire response; a fully empty result is a client
/// failure carrying the explanatory hints.
fn into_document_response(output: ParseOutput) -> Result<Json<ParseDocumentResponse>, ApiError> {
    if output.is_empty() {
        return Err(bad_request("parse failed".to_string(), output.hints));
    }
    Ok(Json(ParseDocumentResponse {
        text: output.text,
        paragraphs: output.paragraphs,
        quality_score: output.quality_score,
        hints: output.hints,
    }))
}

fn bad_request(error: String, hints: Vec<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error, hints }))
}

/// Infer a mime type from the filename when the upload declares none.
fn guess_mime_type(filename: &str) -> String {
    let lower = filename.to_lowercase();
    if lower.ends_with(".pdf") {
        "application/pdf".to_string()
    } else if lower.ends_with(".png") {
        "image/png".to_string()
    } else if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
        "image/jpeg".to_string()
    } else {
        "text/plain".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use provider::NullProvider;
    use tower::ServiceExt;

    fn test_app() -> Router {
        app(AppState {
            provider: Arc::new(NullProvider),
        })
    }

    fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = test_app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_parse_document_with_raw_text() {
        let response = test_app()
            .oneshot(json_request(
                "/parse/document",
                serde_json::json!({ "raw_text": "第1段\n\n第2段", "mime_type": "text/plain" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body["quality_score"].as_f64().unwrap() > 0.0);
        assert_eq!(body["paragraphs"].as_array().unwrap().len(), 2);
        assert_eq!(body["paragraphs"][0]["loc"], "para_1");
    }

    #[tokio::test]
    async fn test_parse_document_empty_payload_is_bad_request() {
        let response = test_app()
            .oneshot(json_request("/parse/document", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "parse failed");
        assert!(body["hints"]
            .as_array()
            .unwrap()
            .iter()
            .any(|h| h == "Empty payload"));
    }

    #[tokio::test]
    async fn test_parse_document_invalid_base64_is_bad_request() {
        let response = test_app()
            .oneshot(json_request(
                "/parse/document",
                serde_json::json!({ "content_base64": "@@not-base64@@" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_parse_report() {
        let response = test_app()
            .oneshot(json_request(
                "/parse/report",
                serde_json::json!({ "text": "血压 150/95" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let facts = body["facts"].as_array().unwrap();
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0]["category"], "blood_pressure");
        assert_eq!(facts[0]["value"], "150/95");
    }

    #[tokio::test]
    async fn test_parse_policy() {
        let response = test_app()
            .oneshot(json_request(
                "/parse/policy",
                serde_json::json!({ "text": "既往症定义\n等待期 90 天" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let sections = body["sections"].as_array().unwrap();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0]["clause_type"], "pre_existing");
        assert_eq!(sections[1]["clause_type"], "waiting_period");
    }

    #[tokio::test]
    async fn test_parse_upload_plain_text_file() {
        let boundary = "XBOUNDARYX";
        let body = format!(
            "--{b}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"note.txt\"\r\n\
             Content-Type: text/plain\r\n\r\n\
             first paragraph\r\n\r\nsecond paragraph\r\n\
             --{b}--\r\n",
            b = boundary
        );
        let request = Request::builder()
            .method("POST")
            .uri("/parse/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap();

        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body["text"]
            .as_str()
            .unwrap()
            .contains("first paragraph"));
        assert_eq!(body["paragraphs"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_parse_upload_without_file_is_bad_request() {
        let boundary = "XBOUNDARYX";
        let body = format!(
            "--{b}\r\n\
             Content-Disposition: form-data; name=\"mime_type\"\r\n\r\n\
             text/plain\r\n\
             --{b}--\r\n",
            b = boundary
        );
        let request = Request::builder()
            .method("POST")
            .uri("/parse/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap();

        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_guess_mime_type() {
        assert_eq!(guess_mime_type("scan.PDF"), "application/pdf");
        assert_eq!(guess_mime_type("photo.jpeg"), "image/jpeg");
        assert_eq!(guess_mime_type("notes.txt"), "text/plain");
    }
}
