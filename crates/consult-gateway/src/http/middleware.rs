//! Cross-cutting middleware (§4.8): request ID, session-ID path validation,
//! and security headers, composed in `app::build_router` in that exact
//! order. Grounded on the sibling gateway's `security_headers` middleware
//! (response-header mutation after `next.run`), generalized here to three
//! independent passes instead of one.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderValue, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Json, Response};

use uuid::Uuid;

use consult_core::ids::is_valid_session_id;

use crate::app::AppState;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Reserved first path segments under `/session/...` that are not session
/// identifiers and must not be validated as one.
const RESERVED_SEGMENTS: &[&str] = &["create", "by-link"];

/// Inject `X-Request-ID` into the response: the inbound header if the
/// caller supplied one, otherwise a fresh 12-hex id.
pub async fn request_id(req: Request<Body>, next: Next) -> Response {
    let incoming = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let mut resp = next.run(req).await;

    let id = incoming.unwrap_or_else(generate_request_id);
    if let Ok(value) = HeaderValue::from_str(&id) {
        resp.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    resp
}

fn generate_request_id() -> String {
    Uuid::new_v4().simple().to_string()[..12].to_string()
}

/// The single point of path-traversal defence for session IDs (§4.8): every
/// `/session/{id}/...` route's path segment must be an 8-hex identifier,
/// except the reserved `create`/`by-link` segments.
pub async fn validate_session_id(
    State(_state): State<Arc<AppState>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();
    let mut segments = path.split('/').filter(|s| !s.is_empty());

    if segments.next() == Some("session") {
        if let Some(candidate) = segments.next() {
            if !RESERVED_SEGMENTS.contains(&candidate) && !is_valid_session_id(candidate) {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({"error": "invalid session id", "code": "INVALID_INPUT"})),
                )
                    .into_response();
            }
        }
    }

    next.run(req).await
}

/// Strict security headers. JSON API responses get a locked-down CSP with no
/// script/style allowance at all. The one exception is the print-HTML export
/// (§4.10): it is the only response carrying inline `<style>` and an
/// `onclick` handler, both authored by this server (never from session
/// content — all anketa text is HTML-escaped before interpolation), so it
/// gets a CSP that allows inline style/script but nothing cross-origin.
pub async fn security_headers(req: Request<Body>, next: Next) -> Response {
    let mut resp = next.run(req).await;
    let is_html = resp
        .headers()
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("text/html"));

    let headers = resp.headers_mut();
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert("x-content-type-options", HeaderValue::from_static("nosniff"));
    headers.insert("referrer-policy", HeaderValue::from_static("strict-origin-when-cross-origin"));
    let csp = if is_html {
        "default-src 'none'; style-src 'unsafe-inline'; script-src 'unsafe-inline'; img-src data:; frame-ancestors 'none'; base-uri 'none'"
    } else {
        "default-src 'none'; frame-ancestors 'none'; base-uri 'none'"
    };
    headers.insert("content-security-policy", HeaderValue::from_str(csp).unwrap());
    resp
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_segments_are_recognized() {
        assert!(RESERVED_SEGMENTS.contains(&"create"));
        assert!(RESERVED_SEGMENTS.contains(&"by-link"));
    }

    #[test]
    fn request_id_generator_produces_twelve_hex_chars() {
        let id = generate_request_id();
        assert_eq!(id.len(), 12);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
