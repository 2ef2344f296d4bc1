//! `/session/{id}/export/{format}` (§4.10): Markdown attachment or
//! print-ready HTML.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};

use consult_anketa::Anketa;
use consult_export::{content_disposition, export_filename, render_markdown, render_print_html};

use crate::app::AppState;
use crate::http::error::{bad_request, ApiError};

pub async fn export_session(
    State(state): State<Arc<AppState>>,
    Path((session_id, format)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let session = state.store.get_session(&session_id)?;
    let anketa: Anketa = session
        .anketa_data
        .as_ref()
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default();
    let session_type = "consultation";
    let company_name = if anketa.company_name.is_empty() { "anketa".to_string() } else { anketa.company_name.clone() };

    match format.as_str() {
        "md" => {
            let markdown = session.anketa_md.clone().unwrap_or_else(|| render_markdown(&anketa, session_type));
            let filename = export_filename(&company_name, "md");
            let mut resp = markdown.into_response();
            resp.headers_mut().insert(CONTENT_TYPE, "text/markdown; charset=utf-8".parse().unwrap());
            resp.headers_mut()
                .insert(CONTENT_DISPOSITION, content_disposition(&filename).parse().unwrap());
            Ok(resp)
        }
        "pdf" => {
            let markdown = session.anketa_md.clone().unwrap_or_else(|| render_markdown(&anketa, session_type));
            let html = render_print_html(&markdown, &company_name, session_type);
            let filename = export_filename(&company_name, "html");
            let mut resp = html.into_response();
            resp.headers_mut().insert(CONTENT_TYPE, "text/html; charset=utf-8".parse().unwrap());
            resp.headers_mut().insert(
                CONTENT_DISPOSITION,
                format!("inline; filename=\"{}\"", filename.ascii).parse().unwrap(),
            );
            Ok(resp)
        }
        other => Err(bad_request(format!("unsupported export format: {other}"))),
    }
}
