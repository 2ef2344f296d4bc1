//! `/session/{id}/anketa` (§4.1, §4.8): the projection used by the review UI
//! and the raw-write escape hatch used by the bridge's forced-sync path.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use consult_anketa::Anketa;
use consult_store::SessionStatus;

use crate::app::AppState;
use crate::http::error::{bad_request, ApiError};

const MAX_ANKETA_MD_CHARS: usize = 100_000;
const MAX_ANKETA_KEYS: usize = 200;

#[derive(Serialize)]
pub struct AnketaView {
    pub anketa_data: Option<serde_json::Value>,
    pub anketa_md: Option<String>,
    pub status: SessionStatus,
    pub runtime_status: Option<String>,
    pub company_name: Option<String>,
    pub updated_at: String,
    pub completion_rate: f64,
}

pub async fn get_anketa(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<AnketaView>, ApiError> {
    let session = state.store.get_session(&session_id)?;
    let completion_rate = session
        .anketa_data
        .as_ref()
        .and_then(|v| serde_json::from_value::<Anketa>(v.clone()).ok())
        .map(|a| a.completion_rate())
        .unwrap_or(0.0);
    let runtime_status = state.runtime_cache.get(&session_id).map(|s| s.as_str().to_string());

    Ok(Json(AnketaView {
        anketa_data: session.anketa_data,
        anketa_md: session.anketa_md,
        status: session.status,
        runtime_status,
        company_name: session.company_name,
        updated_at: session.updated_at,
        completion_rate,
    }))
}

#[derive(Deserialize)]
pub struct PutAnketaRequest {
    pub anketa_data: serde_json::Value,
    #[serde(default)]
    pub anketa_md: Option<String>,
}

/// A raw anketa overwrite, bypassing extraction entirely — used when an
/// operator hand-edits the review document.
pub async fn put_anketa(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(req): Json<PutAnketaRequest>,
) -> Result<Json<AnketaView>, ApiError> {
    if let Some(obj) = req.anketa_data.as_object() {
        if obj.len() > MAX_ANKETA_KEYS {
            return Err(bad_request(format!("anketa_data exceeds {MAX_ANKETA_KEYS} keys")));
        }
    } else {
        return Err(bad_request("anketa_data must be a JSON object"));
    }
    if let Some(md) = &req.anketa_md {
        if md.chars().count() > MAX_ANKETA_MD_CHARS {
            return Err(bad_request(format!("anketa_md exceeds {MAX_ANKETA_MD_CHARS} characters")));
        }
    }

    state.store.update_anketa(&session_id, &req.anketa_data, req.anketa_md.as_deref())?;
    get_anketa(State(state), Path(session_id)).await
}
