//! `/session/{id}/dialogue`, `/runtime-status`, `/voice-config` (§4.8).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use consult_runtime_cache::RuntimeStatus;
use consult_store::{DialogueTurn, SessionStatus, VoiceConfig};

use crate::app::AppState;
use crate::http::error::{bad_request, ApiError};

const MAX_DIALOGUE_TURNS: usize = 500;
const MAX_DURATION_SECONDS: f64 = 86_400.0;

#[derive(Deserialize)]
pub struct PutDialogueRequest {
    pub dialogue_history: Vec<DialogueTurn>,
    pub duration_seconds: f64,
    #[serde(default)]
    pub status: Option<SessionStatus>,
}

#[derive(Serialize)]
pub struct Ack {
    pub ok: bool,
}

/// Bulk history sync — the agent forwards its own transcript over HTTP.
/// This bypasses `ConsultationOrchestrator::on_dialogue_turn` deliberately:
/// that method is for incremental turns subject to debounced extraction,
/// while this route replaces the whole array in one write.
pub async fn put_dialogue(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(req): Json<PutDialogueRequest>,
) -> Result<Json<Ack>, ApiError> {
    if req.dialogue_history.len() > MAX_DIALOGUE_TURNS {
        return Err(bad_request(format!("dialogue_history exceeds {MAX_DIALOGUE_TURNS} turns")));
    }
    if !(0.0..=MAX_DURATION_SECONDS).contains(&req.duration_seconds) {
        return Err(bad_request(format!("duration_seconds must be within [0, {MAX_DURATION_SECONDS}]")));
    }

    state
        .store
        .update_dialogue(&session_id, &req.dialogue_history, req.duration_seconds, req.status)?;
    Ok(Json(Ack { ok: true }))
}

#[derive(Deserialize)]
pub struct PutRuntimeStatusRequest {
    pub status: String,
}

pub async fn put_runtime_status(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(req): Json<PutRuntimeStatusRequest>,
) -> Result<Json<Ack>, ApiError> {
    let status = RuntimeStatus::parse(&req.status)
        .ok_or_else(|| bad_request(format!("unknown runtime status: {}", req.status)))?;
    state.runtime_cache.set(&session_id, status)?;
    Ok(Json(Ack { ok: true }))
}

/// Accepted `voice_config` keys and, where relevant, their numeric ranges
/// (§4.1). Validated by hand against a loose JSON object rather than a
/// direct `VoiceConfig` deserialize, so an unknown key is rejected instead
/// of silently ignored.
fn validate_voice_config_patch(value: &serde_json::Value) -> Result<VoiceConfig, ApiError> {
    let obj = value.as_object().ok_or_else(|| bad_request("voice_config must be a JSON object"))?;
    let mut patch = VoiceConfig::default();

    for (key, val) in obj {
        match key.as_str() {
            "consultation_type" => {
                let s = expect_string(val, key)?;
                if !["consultation", "interaction", "management", "interview"].contains(&s.as_str()) {
                    return Err(bad_request(
                        "consultation_type must be one of 'consultation', 'interaction', 'management', 'interview'",
                    ));
                }
                patch.consultation_type = Some(s);
            }
            "voice_gender" => {
                let s = expect_string(val, key)?;
                if !["male", "female", "neutral"].contains(&s.as_str()) {
                    return Err(bad_request("voice_gender must be 'male', 'female', or 'neutral'"));
                }
                patch.voice_gender = Some(s);
            }
            "voice_tone" => {
                patch.voice_tone = Some(expect_string(val, key)?);
            }
            "language" => {
                patch.language = Some(expect_string(val, key)?);
            }
            "speech_speed" => {
                let n = expect_number(val, key)?;
                if !(0.5..=2.0).contains(&n) {
                    return Err(bad_request("speech_speed must be within [0.5, 2.0]"));
                }
                patch.speech_speed = Some(n);
            }
            "silence_duration_ms" => {
                let n = expect_number(val, key)?;
                if !(300.0..=10000.0).contains(&n) {
                    return Err(bad_request("silence_duration_ms must be within [300, 10000]"));
                }
                patch.silence_duration_ms = Some(n as u64);
            }
            "llm_provider" => {
                patch.llm_provider = Some(expect_string(val, key)?);
            }
            "verbosity" => {
                let s = expect_string(val, key)?;
                if !["concise", "normal", "verbose"].contains(&s.as_str()) {
                    return Err(bad_request("verbosity must be 'concise', 'normal', or 'verbose'"));
                }
                patch.verbosity = Some(s);
            }
            other => return Err(bad_request(format!("unknown voice_config key: {other}"))),
        }
    }

    Ok(patch)
}

fn expect_string(val: &serde_json::Value, key: &str) -> Result<String, ApiError> {
    val.as_str()
        .map(str::to_string)
        .ok_or_else(|| bad_request(format!("voice_config.{key} must be a string")))
}

fn expect_number(val: &serde_json::Value, key: &str) -> Result<f64, ApiError> {
    val.as_f64().ok_or_else(|| bad_request(format!("voice_config.{key} must be a number")))
}

pub async fn put_voice_config(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<Ack>, ApiError> {
    let patch = validate_voice_config_patch(&body)?;
    state.store.update_voice_config(&session_id, patch)?;

    let session = state.store.get_session(&session_id)?;
    let _ = state.room_service.update_room_metadata(&session.room_name, "voice_config_updated").await;

    Ok(Json(Ack { ok: true }))
}
