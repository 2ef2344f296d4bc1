//! Session lifecycle routes (§4.8).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::warn;

use consult_store::{Session, SessionStatus, VoiceConfig};

use crate::app::AppState;
use crate::http::error::ApiError;

#[derive(Deserialize)]
pub struct CreateSessionRequest {
    pub pattern: String,
    #[serde(default)]
    pub voice_settings: Option<VoiceConfig>,
}

#[derive(Serialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub unique_link: String,
    pub room_name: String,
    pub token: String,
    pub warning: Option<String>,
}

/// POST /session/create — creates the session row, the WebRTC room, the
/// agent dispatch, and mints a token in one call. Room/dispatch/token
/// failures are non-fatal: the session row still exists, and the response
/// carries a `warning` instead of failing the request outright.
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<Json<CreateSessionResponse>, ApiError> {
    const KNOWN_PATTERNS: &[&str] = &["consultation", "interaction", "management", "interview"];
    let consultation_type = if KNOWN_PATTERNS.contains(&req.pattern.as_str()) {
        req.pattern.clone()
    } else {
        "consultation".to_string()
    };

    let mut voice_config = req.voice_settings.unwrap_or_default();
    voice_config.consultation_type = Some(consultation_type);

    let session = state.store.create_session(Some(voice_config))?;
    let mut warning = None;

    if let Err(e) = state
        .room_service
        .create_room(&session.room_name, state.config.room.empty_room_ttl_secs as u32)
        .await
    {
        warn!(error = %e, session_id = %session.session_id, "room creation failed");
        warning = Some(format!("room creation failed: {e}"));
    }

    if let Err(e) = state
        .room_service
        .create_agent_dispatch(&session.room_name, &state.config.room.agent_name)
        .await
    {
        warn!(error = %e, session_id = %session.session_id, "agent dispatch failed");
        warning.get_or_insert_with(|| format!("agent dispatch failed: {e}"));
    }

    let token = match state
        .room_service
        .create_token(&session.room_name, &session.session_id, 3600, true, true)
    {
        Ok(t) => t,
        Err(e) => {
            warn!(error = %e, session_id = %session.session_id, "token minting failed");
            warning.get_or_insert_with(|| format!("token minting failed: {e}"));
            String::new()
        }
    };

    Ok(Json(CreateSessionResponse {
        session_id: session.session_id,
        unique_link: session.unique_link,
        room_name: session.room_name,
        token,
        warning,
    }))
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<Session>, ApiError> {
    Ok(Json(state.store.get_session(&session_id)?))
}

pub async fn get_session_by_link(
    State(state): State<Arc<AppState>>,
    Path(link): Path<String>,
) -> Result<Json<Session>, ApiError> {
    if !consult_core::ids::is_valid_unique_link(&link) {
        return Err(crate::http::error::bad_request("invalid unique link"));
    }
    Ok(Json(state.store.get_session_by_link(&link)?))
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub status: SessionStatus,
}

pub async fn pause_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    state.store.update_status(&session_id, SessionStatus::Paused, false)?;
    Ok(Json(StatusResponse { status: SessionStatus::Paused }))
}

pub async fn resume_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    state.store.update_status(&session_id, SessionStatus::Active, false)?;
    Ok(Json(StatusResponse { status: SessionStatus::Active }))
}

/// POST /session/{id}/end — explicit tab-close. Idempotent over an
/// already-paused session (the state machine has no `paused -> paused`
/// edge, but ending twice must not be an error).
pub async fn end_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let session = state.store.get_session(&session_id)?;
    if session.status != SessionStatus::Paused {
        state.store.update_status(&session_id, SessionStatus::Paused, false)?;
    }
    Ok(Json(StatusResponse { status: SessionStatus::Paused }))
}

/// POST /session/{id}/confirm — `reviewing -> confirmed`, writes the
/// filesystem export artifacts (§6), and clears the runtime cache entry.
pub async fn confirm_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    state.store.update_status(&session_id, SessionStatus::Confirmed, false)?;
    state.runtime_cache.clear(&session_id);

    let session = state.store.get_session(&session_id)?;
    if let Some(anketa_value) = session.anketa_data.clone() {
        if let Ok(anketa) = serde_json::from_value::<consult_anketa::Anketa>(anketa_value) {
            let markdown = session.anketa_md.clone().unwrap_or_default();
            let state = Arc::clone(&state);
            let session_owned = session.clone();
            tokio::spawn(async move {
                crate::output::write_session_output(&state.output_dir, &session_owned, &anketa, &markdown).await;
            });
        }
    }

    let notifications = Arc::clone(&state.notifications);
    let company_name = session.company_name.clone();
    tokio::spawn(async move {
        notifications.on_session_confirmed(&session_id, company_name.as_deref()).await;
    });

    Ok(Json(StatusResponse { status: SessionStatus::Confirmed }))
}

/// POST /session/{id}/kill — admin force-decline. Best-effort room
/// deletion; the status override always lands regardless of room outcome.
pub async fn kill_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let session = state.store.get_session(&session_id)?;
    if let Err(e) = state.room_service.delete_room(&session.room_name).await {
        warn!(error = %e, session_id, "room deletion failed during kill");
    }
    state.store.update_status(&session_id, SessionStatus::Declined, true)?;
    state.runtime_cache.clear(&session_id);
    Ok(Json(StatusResponse { status: SessionStatus::Declined }))
}

#[derive(Serialize)]
pub struct ReconnectResponse {
    pub token: String,
    pub status: SessionStatus,
}

/// GET /session/{id}/reconnect — idempotent: never mutates status, but
/// repairs a vanished room so the client's next join attempt succeeds.
pub async fn reconnect_get(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<ReconnectResponse>, ApiError> {
    let session = state.store.get_session(&session_id)?;

    let rooms = state.room_service.list_rooms().await.unwrap_or_default();
    let room_exists = rooms.iter().any(|r| r.name == session.room_name);
    if !room_exists {
        if let Err(e) = state
            .room_service
            .create_room(&session.room_name, state.config.room.empty_room_ttl_secs as u32)
            .await
        {
            warn!(error = %e, session_id, "room recreation failed during reconnect");
        }
        if let Err(e) = state
            .room_service
            .create_agent_dispatch(&session.room_name, &state.config.room.agent_name)
            .await
        {
            warn!(error = %e, session_id, "agent redispatch failed during reconnect");
        }
    } else {
        let _ = state.room_service.update_room_metadata(&session.room_name, "reconnect").await;
    }

    let token = state
        .room_service
        .create_token(&session.room_name, &session.session_id, 3600, true, true)?;
    Ok(Json(ReconnectResponse { token, status: session.status }))
}

/// POST /session/{id}/reconnect — non-idempotent: validates the session is
/// resumable and transitions `paused -> active` before minting a token.
pub async fn reconnect_post(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<ReconnectResponse>, ApiError> {
    let session = state.store.get_session(&session_id)?;
    if session.status != SessionStatus::Active && session.status != SessionStatus::Paused {
        return Err(crate::http::error::bad_request(
            "session must be active or paused to reconnect",
        ));
    }
    if session.status == SessionStatus::Paused {
        state.store.update_status(&session_id, SessionStatus::Active, false)?;
    }

    let token = state
        .room_service
        .create_token(&session.room_name, &session.session_id, 3600, true, true)?;
    Ok(Json(ReconnectResponse { token, status: SessionStatus::Active }))
}
