use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::instrument;

use consult_core::error::{ConsultError, Result};
use consult_core::ids::{new_session_id, new_unique_link};

use crate::status::validate_transition;
use crate::types::{DocumentContext, Session, SessionStatus, SessionSummary, VoiceConfig};

/// Thread-safe session store backed by a single SQLite connection (§4.1).
/// A `Mutex` is sufficient for the single-node target; every write commits
/// immediately so a crash never leaves a half-applied mutation.
pub struct SessionStore {
    db: Mutex<Connection>,
}

impl SessionStore {
    /// Wrap an already `init_db`-initialised connection.
    pub fn new(conn: Connection) -> Self {
        Self { db: Mutex::new(conn) }
    }

    #[instrument(skip(self, voice_config))]
    pub fn create_session(&self, voice_config: Option<VoiceConfig>) -> Result<Session> {
        let session_id = new_session_id();
        let unique_link = new_unique_link();
        let room_name = format!("consultation-{session_id}");
        let now = chrono::Utc::now().to_rfc3339();
        let voice_config_json = match &voice_config {
            Some(vc) => Some(serde_json::to_string(vc)?),
            None => None,
        };

        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO sessions
                (session_id, room_name, unique_link, status, created_at, updated_at,
                 dialogue_history, duration_seconds, voice_config)
             VALUES (?1, ?2, ?3, 'active', ?4, ?4, '[]', 0.0, ?5)",
            params![session_id, room_name, unique_link, now, voice_config_json],
        )?;

        Ok(Session {
            session_id,
            unique_link,
            room_name,
            status: SessionStatus::Active,
            dialogue_history: Vec::new(),
            anketa_data: None,
            anketa_md: None,
            document_context: None,
            voice_config,
            company_name: None,
            contact_name: None,
            duration_seconds: 0.0,
            output_dir: None,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    #[instrument(skip(self))]
    pub fn get_session(&self, session_id: &str) -> Result<Session> {
        let db = self.db.lock().unwrap();
        db.query_row(
            SELECT_SESSION,
            params![session_id],
            row_to_session,
        )
        .optional()?
        .ok_or_else(|| ConsultError::NotFound { id: session_id.to_string() })
    }

    #[instrument(skip(self))]
    pub fn get_session_by_link(&self, unique_link: &str) -> Result<Session> {
        let db = self.db.lock().unwrap();
        db.query_row(
            &SELECT_SESSION.replace("session_id = ?1", "unique_link = ?1"),
            params![unique_link],
            row_to_session,
        )
        .optional()?
        .ok_or_else(|| ConsultError::NotFound { id: unique_link.to_string() })
    }

    /// Full-record overwrite. Bumps `updated_at`; callers that need
    /// read-modify-write safety should prefer the narrow atomic operations
    /// below instead (§4.1).
    #[instrument(skip(self, session))]
    pub fn update_session(&self, session: &Session) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let dialogue_json = serde_json::to_string(&session.dialogue_history)?;
        let anketa_json = session
            .anketa_data
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let doc_ctx_json = session
            .document_context
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let voice_config_json = session
            .voice_config
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let db = self.db.lock().unwrap();
        let rows = db.execute(
            "UPDATE sessions SET
                room_name = ?1, status = ?2, dialogue_history = ?3, anketa_data = ?4,
                anketa_md = ?5, company_name = ?6, contact_name = ?7,
                duration_seconds = ?8, output_dir = ?9, document_context = ?10,
                voice_config = ?11, updated_at = ?12
             WHERE session_id = ?13",
            params![
                session.room_name,
                session.status.as_str(),
                dialogue_json,
                anketa_json,
                session.anketa_md,
                session.company_name,
                session.contact_name,
                session.duration_seconds,
                session.output_dir,
                doc_ctx_json,
                voice_config_json,
                now,
                session.session_id,
            ],
        )?;
        ensure_row_found(rows, &session.session_id)
    }

    /// Atomic narrow write over `anketa_data`/`anketa_md` only. Also
    /// re-derives the denormalized `company_name`/`contact_name` columns
    /// from the anketa payload, if present, so list views stay cheap.
    #[instrument(skip(self, anketa_data, anketa_md))]
    pub fn update_anketa(
        &self,
        session_id: &str,
        anketa_data: &serde_json::Value,
        anketa_md: Option<&str>,
    ) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let anketa_json = serde_json::to_string(anketa_data)?;
        let company_name = anketa_data
            .get("company_name")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        let contact_name = anketa_data
            .get("contact_name")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        let db = self.db.lock().unwrap();
        let rows = db.execute(
            "UPDATE sessions SET
                anketa_data = ?1, anketa_md = COALESCE(?2, anketa_md),
                company_name = COALESCE(?3, company_name),
                contact_name = COALESCE(?4, contact_name),
                updated_at = ?5
             WHERE session_id = ?6",
            params![anketa_json, anketa_md, company_name, contact_name, now, session_id],
        )?;
        ensure_row_found(rows, session_id)
    }

    /// Atomic write of dialogue + duration, optionally requesting a status
    /// transition. The transition is validated through the state machine
    /// before the write is committed — an invalid transition aborts the
    /// whole call, including the dialogue/duration portion.
    #[instrument(skip(self, dialogue))]
    pub fn update_dialogue(
        &self,
        session_id: &str,
        dialogue: &[crate::types::DialogueTurn],
        duration_seconds: f64,
        status: Option<SessionStatus>,
    ) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let dialogue_json = serde_json::to_string(dialogue)?;

        let db = self.db.lock().unwrap();
        if let Some(new_status) = status {
            let current: String = db
                .query_row(
                    "SELECT status FROM sessions WHERE session_id = ?1",
                    params![session_id],
                    |row| row.get(0),
                )
                .optional()?
                .ok_or_else(|| ConsultError::NotFound { id: session_id.to_string() })?;
            let current = SessionStatus::parse(&current).unwrap_or(SessionStatus::Active);
            validate_transition(current, new_status)?;

            let rows = db.execute(
                "UPDATE sessions SET
                    dialogue_history = ?1, duration_seconds = ?2, status = ?3, updated_at = ?4
                 WHERE session_id = ?5",
                params![dialogue_json, duration_seconds, new_status.as_str(), now, session_id],
            )?;
            ensure_row_found(rows, session_id)
        } else {
            let rows = db.execute(
                "UPDATE sessions SET
                    dialogue_history = ?1, duration_seconds = ?2, updated_at = ?3
                 WHERE session_id = ?4",
                params![dialogue_json, duration_seconds, now, session_id],
            )?;
            ensure_row_found(rows, session_id)
        }
    }

    /// Validate and persist a status transition. `force=true` is an admin
    /// override that skips §4.2 validation entirely.
    #[instrument(skip(self))]
    pub fn update_status(&self, session_id: &str, new_status: SessionStatus, force: bool) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let db = self.db.lock().unwrap();

        if !force {
            let current: String = db
                .query_row(
                    "SELECT status FROM sessions WHERE session_id = ?1",
                    params![session_id],
                    |row| row.get(0),
                )
                .optional()?
                .ok_or_else(|| ConsultError::NotFound { id: session_id.to_string() })?;
            let current = SessionStatus::parse(&current).unwrap_or(SessionStatus::Active);
            validate_transition(current, new_status)?;
        }

        let rows = db.execute(
            "UPDATE sessions SET status = ?1, updated_at = ?2 WHERE session_id = ?3",
            params![new_status.as_str(), now, session_id],
        )?;
        ensure_row_found(rows, session_id)
    }

    /// Atomic merge over a filtered subset of recognised voice_config keys.
    #[instrument(skip(self, fields))]
    pub fn update_voice_config(&self, session_id: &str, fields: VoiceConfig) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let db = self.db.lock().unwrap();

        let existing: Option<String> = db
            .query_row(
                "SELECT voice_config FROM sessions WHERE session_id = ?1",
                params![session_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| ConsultError::NotFound { id: session_id.to_string() })?;

        let mut merged: VoiceConfig = match existing {
            Some(json) => serde_json::from_str(&json).unwrap_or_default(),
            None => VoiceConfig::default(),
        };
        merged.merge(fields);
        let merged_json = serde_json::to_string(&merged)?;

        let rows = db.execute(
            "UPDATE sessions SET voice_config = ?1, updated_at = ?2 WHERE session_id = ?3",
            params![merged_json, now, session_id],
        )?;
        ensure_row_found(rows, session_id)
    }

    #[instrument(skip(self))]
    pub fn update_metadata(
        &self,
        session_id: &str,
        company_name: Option<&str>,
        contact_name: Option<&str>,
    ) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let db = self.db.lock().unwrap();
        let rows = db.execute(
            "UPDATE sessions SET
                company_name = COALESCE(?1, company_name),
                contact_name = COALESCE(?2, contact_name),
                updated_at = ?3
             WHERE session_id = ?4",
            params![company_name, contact_name, now, session_id],
        )?;
        ensure_row_found(rows, session_id)
    }

    #[instrument(skip(self, context))]
    pub fn update_document_context(&self, session_id: &str, context: &DocumentContext) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let context_json = serde_json::to_string(context)?;
        let db = self.db.lock().unwrap();
        let rows = db.execute(
            "UPDATE sessions SET document_context = ?1, updated_at = ?2 WHERE session_id = ?3",
            params![context_json, now, session_id],
        )?;
        ensure_row_found(rows, session_id)
    }

    /// Paginated list of lightweight summaries. `limit` is clamped to
    /// `[1, 200]`; never returns `dialogue_history` or `anketa_data`.
    #[instrument(skip(self))]
    pub fn list_sessions_summary(
        &self,
        status: Option<SessionStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<SessionSummary>, i64)> {
        let limit = limit.clamp(1, 200);
        let offset = offset.max(0);
        let db = self.db.lock().unwrap();

        let (rows, total): (Vec<SessionSummary>, i64) = if let Some(status) = status {
            let status_str = status.as_str();
            let total: i64 = db.query_row(
                "SELECT COUNT(*) FROM sessions WHERE status = ?1",
                params![status_str],
                |row| row.get(0),
            )?;
            let mut stmt = db.prepare(
                "SELECT session_id, status, company_name, contact_name, document_context,
                        created_at, updated_at
                 FROM sessions WHERE status = ?1
                 ORDER BY updated_at DESC LIMIT ?2 OFFSET ?3",
            )?;
            let rows = stmt
                .query_map(params![status_str, limit, offset], row_to_summary)?
                .filter_map(|r| r.ok())
                .collect();
            (rows, total)
        } else {
            let total: i64 = db.query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;
            let mut stmt = db.prepare(
                "SELECT session_id, status, company_name, contact_name, document_context,
                        created_at, updated_at
                 FROM sessions
                 ORDER BY updated_at DESC LIMIT ?1 OFFSET ?2",
            )?;
            let rows = stmt
                .query_map(params![limit, offset], row_to_summary)?
                .filter_map(|r| r.ok())
                .collect();
            (rows, total)
        };

        Ok((rows, total))
    }

    /// Bulk delete. No cascade — associated room/files are cleaned up by
    /// callers.
    #[instrument(skip(self, session_ids))]
    pub fn delete_sessions(&self, session_ids: &[String]) -> Result<u64> {
        if session_ids.is_empty() {
            return Ok(0);
        }
        let db = self.db.lock().unwrap();
        let placeholders: Vec<String> = (1..=session_ids.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "DELETE FROM sessions WHERE session_id IN ({})",
            placeholders.join(", ")
        );
        let params: Vec<&dyn rusqlite::ToSql> =
            session_ids.iter().map(|s| s as &dyn rusqlite::ToSql).collect();
        let rows = db.execute(&sql, params.as_slice())?;
        Ok(rows as u64)
    }
}

const SELECT_SESSION: &str = "SELECT session_id, room_name, unique_link, status, created_at, \
updated_at, dialogue_history, anketa_data, anketa_md, company_name, contact_name, \
duration_seconds, output_dir, document_context, voice_config \
FROM sessions WHERE session_id = ?1";

fn ensure_row_found(rows_changed: usize, session_id: &str) -> Result<()> {
    if rows_changed == 0 {
        Err(ConsultError::NotFound { id: session_id.to_string() })
    } else {
        Ok(())
    }
}

fn row_to_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<Session> {
    let status_str: String = row.get(3)?;
    let dialogue_json: String = row.get(6)?;
    let anketa_json: Option<String> = row.get(7)?;
    let doc_ctx_json: Option<String> = row.get(13)?;
    let voice_config_json: Option<String> = row.get(14)?;

    Ok(Session {
        session_id: row.get(0)?,
        room_name: row.get(1)?,
        unique_link: row.get(2)?,
        status: SessionStatus::parse(&status_str).unwrap_or(SessionStatus::Active),
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
        dialogue_history: serde_json::from_str(&dialogue_json).unwrap_or_default(),
        anketa_data: anketa_json.and_then(|j| serde_json::from_str(&j).ok()),
        anketa_md: row.get(8)?,
        company_name: row.get(9)?,
        contact_name: row.get(10)?,
        duration_seconds: row.get(11)?,
        output_dir: row.get(12)?,
        document_context: doc_ctx_json.and_then(|j| serde_json::from_str(&j).ok()),
        voice_config: voice_config_json.and_then(|j| serde_json::from_str(&j).ok()),
    })
}

fn row_to_summary(row: &rusqlite::Row<'_>) -> rusqlite::Result<SessionSummary> {
    let status_str: String = row.get(1)?;
    let doc_ctx_json: Option<String> = row.get(4)?;
    Ok(SessionSummary {
        session_id: row.get(0)?,
        status: SessionStatus::parse(&status_str).unwrap_or(SessionStatus::Active),
        company_name: row.get(2)?,
        contact_name: row.get(3)?,
        has_documents: doc_ctx_json.is_some(),
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;

    fn store() -> SessionStore {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        SessionStore::new(conn)
    }

    #[test]
    fn create_and_get_round_trips() {
        let store = store();
        let created = store.create_session(None).unwrap();
        let fetched = store.get_session(&created.session_id).unwrap();
        assert_eq!(created.session_id, fetched.session_id);
        assert_eq!(fetched.status, SessionStatus::Active);
        assert_eq!(fetched.duration_seconds, 0.0);
    }

    #[test]
    fn get_by_link_matches_get_by_id() {
        let store = store();
        let created = store.create_session(None).unwrap();
        let by_link = store.get_session_by_link(&created.unique_link).unwrap();
        assert_eq!(by_link.session_id, created.session_id);
    }

    #[test]
    fn get_missing_session_is_not_found() {
        let store = store();
        let err = store.get_session("deadbeef").unwrap_err();
        assert!(matches!(err, ConsultError::NotFound { .. }));
    }

    #[test]
    fn update_status_rejects_invalid_transition() {
        let store = store();
        let created = store.create_session(None).unwrap();
        let err = store
            .update_status(&created.session_id, SessionStatus::Confirmed, false)
            .unwrap_err();
        assert!(matches!(err, ConsultError::InvalidTransition { .. }));
    }

    #[test]
    fn update_status_force_skips_validation() {
        let store = store();
        let created = store.create_session(None).unwrap();
        store
            .update_status(&created.session_id, SessionStatus::Confirmed, true)
            .unwrap();
        let fetched = store.get_session(&created.session_id).unwrap();
        assert_eq!(fetched.status, SessionStatus::Confirmed);
    }

    #[test]
    fn update_anketa_derives_company_and_contact_name() {
        let store = store();
        let created = store.create_session(None).unwrap();
        let anketa = serde_json::json!({"company_name": "Acme Corp", "contact_name": "Jane"});
        store.update_anketa(&created.session_id, &anketa, Some("# Acme")).unwrap();
        let fetched = store.get_session(&created.session_id).unwrap();
        assert_eq!(fetched.company_name.as_deref(), Some("Acme Corp"));
        assert_eq!(fetched.contact_name.as_deref(), Some("Jane"));
        assert_eq!(fetched.anketa_md.as_deref(), Some("# Acme"));
    }

    #[test]
    fn update_voice_config_merges_without_clobbering() {
        let store = store();
        let created = store.create_session(None).unwrap();
        store
            .update_voice_config(
                &created.session_id,
                VoiceConfig { language: Some("en".into()), ..Default::default() },
            )
            .unwrap();
        store
            .update_voice_config(
                &created.session_id,
                VoiceConfig { voice_gender: Some("female".into()), ..Default::default() },
            )
            .unwrap();
        let fetched = store.get_session(&created.session_id).unwrap();
        let vc = fetched.voice_config.unwrap();
        assert_eq!(vc.language.as_deref(), Some("en"));
        assert_eq!(vc.voice_gender.as_deref(), Some("female"));
    }

    #[test]
    fn list_sessions_summary_clamps_limit_and_filters_by_status() {
        let store = store();
        for _ in 0..3 {
            store.create_session(None).unwrap();
        }
        let (rows, total) = store.list_sessions_summary(Some(SessionStatus::Active), 500, 0).unwrap();
        assert_eq!(total, 3);
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn delete_sessions_removes_rows_and_reports_count() {
        let store = store();
        let a = store.create_session(None).unwrap();
        let b = store.create_session(None).unwrap();
        let deleted = store.delete_sessions(&[a.session_id.clone()]).unwrap();
        assert_eq!(deleted, 1);
        assert!(store.get_session(&a.session_id).is_err());
        assert!(store.get_session(&b.session_id).is_ok());
    }
}
