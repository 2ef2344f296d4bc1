//! The consultation orchestrator itself (§4.6) — "the heart of the system".
//! One instance is shared by every session the bridge process hosts; it owns
//! no network transport of its own, only the collaborator handles it is
//! constructed with.
//!
//! The background-extraction debounce here is stricter than the original
//! voice consultant's unconditional "fire every 6 messages": at most one
//! extraction runs per session at a time, and at most one further
//! extraction is queued behind it. Triggers that arrive while a queued
//! extraction is already pending are coalesced into that single pending
//! slot rather than growing a backlog.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{error, info, warn};

use consult_anketa::Anketa;
use consult_core::error::Result;
use consult_extraction::{ChatLlm, ExtractionCoordinator};
use consult_runtime_cache::{RuntimeCache, RuntimeStatus};
use consult_store::{DialogueTurn, DocumentContext, SessionStatus, SessionStore};

use crate::collaborators::{AnketaRenderer, KnowledgeBase, NotificationManager, ResearchEngine};
use crate::instructions::LlmInstructions;
use crate::prompts::{build_enriched_prompt, build_review_prompt, format_anketa_for_voice, BASE_CONSULTANT_PROMPT};
use crate::state::SessionStateTable;

/// Messages-since-last-extract threshold before a background extraction is
/// triggered (§4.6 step 2).
const EXTRACT_MESSAGE_THRESHOLD: u32 = 6;
/// Minimum total messages before the first extraction is worth running.
const MIN_TOTAL_MESSAGES: u32 = 4;
/// Completion rate crossing this threshold triggers KB enrichment (§4.6 step 3).
const KB_ENRICHMENT_THRESHOLD: f64 = 0.3;
/// Completion rate crossing this threshold switches to the review prompt (§4.6 step 5).
const REVIEW_THRESHOLD: f64 = 0.7;

#[derive(Default)]
struct ExtractionGate {
    running: bool,
    pending: bool,
}

/// Per-session collaborator handle used to push instruction updates onto the
/// live realtime LLM. Registered by the bridge when it attaches to a room;
/// absent in standalone/test contexts.
pub type LlmHandle = Arc<dyn LlmInstructions>;

pub struct ConsultationOrchestrator<L: ChatLlm> {
    store: Arc<SessionStore>,
    runtime_cache: Arc<RuntimeCache>,
    state: SessionStateTable,
    extraction: ExtractionCoordinator<L>,
    kb: Arc<dyn KnowledgeBase>,
    research: Arc<dyn ResearchEngine>,
    notifications: Arc<dyn NotificationManager>,
    renderer: Arc<dyn AnketaRenderer>,
    gates: DashMap<String, Arc<AsyncMutex<ExtractionGate>>>,
    llm_handles: DashMap<String, LlmHandle>,
}

impl<L: ChatLlm + Send + Sync + 'static> ConsultationOrchestrator<L> {
    pub fn new(
        store: Arc<SessionStore>,
        runtime_cache: Arc<RuntimeCache>,
        extraction: ExtractionCoordinator<L>,
        kb: Arc<dyn KnowledgeBase>,
        research: Arc<dyn ResearchEngine>,
        notifications: Arc<dyn NotificationManager>,
        renderer: Arc<dyn AnketaRenderer>,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            runtime_cache,
            state: SessionStateTable::new(),
            extraction,
            kb,
            research,
            notifications,
            renderer,
            gates: DashMap::new(),
            llm_handles: DashMap::new(),
        })
    }

    /// Register (or replace) the live LLM-instructions handle for a session.
    /// Called by the bridge once it has constructed the realtime session.
    pub fn attach_llm(&self, session_id: &str, handle: LlmHandle) {
        self.llm_handles.insert(session_id.to_string(), handle);
    }

    pub fn detach_llm(&self, session_id: &str) {
        self.llm_handles.remove(session_id);
        self.state.remove(session_id);
    }

    fn llm_for(&self, session_id: &str) -> Option<LlmHandle> {
        self.llm_handles.get(session_id).map(|h| h.clone())
    }

    /// §4.6 "Event: dialogue turn appended".
    pub async fn on_dialogue_turn(&self, session_id: &str, turn: DialogueTurn) -> Result<()> {
        let mut session = self.store.get_session(session_id)?;
        session.dialogue_history.push(turn.clone());
        self.store.update_dialogue(session_id, &session.dialogue_history, session.duration_seconds, None)?;

        if turn.content.contains('+') {
            if let Some(hint) = consult_extraction::prompt::detect_country_hint(&[turn.clone()]) {
                self.state.with_mut(session_id, |s| {
                    if s.country_hint.is_none() {
                        s.country_hint = Some(hint);
                    }
                });
            }
        }

        let should_extract = self.state.with_mut(session_id, |s| {
            s.total_messages += 1;
            s.messages_since_last_extract += 1;
            if s.messages_since_last_extract >= EXTRACT_MESSAGE_THRESHOLD && s.total_messages >= MIN_TOTAL_MESSAGES {
                s.messages_since_last_extract = 0;
                true
            } else {
                false
            }
        });

        if should_extract {
            self.schedule_extraction(session_id);
        }
        Ok(())
    }

    /// §4.9 / §4.6 "Event: document context updated" — bypasses the counter
    /// gate and extracts immediately.
    pub async fn on_document_context_updated(&self, session_id: &str, context: DocumentContext) -> Result<()> {
        self.store.update_document_context(session_id, &context)?;
        if let Some(llm) = self.llm_for(session_id) {
            llm.update_instructions("A document was just uploaded; use it to fill in missing details.").await;
        }
        self.schedule_extraction(session_id);
        Ok(())
    }

    /// §4.6 "Event: session finalized" — the `_finalize_and_save` equivalent.
    /// Runs a final extraction inline (not debounced), persists it with its
    /// rendered Markdown, transitions to `reviewing`, and fires a
    /// best-effort notification. The last known-good anketa is kept if this
    /// extraction fails.
    pub async fn on_session_finalized(&self, session_id: &str) -> Result<()> {
        let session = self.store.get_session(session_id)?;
        let prior = session
            .anketa_data
            .as_ref()
            .and_then(|v| serde_json::from_value::<Anketa>(v.clone()).ok());

        let anketa = self
            .extraction
            .extract(
                &session.dialogue_history,
                session.duration_seconds,
                session.document_context.as_ref(),
                prior.as_ref(),
            )
            .await;

        let markdown = self.renderer.render_markdown(&anketa);
        let anketa_value = serde_json::to_value(&anketa)?;
        if let Err(e) = self.store.update_anketa(session_id, &anketa_value, Some(&markdown)) {
            error!(error = %e, session_id, "failed to persist final anketa; retaining last known-good value");
        }
        self.store.update_metadata(
            session_id,
            Some(anketa.company_name.as_str()).filter(|s| !s.is_empty()),
            Some(anketa.contact_name.as_str()).filter(|s| !s.is_empty()),
        )?;

        // Finalization is an internal, trusted transition and may fire from
        // `active` or `paused` alike (e.g. a participant leaving mid-pause),
        // so it forces the transition rather than going through the normal
        // validation table (§4.2 only allows `active -> reviewing`).
        if session.status != SessionStatus::Reviewing && !consult_store::is_terminal(session.status) {
            if let Err(e) = self.store.update_status(session_id, SessionStatus::Reviewing, true) {
                warn!(error = %e, session_id, "could not transition to reviewing at finalization");
            }
        }
        self.runtime_cache.set(session_id, RuntimeStatus::Completed).ok();

        let notifications = Arc::clone(&self.notifications);
        let session_id_owned = session_id.to_string();
        let company = Some(anketa.company_name.clone()).filter(|s| !s.is_empty());
        tokio::spawn(async move {
            notifications.on_session_confirmed(&session_id_owned, company.as_deref()).await;
        });

        Ok(())
    }

    /// Debounced extraction trigger (§4.6 step 2, §5 "at most one extraction
    /// task per session"). Spawns a background task on first call; later
    /// calls while a task is already running set a single pending flag
    /// instead of spawning again.
    fn schedule_extraction(self: &Arc<Self>, session_id: &str) {
        let gate = self
            .gates
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(ExtractionGate::default())))
            .clone();

        let this = Arc::clone(self);
        let session_id = session_id.to_string();
        tokio::spawn(async move {
            {
                let mut g = gate.lock().await;
                if g.running {
                    g.pending = true;
                    return;
                }
                g.running = true;
            }
            loop {
                this.run_one_extraction(&session_id).await;
                let mut g = gate.lock().await;
                if g.pending {
                    g.pending = false;
                    continue;
                }
                g.running = false;
                break;
            }
        });
    }

    async fn run_one_extraction(&self, session_id: &str) {
        self.runtime_cache.set(session_id, RuntimeStatus::Processing).ok();

        let session = match self.store.get_session(session_id) {
            Ok(s) => s,
            Err(e) => {
                error!(error = %e, session_id, "session vanished before extraction could run");
                return;
            }
        };

        let consultation_type = session
            .voice_config
            .as_ref()
            .and_then(|vc| vc.consultation_type.clone());
        self.state.with_mut(session_id, |s| s.consultation_type = consultation_type.clone());

        if consultation_type.as_deref() == Some("interview") {
            let interview = self
                .extraction
                .extract_interview(&session.dialogue_history, session.duration_seconds)
                .await;
            if let Ok(value) = serde_json::to_value(&interview) {
                if let Err(e) = self.store.update_anketa(session_id, &value, None) {
                    warn!(error = %e, session_id, "failed to persist interview anketa");
                }
            }
            self.runtime_cache.set(session_id, RuntimeStatus::Idle).ok();
            return;
        }

        let prior = session
            .anketa_data
            .as_ref()
            .and_then(|v| serde_json::from_value::<Anketa>(v.clone()).ok());

        let anketa = self
            .extraction
            .extract(
                &session.dialogue_history,
                session.duration_seconds,
                session.document_context.as_ref(),
                prior.as_ref(),
            )
            .await;

        let completion_rate = anketa.completion_rate();
        let anketa_value = match serde_json::to_value(&anketa) {
            Ok(v) => v,
            Err(e) => {
                error!(error = %e, session_id, "failed to serialize extracted anketa");
                self.runtime_cache.set(session_id, RuntimeStatus::Error).ok();
                return;
            }
        };
        if let Err(e) = self.store.update_anketa(session_id, &anketa_value, None) {
            warn!(error = %e, session_id, "failed to persist extracted anketa; will retry on next tick");
            self.runtime_cache.set(session_id, RuntimeStatus::Error).ok();
            return;
        }

        self.maybe_enrich_kb(session_id, &anketa, completion_rate).await;
        self.maybe_kickoff_research(session_id, &anketa).await;
        self.maybe_switch_to_review(session_id, &anketa, completion_rate).await;

        self.runtime_cache.set(session_id, RuntimeStatus::Idle).ok();
    }

    /// §4.6 step 3.
    async fn maybe_enrich_kb(&self, session_id: &str, anketa: &Anketa, completion_rate: f64) {
        let already = self.state.snapshot(session_id).kb_enriched;
        if already || completion_rate < KB_ENRICHMENT_THRESHOLD {
            return;
        }

        let industry_text =
            format!("{} {} {}", anketa.industry, anketa.company_name, anketa.services.join(" "));
        let Some(industry) = self.kb.detect_industry(&industry_text).await else {
            return;
        };
        let Some(enrichment) = self.kb.build_for_voice(&industry).await else {
            return;
        };

        self.state.with_mut(session_id, |s| s.kb_enriched = true);

        if let Some(llm) = self.llm_for(session_id) {
            let prompt = build_enriched_prompt(BASE_CONSULTANT_PROMPT, &enrichment);
            if !llm.update_instructions(&prompt).await {
                warn!(session_id, "KB-enriched instruction update failed");
            }
        }
        info!(session_id, industry = %industry, "knowledge-base enrichment installed");
    }

    /// §4.6 step 4.
    async fn maybe_kickoff_research(&self, session_id: &str, anketa: &Anketa) {
        let already = self.state.snapshot(session_id).research_launched;
        if already {
            return;
        }
        let has_website = anketa.website.as_deref().is_some_and(|w| !w.trim().is_empty());
        let has_company_and_industry = !anketa.company_name.is_empty() && !anketa.industry.is_empty();
        if !has_website && !has_company_and_industry {
            return;
        }

        self.state.with_mut(session_id, |s| s.research_launched = true);

        let research = Arc::clone(&self.research);
        let website = anketa.website.clone();
        let industry = if anketa.industry.is_empty() { None } else { Some(anketa.industry.clone()) };
        let company_name = if anketa.company_name.is_empty() { None } else { Some(anketa.company_name.clone()) };
        let store = Arc::clone(&self.store);
        let session_id_owned = session_id.to_string();

        tokio::spawn(async move {
            let result = tokio::time::timeout(
                std::time::Duration::from_secs(30),
                research.research(website.as_deref(), industry.as_deref(), company_name.as_deref()),
            )
            .await;

            let Ok(result) = result else {
                warn!(session_id = %session_id_owned, "research task exceeded its soft budget");
                return;
            };
            if !result.has_data() {
                return;
            }

            if let Ok(session) = store.get_session(&session_id_owned) {
                let mut context = session.document_context.unwrap_or_default();
                if let Some(site) = &result.website_data {
                    if let Some(desc) = &site.description {
                        context.key_facts.push(desc.clone());
                    }
                    context.services_mentioned.extend(site.services.clone());
                }
                context.key_facts.extend(result.industry_insights.clone());
                if let Err(e) = store.update_document_context(&session_id_owned, &context) {
                    warn!(error = %e, session_id = %session_id_owned, "failed to persist research results");
                }
            }
        });
    }

    /// §4.6 step 5.
    async fn maybe_switch_to_review(&self, session_id: &str, anketa: &Anketa, completion_rate: f64) {
        let already = self.state.snapshot(session_id).review_prompt_installed;
        if already || completion_rate < REVIEW_THRESHOLD {
            return;
        }

        self.state.with_mut(session_id, |s| s.review_prompt_installed = true);
        self.runtime_cache.set(session_id, RuntimeStatus::Completing).ok();

        if let Some(llm) = self.llm_for(session_id) {
            let summary = format_anketa_for_voice(anketa);
            let prompt = build_review_prompt(&summary);
            if !llm.update_instructions(&prompt).await {
                warn!(session_id, "review-phase instruction update failed");
                return;
            }
            llm.generate_reply(Some("read back the summary for confirmation")).await;
        }
        info!(session_id, "review phase activated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use consult_core::error::ConsultError;
    use consult_extraction::ChatMessage;
    use consult_store::db::init_db;
    use rusqlite::Connection;

    use crate::collaborators::{NullAnketaRenderer, NullKnowledgeBase, NullNotificationManager};
    use crate::instructions::NullLlmInstructions;

    struct StubLlm(String);

    #[async_trait]
    impl ChatLlm for StubLlm {
        async fn chat(&self, _messages: &[ChatMessage], _t: f32, _m: u32) -> std::result::Result<String, ConsultError> {
            Ok(self.0.clone())
        }
    }

    struct NullResearch;

    #[async_trait]
    impl ResearchEngine for NullResearch {
        async fn research(
            &self,
            _website: Option<&str>,
            _industry: Option<&str>,
            _company_name: Option<&str>,
        ) -> crate::collaborators::ResearchResult {
            crate::collaborators::ResearchResult::default()
        }
    }

    fn build_orchestrator(response: &str) -> (Arc<ConsultationOrchestrator<StubLlm>>, Arc<SessionStore>) {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        let store = Arc::new(SessionStore::new(conn));
        let cache = RuntimeCache::new();
        let extraction = ExtractionCoordinator::new(StubLlm(response.to_string()));
        let orch = ConsultationOrchestrator::new(
            Arc::clone(&store),
            cache,
            extraction,
            Arc::new(NullKnowledgeBase),
            Arc::new(NullResearch),
            Arc::new(NullNotificationManager),
            Arc::new(NullAnketaRenderer),
        );
        (orch, store)
    }

    fn turn(content: &str) -> DialogueTurn {
        DialogueTurn { role: "user".to_string(), content: content.to_string(), timestamp: String::new(), phase: String::new() }
    }

    #[tokio::test]
    async fn dialogue_turn_appends_without_triggering_extraction_below_threshold() {
        let (orch, store) = build_orchestrator(r#"{"company_name": "Acme"}"#);
        let session = store.create_session(None).unwrap();
        orch.on_dialogue_turn(&session.session_id, turn("hello")).await.unwrap();
        let fetched = store.get_session(&session.session_id).unwrap();
        assert_eq!(fetched.dialogue_history.len(), 1);
        assert!(fetched.anketa_data.is_none());
    }

    #[tokio::test]
    async fn sixth_message_triggers_background_extraction() {
        let (orch, store) = build_orchestrator(r#"{"company_name": "Acme"}"#);
        let session = store.create_session(None).unwrap();
        for i in 0..6 {
            orch.on_dialogue_turn(&session.session_id, turn(&format!("message {i}"))).await.unwrap();
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let fetched = store.get_session(&session.session_id).unwrap();
        assert!(fetched.anketa_data.is_some());
    }

    #[tokio::test]
    async fn document_context_update_bypasses_counter_gate() {
        let (orch, store) = build_orchestrator(r#"{"company_name": "Acme"}"#);
        let session = store.create_session(None).unwrap();
        orch.on_document_context_updated(&session.session_id, DocumentContext::default()).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let fetched = store.get_session(&session.session_id).unwrap();
        assert!(fetched.anketa_data.is_some());
    }

    #[tokio::test]
    async fn finalization_renders_and_transitions_to_reviewing() {
        let (orch, store) = build_orchestrator(r#"{"company_name": "Acme", "industry": "retail"}"#);
        let session = store.create_session(None).unwrap();
        orch.on_session_finalized(&session.session_id).await.unwrap();
        let fetched = store.get_session(&session.session_id).unwrap();
        assert_eq!(fetched.status, SessionStatus::Reviewing);
        assert_eq!(fetched.company_name.as_deref(), Some("Acme"));
    }

    #[tokio::test]
    async fn finalization_keeps_last_known_good_anketa_on_failure() {
        let (orch, store) = build_orchestrator(&"garbage".repeat(100));
        let session = store.create_session(None).unwrap();
        store
            .update_anketa(
                &session.session_id,
                &serde_json::json!({"company_name": "Prior Co", "created_at": "2026-01-01T00:00:00Z"}),
                None,
            )
            .unwrap();
        orch.on_session_finalized(&session.session_id).await.unwrap();
        let fetched = store.get_session(&session.session_id).unwrap();
        // fallback anketa carries forward the prior company name (§4.5).
        assert_eq!(fetched.company_name.as_deref(), Some("Prior Co"));
    }
}
