use std::path::PathBuf;
use std::sync::Arc;

use consult_core::config::ConsultConfig;
use consult_documents::{DocumentAnalyzer, DocumentParser, FileDocumentParser};
use consult_extraction::{ExtractionCoordinator, HttpChatLlm};
use consult_orchestrator::{
    ConsultationOrchestrator, HttpResearchEngine, NotificationManager, NullKnowledgeBase,
    NullNotificationManager,
};
use consult_runtime_cache::RuntimeCache;
use consult_store::SessionStore;
use consult_voice_bridge::{HttpRoomService, RoomService};

/// The chat-LLM backend used both for extraction and document analysis.
pub type Llm = HttpChatLlm;

/// Central shared state, passed as `Arc<AppState>` to every Axum handler.
pub struct AppState {
    pub config: ConsultConfig,
    pub store: Arc<SessionStore>,
    pub runtime_cache: Arc<RuntimeCache>,
    pub orchestrator: Arc<ConsultationOrchestrator<Llm>>,
    pub room_service: Arc<dyn RoomService>,
    pub notifications: Arc<dyn NotificationManager>,
    pub document_parser: Arc<dyn DocumentParser>,
    pub document_analyzer: Arc<DocumentAnalyzer<Llm>>,
    pub upload_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl AppState {
    pub fn new(config: ConsultConfig, store: Arc<SessionStore>) -> Self {
        let runtime_cache = RuntimeCache::new();

        let extraction_llm = HttpChatLlm::new(
            config.llm.api_key.clone().unwrap_or_default(),
            config.llm.base_url.clone(),
            config.llm.model.clone(),
            config.llm.max_retries,
        );
        let extraction = ExtractionCoordinator::new(extraction_llm);

        let analysis_llm = HttpChatLlm::new(
            config.llm.api_key.clone().unwrap_or_default(),
            config.llm.base_url.clone(),
            config.llm.model.clone(),
            config.llm.max_retries,
        );
        let document_analyzer = Arc::new(DocumentAnalyzer::new(analysis_llm));

        let renderer = Arc::new(consult_export::MarkdownAnketaRenderer::default());
        let research = Arc::new(HttpResearchEngine::new(config.llm.timeout_secs));
        let notifications: Arc<dyn NotificationManager> = Arc::new(NullNotificationManager);

        let orchestrator = ConsultationOrchestrator::new(
            Arc::clone(&store),
            Arc::clone(&runtime_cache),
            extraction,
            Arc::new(NullKnowledgeBase),
            research,
            Arc::clone(&notifications),
            renderer,
        );

        let room_service: Arc<dyn RoomService> = Arc::new(HttpRoomService::new(
            config.room.url.clone().unwrap_or_default(),
            config.room.api_key.clone().unwrap_or_default(),
            config.room.api_secret.clone().unwrap_or_default(),
        ));

        Self {
            upload_dir: PathBuf::from(&config.uploads.dir),
            output_dir: PathBuf::from("output"),
            config,
            store,
            runtime_cache,
            orchestrator,
            room_service,
            notifications,
            document_parser: Arc::new(FileDocumentParser),
            document_analyzer,
        }
    }
}

/// Assemble the full Axum router: routes, then the §4.8 middleware stack in
/// its mandated order (request ID → session-ID validation → security
/// headers), applied outermost-first so the request sees request-ID first.
pub fn build_router(state: Arc<AppState>) -> axum::Router {
    use axum::routing::{get, post, put};

    axum::Router::new()
        .route("/session/create", post(crate::http::session::create_session))
        .route("/session/{id}", get(crate::http::session::get_session))
        .route("/session/by-link/{link}", get(crate::http::session::get_session_by_link))
        .route("/session/{id}/pause", post(crate::http::session::pause_session))
        .route("/session/{id}/resume", post(crate::http::session::resume_session))
        .route("/session/{id}/confirm", post(crate::http::session::confirm_session))
        .route("/session/{id}/end", post(crate::http::session::end_session))
        .route("/session/{id}/kill", post(crate::http::session::kill_session))
        .route(
            "/session/{id}/reconnect",
            get(crate::http::session::reconnect_get).post(crate::http::session::reconnect_post),
        )
        .route(
            "/session/{id}/anketa",
            get(crate::http::anketa::get_anketa)
                .put(crate::http::anketa::put_anketa)
                .post(crate::http::anketa::put_anketa),
        )
        .route("/session/{id}/dialogue", put(crate::http::dialogue::put_dialogue))
        .route("/session/{id}/runtime-status", put(crate::http::dialogue::put_runtime_status))
        .route("/session/{id}/voice-config", put(crate::http::dialogue::put_voice_config))
        .route("/session/{id}/export/{format}", get(crate::http::export::export_session))
        .route("/session/{id}/documents/upload", post(crate::http::documents::upload_documents))
        .route("/rooms", get(crate::http::rooms::list_rooms).delete(crate::http::rooms::delete_all_rooms))
        .with_state(Arc::clone(&state))
        .layer(axum::middleware::from_fn(crate::http::middleware::security_headers))
        .layer(axum::middleware::from_fn_with_state(
            state,
            crate::http::middleware::validate_session_id,
        ))
        .layer(axum::middleware::from_fn(crate::http::middleware::request_id))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
