//! Voice-agent bridge entry point (§4.7). One bridge task runs per joined
//! room; it owns the realtime wire session and feeds the shared
//! [`ConsultationOrchestrator`] with normalized dialogue turns.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use consult_extraction::ChatLlm;
use consult_orchestrator::ConsultationOrchestrator;
use consult_store::{DialogueTurn, SessionStore};

use crate::realtime::{BridgeLlmInstructions, RealtimeSpeechSession, VoiceActivityConfig};
use crate::room::{RoomConnection, RoomEvent};

/// Default greeting-lock duration (§4.7 step 7): incoming audio/turns are
/// suppressed for this long after the initial greeting reply fires, so mic
/// noise can't immediately trigger a second turn.
pub const DEFAULT_GREETING_LOCK: Duration = Duration::from_secs(1);

/// Room names follow the `consultation-<session_id>` convention set by
/// [`consult_store::SessionStore::create_session`].
pub fn session_id_from_room_name(room_name: &str) -> Option<&str> {
    room_name.strip_prefix("consultation-")
}

pub struct VoiceAgentBridge<L: ChatLlm> {
    store: Arc<SessionStore>,
    orchestrator: Arc<ConsultationOrchestrator<L>>,
    greeting_lock: Duration,
}

impl<L: ChatLlm + Send + Sync + 'static> VoiceAgentBridge<L> {
    pub fn new(store: Arc<SessionStore>, orchestrator: Arc<ConsultationOrchestrator<L>>) -> Self {
        Self { store, orchestrator, greeting_lock: DEFAULT_GREETING_LOCK }
    }

    pub fn with_greeting_lock(mut self, lock: Duration) -> Self {
        self.greeting_lock = lock;
        self
    }

    /// Entry point invoked when a participant joins `room_name` (§4.7 steps
    /// 1-7). Drives `connection` to completion — returns once the
    /// participant leaves or the connection ends.
    pub async fn on_room_joined<S, C>(&self, room_name: &str, mut connection: C, realtime: Arc<S>)
    where
        S: RealtimeSpeechSession + 'static,
        C: RoomConnection,
    {
        let Some(session_id) = session_id_from_room_name(room_name) else {
            warn!(room_name, "room name does not follow the consultation-<session_id> convention; running standalone");
            self.run_standalone(&mut connection, &realtime).await;
            return;
        };

        let session = match self.store.get_session(session_id) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, session_id, "no persisted session for this room; running standalone");
                self.run_standalone(&mut connection, &realtime).await;
                return;
            }
        };

        let llm_handle: Arc<dyn consult_orchestrator::LlmInstructions> =
            Arc::new(BridgeLlmInstructions::new(RealtimeHandle(Arc::clone(&realtime))));
        self.orchestrator.attach_llm(session_id, llm_handle);

        let vad = VoiceActivityConfig::default()
            .with_silence_duration_ms(session.voice_config.as_ref().and_then(|vc| vc.silence_duration_ms));
        realtime.configure_turn_detection(&vad).await;

        info!(session_id, room_name, "bridge attached to room");
        self.greet(&realtime).await;
        let lock_until = Instant::now() + self.greeting_lock;

        while let Some(event) = connection.next_event().await {
            match event {
                RoomEvent::ConversationItemAdded(item) => {
                    if Instant::now() < lock_until {
                        info!(session_id, "dropped turn arriving inside the greeting lock window");
                        continue;
                    }
                    let turn = DialogueTurn {
                        role: item.role,
                        content: item.content,
                        timestamp: chrono::Utc::now().to_rfc3339(),
                        phase: String::new(),
                    };
                    if let Err(e) = self.orchestrator.on_dialogue_turn(session_id, turn).await {
                        warn!(error = %e, session_id, "failed to record dialogue turn");
                    }
                }
                RoomEvent::MetadataChanged(_) => {
                    self.on_metadata_changed(session_id, &realtime).await;
                }
                RoomEvent::ParticipantLeft => {
                    info!(session_id, "participant left; finalizing session");
                    if let Err(e) = self.orchestrator.on_session_finalized(session_id).await {
                        warn!(error = %e, session_id, "finalization failed");
                    }
                    self.orchestrator.detach_llm(session_id);
                    break;
                }
            }
        }
    }

    /// §4.7 step 5: re-read `voice_config` and push new VAD parameters
    /// without tearing down the realtime session.
    async fn on_metadata_changed<S: RealtimeSpeechSession>(&self, session_id: &str, realtime: &Arc<S>) {
        let session = match self.store.get_session(session_id) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, session_id, "could not re-read session on metadata change");
                return;
            }
        };
        let vad = VoiceActivityConfig::default()
            .with_silence_duration_ms(session.voice_config.as_ref().and_then(|vc| vc.silence_duration_ms));
        if !realtime.configure_turn_detection(&vad).await {
            warn!(session_id, "realtime session rejected updated turn-detection parameters");
        }
    }

    async fn greet<S: RealtimeSpeechSession>(&self, realtime: &Arc<S>) {
        if !realtime.request_reply(Some("greeting")).await {
            warn!("initial greeting reply failed");
        }
    }

    /// Room without a matching persisted session: still greets and drains
    /// events, but never touches the store or the orchestrator.
    async fn run_standalone<S: RealtimeSpeechSession, C: RoomConnection>(&self, connection: &mut C, realtime: &Arc<S>) {
        self.greet(realtime).await;
        while let Some(event) = connection.next_event().await {
            if matches!(event, RoomEvent::ParticipantLeft) {
                break;
            }
        }
    }
}

/// Adapts `Arc<S>` to `RealtimeSpeechSession` by delegating through the
/// inner reference, so [`BridgeLlmInstructions`] can own a cheap handle
/// without requiring `S: Clone`.
struct RealtimeHandle<S>(Arc<S>);

#[async_trait::async_trait]
impl<S: RealtimeSpeechSession> RealtimeSpeechSession for RealtimeHandle<S> {
    async fn send_instructions(&self, instructions: &str) -> bool {
        self.0.send_instructions(instructions).await
    }

    async fn request_reply(&self, hint: Option<&str>) -> bool {
        self.0.request_reply(hint).await
    }

    async fn configure_turn_detection(&self, vad: &VoiceActivityConfig) -> bool {
        self.0.configure_turn_detection(vad).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use consult_core::error::ConsultError;
    use consult_extraction::{ChatMessage, ExtractionCoordinator};
    use consult_orchestrator::{
        ConsultationOrchestrator, NullAnketaRenderer, NullKnowledgeBase, NullNotificationManager,
    };
    use consult_store::db::init_db;
    use rusqlite::Connection;
    use tokio::sync::mpsc;

    struct StubLlm;

    #[async_trait]
    impl ChatLlm for StubLlm {
        async fn chat(&self, _m: &[ChatMessage], _t: f32, _mt: u32) -> std::result::Result<String, ConsultError> {
            Ok(r#"{"company_name": "Acme"}"#.to_string())
        }
    }

    struct NullResearch;
    #[async_trait]
    impl consult_orchestrator::ResearchEngine for NullResearch {
        async fn research(
            &self,
            _w: Option<&str>,
            _i: Option<&str>,
            _c: Option<&str>,
        ) -> consult_orchestrator::ResearchResult {
            Default::default()
        }
    }

    struct RecordingRealtime {
        replies: std::sync::Mutex<Vec<Option<String>>>,
    }

    #[async_trait]
    impl RealtimeSpeechSession for RecordingRealtime {
        async fn send_instructions(&self, _i: &str) -> bool {
            true
        }
        async fn request_reply(&self, hint: Option<&str>) -> bool {
            self.replies.lock().unwrap().push(hint.map(str::to_string));
            true
        }
        async fn configure_turn_detection(&self, _v: &VoiceActivityConfig) -> bool {
            true
        }
    }

    struct ChannelConnection(mpsc::Receiver<RoomEvent>);

    #[async_trait]
    impl RoomConnection for ChannelConnection {
        async fn next_event(&mut self) -> Option<RoomEvent> {
            self.0.recv().await
        }
    }

    fn test_bridge() -> (VoiceAgentBridge<StubLlm>, Arc<SessionStore>) {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        let store = Arc::new(SessionStore::new(conn));
        let extraction = ExtractionCoordinator::new(StubLlm);
        let orchestrator = ConsultationOrchestrator::new(
            Arc::clone(&store),
            consult_runtime_cache::RuntimeCache::new(),
            extraction,
            Arc::new(NullKnowledgeBase),
            Arc::new(NullResearch),
            Arc::new(NullNotificationManager),
            Arc::new(NullAnketaRenderer),
        );
        (VoiceAgentBridge::new(Arc::clone(&store), orchestrator).with_greeting_lock(Duration::ZERO), store)
    }

    #[test]
    fn room_name_parses_session_id() {
        assert_eq!(session_id_from_room_name("consultation-abcd1234"), Some("abcd1234"));
        assert_eq!(session_id_from_room_name("unrelated"), None);
    }

    #[tokio::test]
    async fn joined_room_greets_and_records_turns() {
        let (bridge, store) = test_bridge();
        let session = store.create_session(None).unwrap();
        let realtime = Arc::new(RecordingRealtime { replies: std::sync::Mutex::new(Vec::new()) });

        let (tx, rx) = mpsc::channel(4);
        tx.send(RoomEvent::ConversationItemAdded(crate::room::ConversationItem {
            role: "user".to_string(),
            content: "hello there".to_string(),
        }))
        .await
        .unwrap();
        tx.send(RoomEvent::ParticipantLeft).await.unwrap();

        bridge.on_room_joined(&session.room_name, ChannelConnection(rx), Arc::clone(&realtime)).await;

        assert_eq!(realtime.replies.lock().unwrap().len(), 1);
        let fetched = store.get_session(&session.session_id).unwrap();
        assert_eq!(fetched.dialogue_history.len(), 1);
        assert_eq!(fetched.status, consult_store::SessionStatus::Reviewing);
    }

    #[tokio::test]
    async fn unknown_room_runs_standalone_without_touching_store() {
        let (bridge, _store) = test_bridge();
        let realtime = Arc::new(RecordingRealtime { replies: std::sync::Mutex::new(Vec::new()) });
        let (tx, rx) = mpsc::channel(4);
        tx.send(RoomEvent::ParticipantLeft).await.unwrap();
        bridge.on_room_joined("not-a-consult-room", ChannelConnection(rx), realtime).await;
    }
}
