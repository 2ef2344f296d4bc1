//! Realtime speech-session collaborator boundary (§4.7 step 2), grounded on
//! the original Azure Realtime client's `_configure_session` turn-detection
//! payload. The wire protocol itself is an external collaborator; this
//! module only fixes the parameters and the instruction-push interface the
//! orchestrator drives through [`consult_orchestrator::LlmInstructions`].

use async_trait::async_trait;

use consult_orchestrator::LlmInstructions;

/// Server-side voice-activity-detection parameters. Defaults match §4.7;
/// `silence_duration_ms` is the one field routinely overridden per session
/// from `voice_config.silence_duration_ms`.
#[derive(Debug, Clone, Copy)]
pub struct VoiceActivityConfig {
    pub threshold: f64,
    pub prefix_padding_ms: u32,
    pub silence_duration_ms: u32,
}

impl Default for VoiceActivityConfig {
    fn default() -> Self {
        Self { threshold: 0.6, prefix_padding_ms: 300, silence_duration_ms: 1200 }
    }
}

impl VoiceActivityConfig {
    pub fn with_silence_duration_ms(mut self, ms: Option<u64>) -> Self {
        if let Some(ms) = ms {
            self.silence_duration_ms = ms as u32;
        }
        self
    }
}

/// The live wire session to the realtime speech model. Implementations send
/// session-update/response-create frames; failures are reported as `false`
/// rather than propagated (§4.6 "LLM-instruction update failure").
#[async_trait]
pub trait RealtimeSpeechSession: Send + Sync {
    async fn send_instructions(&self, instructions: &str) -> bool;
    async fn request_reply(&self, hint: Option<&str>) -> bool;
    /// Adopt new turn-detection parameters without disconnecting (§4.7 step 5).
    async fn configure_turn_detection(&self, vad: &VoiceActivityConfig) -> bool;
}

/// Adapts a [`RealtimeSpeechSession`] to the orchestrator's write-only
/// [`LlmInstructions`] boundary, so the orchestrator never needs to know
/// about VAD configuration or the wire protocol.
pub struct BridgeLlmInstructions<S: RealtimeSpeechSession> {
    session: S,
}

impl<S: RealtimeSpeechSession> BridgeLlmInstructions<S> {
    pub fn new(session: S) -> Self {
        Self { session }
    }
}

#[async_trait]
impl<S: RealtimeSpeechSession> LlmInstructions for BridgeLlmInstructions<S> {
    async fn update_instructions(&self, instructions: &str) -> bool {
        self.session.send_instructions(instructions).await
    }

    async fn generate_reply(&self, hint: Option<&str>) -> bool {
        self.session.request_reply(hint).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_vad_matches_spec_values() {
        let vad = VoiceActivityConfig::default();
        assert_eq!(vad.threshold, 0.6);
        assert_eq!(vad.prefix_padding_ms, 300);
        assert_eq!(vad.silence_duration_ms, 1200);
    }

    #[test]
    fn voice_config_override_wins_when_present() {
        let vad = VoiceActivityConfig::default().with_silence_duration_ms(Some(800));
        assert_eq!(vad.silence_duration_ms, 800);
    }

    #[test]
    fn absent_override_keeps_default() {
        let vad = VoiceActivityConfig::default().with_silence_duration_ms(None);
        assert_eq!(vad.silence_duration_ms, 1200);
    }
}
