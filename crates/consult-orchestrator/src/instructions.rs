//! Write-only interface onto the live realtime-LLM session (§9 "Cyclic state
//! between orchestrator and LLM instructions"). The bridge owns the realtime
//! handle; the orchestrator only ever pushes instruction updates or asks for
//! a reply, never reads the handle back — eliminating the cycle.

use async_trait::async_trait;

/// Implemented by the voice-agent bridge's realtime-session wrapper.
/// Failures are logged by the caller and never propagate as fatal (§4.6
/// "LLM-instruction update failure").
#[async_trait]
pub trait LlmInstructions: Send + Sync {
    /// Replace the live system instructions (e.g. base prompt + KB
    /// enrichment, or the review-phase prompt).
    async fn update_instructions(&self, instructions: &str) -> bool;

    /// Ask the realtime session to generate a reply without waiting for
    /// further user audio (used for the review read-back and the initial
    /// greeting by the bridge).
    async fn generate_reply(&self, hint: Option<&str>) -> bool;
}

/// No-op implementation for standalone/offline orchestration (tests, demo
/// drivers without a live voice session).
pub struct NullLlmInstructions;

#[async_trait]
impl LlmInstructions for NullLlmInstructions {
    async fn update_instructions(&self, _instructions: &str) -> bool {
        true
    }

    async fn generate_reply(&self, _hint: Option<&str>) -> bool {
        true
    }
}
