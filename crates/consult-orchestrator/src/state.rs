//! Per-session orchestration flags (§4.6 "State per active session").
//! Lives entirely in process memory — once set, a flag never reverts to
//! its initial value for the life of the session; a process restart loses
//! it, which only means the relevant enrichment step runs again.

use dashmap::DashMap;

#[derive(Debug, Clone)]
pub struct SessionState {
    pub messages_since_last_extract: u32,
    pub total_messages: u32,
    pub kb_enriched: bool,
    pub review_prompt_installed: bool,
    pub research_launched: bool,
    pub country_hint: Option<String>,
    pub consultation_type: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            messages_since_last_extract: 0,
            total_messages: 0,
            kb_enriched: false,
            review_prompt_installed: false,
            research_launched: false,
            country_hint: None,
            consultation_type: None,
        }
    }
}

/// Tracks one [`SessionState`] per active session id. Sessions are never
/// explicitly evicted here — they ride along with the runtime cache's TTL
/// sweep at the orchestrator call site, since both are keyed the same way.
#[derive(Default)]
pub struct SessionStateTable {
    entries: DashMap<String, SessionState>,
}

impl SessionStateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mut<R>(&self, session_id: &str, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut entry = self.entries.entry(session_id.to_string()).or_default();
        f(&mut entry)
    }

    pub fn snapshot(&self, session_id: &str) -> SessionState {
        self.entries.get(session_id).map(|e| e.clone()).unwrap_or_default()
    }

    pub fn remove(&self, session_id: &str) {
        self.entries.remove(session_id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_has_zeroed_counters() {
        let state = SessionState::default();
        assert_eq!(state.messages_since_last_extract, 0);
        assert!(!state.kb_enriched);
    }

    #[test]
    fn with_mut_persists_across_calls() {
        let table = SessionStateTable::new();
        table.with_mut("s1", |s| s.messages_since_last_extract += 1);
        table.with_mut("s1", |s| s.messages_since_last_extract += 1);
        assert_eq!(table.snapshot("s1").messages_since_last_extract, 2);
    }

    #[test]
    fn remove_drops_state() {
        let table = SessionStateTable::new();
        table.with_mut("s1", |s| s.kb_enriched = true);
        table.remove("s1");
        assert!(!table.snapshot("s1").kb_enriched);
        assert!(table.is_empty());
    }
}
