//! Ephemeral, per-process cache of transient session phase information
//! (§4.3). Nothing here is persisted — a process restart starts empty.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{info, instrument};

use consult_core::error::ConsultError;

/// Hard cap on the number of tracked sessions. Writes past this size fail
/// rather than grow the map unbounded.
pub const CAPACITY: usize = 5000;
/// Entries older than this (since last update) are evicted by the sweep.
pub const TTL_SECS: i64 = 3600;
/// Sweep cadence.
pub const SWEEP_INTERVAL_SECS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeStatus {
    Idle,
    Processing,
    Completing,
    Completed,
    Error,
}

impl RuntimeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuntimeStatus::Idle => "idle",
            RuntimeStatus::Processing => "processing",
            RuntimeStatus::Completing => "completing",
            RuntimeStatus::Completed => "completed",
            RuntimeStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "idle" => Some(RuntimeStatus::Idle),
            "processing" => Some(RuntimeStatus::Processing),
            "completing" => Some(RuntimeStatus::Completing),
            "completed" => Some(RuntimeStatus::Completed),
            "error" => Some(RuntimeStatus::Error),
            _ => None,
        }
    }
}

struct Entry {
    status: RuntimeStatus,
    updated_at: i64,
}

/// Concurrent, lock-free map from `session_id` to its transient runtime
/// status. Bounded by [`CAPACITY`]; evicted on a periodic sweep (§4.3).
pub struct RuntimeCache {
    entries: DashMap<String, Entry>,
}

impl RuntimeCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { entries: DashMap::new() })
    }

    /// Set a session's runtime status. Fails with `CollaboratorUnavailable`
    /// when the cache is at capacity and the session is not already tracked
    /// (mirrors the 503-equivalent contract in §4.3).
    pub fn set(&self, session_id: &str, status: RuntimeStatus) -> Result<(), ConsultError> {
        if !self.entries.contains_key(session_id) && self.entries.len() >= CAPACITY {
            return Err(ConsultError::CollaboratorUnavailable(
                "runtime status cache is at capacity".to_string(),
            ));
        }
        self.entries.insert(
            session_id.to_string(),
            Entry { status, updated_at: Utc::now().timestamp() },
        );
        Ok(())
    }

    pub fn get(&self, session_id: &str) -> Option<RuntimeStatus> {
        self.entries.get(session_id).map(|e| e.status)
    }

    pub fn clear(&self, session_id: &str) {
        self.entries.remove(session_id);
    }

    /// Evict entries whose last update is older than [`TTL_SECS`]. Returns
    /// the number of entries removed.
    #[instrument(skip(self))]
    pub fn sweep(&self) -> usize {
        let cutoff = Utc::now().timestamp() - TTL_SECS;
        let stale: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.updated_at < cutoff)
            .map(|e| e.key().clone())
            .collect();
        for key in &stale {
            self.entries.remove(key);
        }
        if !stale.is_empty() {
            info!(evicted = stale.len(), "runtime cache sweep evicted stale entries");
        }
        stale.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for RuntimeCache {
    fn default() -> Self {
        Self { entries: DashMap::new() }
    }
}

/// Run the periodic sweep until `shutdown` broadcasts `true`. Spawned once
/// at server startup; cancelled cooperatively at shutdown.
pub async fn run_sweep_task(cache: Arc<RuntimeCache>, mut shutdown: watch::Receiver<bool>) {
    info!("runtime status cache sweep task started");
    let mut interval = tokio::time::interval(Duration::from_secs(SWEEP_INTERVAL_SECS));
    loop {
        tokio::select! {
            _ = interval.tick() => {
                cache.sweep();
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("runtime status cache sweep task shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get_round_trips() {
        let cache = RuntimeCache::new();
        cache.set("abcd1234", RuntimeStatus::Processing).unwrap();
        assert_eq!(cache.get("abcd1234"), Some(RuntimeStatus::Processing));
    }

    #[test]
    fn clear_removes_entry() {
        let cache = RuntimeCache::new();
        cache.set("abcd1234", RuntimeStatus::Idle).unwrap();
        cache.clear("abcd1234");
        assert_eq!(cache.get("abcd1234"), None);
    }

    #[test]
    fn missing_entry_is_none() {
        let cache = RuntimeCache::new();
        assert_eq!(cache.get("deadbeef"), None);
    }

    #[test]
    fn sweep_evicts_only_stale_entries() {
        let cache = RuntimeCache::new();
        cache.entries.insert(
            "stale0001".to_string(),
            Entry { status: RuntimeStatus::Idle, updated_at: Utc::now().timestamp() - TTL_SECS - 10 },
        );
        cache.set("fresh0001", RuntimeStatus::Idle).unwrap();
        let evicted = cache.sweep();
        assert_eq!(evicted, 1);
        assert_eq!(cache.get("stale0001"), None);
        assert_eq!(cache.get("fresh0001"), Some(RuntimeStatus::Idle));
    }

    #[test]
    fn status_round_trips_through_str() {
        for s in [
            RuntimeStatus::Idle,
            RuntimeStatus::Processing,
            RuntimeStatus::Completing,
            RuntimeStatus::Completed,
            RuntimeStatus::Error,
        ] {
            assert_eq!(RuntimeStatus::parse(s.as_str()), Some(s));
        }
    }
}
