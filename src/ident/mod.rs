//! Call id generation and per-session tracking.
//!
//! Ids are `call_` followed by 24 lowercase hex characters. Tracking is keyed
//! by `(session, id)`; duplicates are rejected rather than overwritten, and a
//! per-session cap fails closed instead of evicting old entries.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use thiserror::Error;
use uuid::Uuid;

static ID_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^call_[0-9a-f]{24}$").unwrap());

const ID_PREFIX: &str = "call_";
const ID_SUFFIX_LEN: usize = 24;

/// Scope key used when the caller tracks ids without a session.
const GLOBAL_SCOPE: &str = "global";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("Id {id:?} is already tracked in session {session:?}")]
    AlreadyTracked { id: String, session: String },

    #[error("Session {session:?} reached the tracked-id limit of {limit}")]
    SessionLimitExceeded { session: String, limit: usize },

    #[error("Id {id:?} does not match the call id format")]
    InvalidId { id: String },

    #[error("Id operation {operation:?} exceeded its {budget_us}us budget")]
    OperationTimeout { operation: &'static str, budget_us: u64 },
}

impl IdError {
    pub fn code(&self) -> &'static str {
        match self {
            IdError::AlreadyTracked { .. } => "ID_ALREADY_TRACKED",
            IdError::SessionLimitExceeded { .. } => "SESSION_ID_LIMIT_EXCEEDED",
            IdError::InvalidId { .. } => "INVALID_ID_FORMAT",
            IdError::OperationTimeout { .. } => "ID_OPERATION_TIMEOUT",
        }
    }
}

/// Generates fixed-format call identifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallIdGenerator;

impl CallIdGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Produce a fresh `call_<24 hex>` identifier.
    pub fn generate(&self) -> String {
        let hex = Uuid::new_v4().simple().to_string();
        format!("{}{}", ID_PREFIX, &hex[..ID_SUFFIX_LEN])
    }

    pub fn is_valid_id(&self, id: &str) -> bool {
        ID_PATTERN.is_match(id)
    }
}

#[derive(Debug, Clone)]
pub struct IdTrackerConfig {
    pub max_ids_per_session: usize,
    /// Advisory per-operation budget. Overruns fail the operation, not the process.
    pub op_budget: Duration,
}

impl Default for IdTrackerConfig {
    fn default() -> Self {
        Self {
            max_ids_per_session: 1000,
            op_budget: Duration::from_millis(1),
        }
    }
}

/// Tracks issued ids per session to detect collisions and support cleanup.
pub struct CallIdTracker {
    config: IdTrackerConfig,
    sessions: RwLock<HashMap<String, HashSet<String>>>,
}

impl CallIdTracker {
    pub fn new(config: IdTrackerConfig) -> Self {
        Self {
            config,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Track an id under a session scope (or the global scope).
    pub fn track(&self, id: &str, session: Option<&str>) -> Result<(), IdError> {
        if !ID_PATTERN.is_match(id) {
            return Err(IdError::InvalidId { id: id.into() });
        }
        let start = Instant::now();
        let scope = session.unwrap_or(GLOBAL_SCOPE).to_string();
        {
            let mut sessions = self.sessions.write().unwrap();
            let ids = sessions.entry(scope.clone()).or_default();
            if ids.contains(id) {
                return Err(IdError::AlreadyTracked {
                    id: id.into(),
                    session: scope,
                });
            }
            if ids.len() >= self.config.max_ids_per_session {
                return Err(IdError::SessionLimitExceeded {
                    session: scope,
                    limit: self.config.max_ids_per_session,
                });
            }
            ids.insert(id.to_string());
        }
        self.guard_budget("track", start)
    }

    pub fn has(&self, id: &str, session: Option<&str>) -> bool {
        let scope = session.unwrap_or(GLOBAL_SCOPE);
        self.sessions
            .read()
            .unwrap()
            .get(scope)
            .map(|ids| ids.contains(id))
            .unwrap_or(false)
    }

    /// All ids tracked under a session, sorted for determinism.
    pub fn ids_for(&self, session: Option<&str>) -> Vec<String> {
        let scope = session.unwrap_or(GLOBAL_SCOPE);
        let mut ids: Vec<String> = self
            .sessions
            .read()
            .unwrap()
            .get(scope)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    pub fn remove(&self, id: &str, session: Option<&str>) -> bool {
        let scope = session.unwrap_or(GLOBAL_SCOPE);
        self.sessions
            .write()
            .unwrap()
            .get_mut(scope)
            .map(|ids| ids.remove(id))
            .unwrap_or(false)
    }

    /// Drop every id tracked under a session. Returns how many were removed.
    pub fn clear_session(&self, session: Option<&str>) -> usize {
        let scope = session.unwrap_or(GLOBAL_SCOPE);
        self.sessions
            .write()
            .unwrap()
            .remove(scope)
            .map(|ids| ids.len())
            .unwrap_or(0)
    }

    fn guard_budget(&self, operation: &'static str, start: Instant) -> Result<(), IdError> {
        if start.elapsed() > self.config.op_budget {
            return Err(IdError::OperationTimeout {
                operation,
                budget_us: self.config.op_budget.as_micros() as u64,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> CallIdTracker {
        CallIdTracker::new(IdTrackerConfig::default())
    }

    #[test]
    fn test_generated_ids_are_valid_and_distinct() {
        let generator = CallIdGenerator::new();
        let mut seen = HashSet::new();
        for _ in 0..500 {
            let id = generator.generate();
            assert!(generator.is_valid_id(&id), "bad id: {}", id);
            assert!(seen.insert(id), "duplicate id generated");
        }
    }

    #[test]
    fn test_id_format_rejections() {
        let generator = CallIdGenerator::new();
        assert!(!generator.is_valid_id("call_short"));
        assert!(!generator.is_valid_id("tool_0123456789abcdef01234567"));
        assert!(!generator.is_valid_id("call_0123456789ABCDEF01234567"));
    }

    #[test]
    fn test_duplicate_tracking_rejected() {
        let t = tracker();
        let id = CallIdGenerator::new().generate();
        t.track(&id, Some("s1")).unwrap();
        let err = t.track(&id, Some("s1")).unwrap_err();
        assert_eq!(err.code(), "ID_ALREADY_TRACKED");
        // Same id under a different session is a different scope.
        t.track(&id, Some("s2")).unwrap();
    }

    #[test]
    fn test_session_cap_fails_closed() {
        let t = CallIdTracker::new(IdTrackerConfig {
            max_ids_per_session: 2,
            ..IdTrackerConfig::default()
        });
        let generator = CallIdGenerator::new();
        t.track(&generator.generate(), Some("s")).unwrap();
        t.track(&generator.generate(), Some("s")).unwrap();
        let err = t.track(&generator.generate(), Some("s")).unwrap_err();
        assert_eq!(err.code(), "SESSION_ID_LIMIT_EXCEEDED");
        assert_eq!(t.ids_for(Some("s")).len(), 2);
    }

    #[test]
    fn test_remove_and_clear() {
        let t = tracker();
        let generator = CallIdGenerator::new();
        let a = generator.generate();
        let b = generator.generate();
        t.track(&a, Some("s")).unwrap();
        t.track(&b, Some("s")).unwrap();
        assert!(t.remove(&a, Some("s")));
        assert!(!t.has(&a, Some("s")));
        assert_eq!(t.clear_session(Some("s")), 1);
        assert!(t.ids_for(Some("s")).is_empty());
    }

    #[test]
    fn test_invalid_id_not_tracked() {
        let t = tracker();
        let err = t.track("not-a-call-id", None).unwrap_err();
        assert_eq!(err.code(), "INVALID_ID_FORMAT");
    }
}
