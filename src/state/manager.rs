//! 会话状态管理 — 快照在每次变更后重算，清理只回收终态条目。
//!
//! Session state manager.
//!
//! Per-session maps are the only shared mutable state in the crate; they sit
//! behind a `tokio::sync::RwLock` so the single-threaded-cooperative
//! atomicity the design assumes also holds on a multi-threaded runtime.

use super::entry::{CallState, ToolCallStateEntry};
use super::StateError;
use crate::types::tool::ToolCall;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, SystemTime};
use tokio::sync::RwLock;

/// Requested state change for one tracked call.
#[derive(Debug, Clone)]
pub struct UpdateRequest {
    pub tool_call_id: String,
    pub new_state: CallState,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub metadata: Option<Value>,
}

impl UpdateRequest {
    pub fn transition(tool_call_id: impl Into<String>, new_state: CallState) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            new_state,
            result: None,
            error: None,
            metadata: None,
        }
    }

    pub fn with_result(mut self, result: Value) -> Self {
        self.result = Some(result);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Derived view over a session, recomputed on every mutation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub session_id: String,
    /// Ids of non-terminal calls, ordered by creation time ascending.
    pub pending_calls: Vec<String>,
    /// Ids of terminal calls, ordered by creation time ascending.
    pub completed_calls: Vec<String>,
    pub total_calls: usize,
    /// Terminal call count, plus one if any non-terminal call is outstanding.
    pub conversation_turn: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed: usize,
    pub bytes_freed: usize,
}

#[derive(Default)]
struct SessionState {
    entries: HashMap<String, ToolCallStateEntry>,
    /// Call ids that already have a correlated result.
    correlated: HashSet<String>,
    snapshot: StateSnapshot,
}

impl SessionState {
    fn recompute_snapshot(&mut self, session_id: &str) {
        let mut ordered: Vec<&ToolCallStateEntry> = self.entries.values().collect();
        ordered.sort_by_key(|e| (e.created_at, e.id.clone()));

        let mut pending_calls = Vec::new();
        let mut completed_calls = Vec::new();
        for entry in &ordered {
            if entry.state.is_terminal() {
                completed_calls.push(entry.id.clone());
            } else {
                pending_calls.push(entry.id.clone());
            }
        }
        let conversation_turn =
            completed_calls.len() + usize::from(!pending_calls.is_empty());

        self.snapshot = StateSnapshot {
            session_id: session_id.to_string(),
            total_calls: ordered.len(),
            pending_calls,
            completed_calls,
            conversation_turn,
        };
    }
}

/// Tracks every tool call of every session through its lifecycle.
pub struct SessionStateManager {
    sessions: RwLock<HashMap<String, SessionState>>,
}

impl SessionStateManager {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a new entry at `Pending`. Duplicate ids within the session are
    /// rejected.
    pub async fn create_tool_call(
        &self,
        session_id: &str,
        tool_call: ToolCall,
        metadata: Option<Value>,
    ) -> Result<(), StateError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.entry(session_id.to_string()).or_default();
        if session.entries.contains_key(&tool_call.id) {
            return Err(StateError::DuplicateCall {
                session: session_id.into(),
                id: tool_call.id,
            });
        }
        let entry = ToolCallStateEntry::new(tool_call, metadata);
        session.entries.insert(entry.id.clone(), entry);
        session.recompute_snapshot(session_id);
        Ok(())
    }

    /// Apply a state change, validating it against the transition table.
    ///
    /// Illegal transitions name the attempted pair and leave the stored
    /// entry untouched.
    pub async fn update_state(
        &self,
        session_id: &str,
        request: UpdateRequest,
    ) -> Result<ToolCallStateEntry, StateError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| StateError::CallNotFound {
                session: session_id.into(),
                id: request.tool_call_id.clone(),
            })?;
        let entry = session
            .entries
            .get_mut(&request.tool_call_id)
            .ok_or_else(|| StateError::CallNotFound {
                session: session_id.into(),
                id: request.tool_call_id.clone(),
            })?;

        if !entry.state.can_transition_to(request.new_state) {
            return Err(StateError::IllegalTransition {
                id: request.tool_call_id,
                from: entry.state,
                to: request.new_state,
            });
        }

        entry.state = request.new_state;
        entry.updated_at = SystemTime::now();
        if request.new_state.is_terminal() {
            entry.completed_at = Some(entry.updated_at);
        }
        if let Some(result) = request.result {
            entry.result = Some(result);
        }
        if let Some(error) = request.error {
            entry.error = Some(error);
        }
        if let Some(metadata) = request.metadata {
            entry.metadata = Some(metadata);
        }
        let updated = entry.clone();
        session.recompute_snapshot(session_id);
        Ok(updated)
    }

    /// Correlate an arriving `role: "tool"` result with its tracked call and
    /// walk the entry to `Completed` through the legal path.
    pub async fn correlate_result(
        &self,
        session_id: &str,
        tool_call_id: &str,
        content: Value,
    ) -> Result<ToolCallStateEntry, StateError> {
        {
            let sessions = self.sessions.read().await;
            let session = sessions
                .get(session_id)
                .ok_or_else(|| StateError::CallNotFound {
                    session: session_id.into(),
                    id: tool_call_id.into(),
                })?;
            let entry = session
                .entries
                .get(tool_call_id)
                .ok_or_else(|| StateError::CallNotFound {
                    session: session_id.into(),
                    id: tool_call_id.into(),
                })?;
            if session.correlated.contains(tool_call_id) {
                return Err(StateError::ResultAlreadyRecorded {
                    id: tool_call_id.into(),
                });
            }
            if entry.state.is_terminal() {
                return Err(StateError::IllegalTransition {
                    id: tool_call_id.into(),
                    from: entry.state,
                    to: CallState::Completed,
                });
            }
        }

        // Pending entries pass through InProgress so the walk stays legal.
        let current = self.get_entry(session_id, tool_call_id).await;
        if matches!(current.map(|e| e.state), Some(CallState::Pending)) {
            self.update_state(
                session_id,
                UpdateRequest::transition(tool_call_id, CallState::InProgress),
            )
            .await?;
        }
        let entry = self
            .update_state(
                session_id,
                UpdateRequest::transition(tool_call_id, CallState::Completed)
                    .with_result(content),
            )
            .await?;

        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(session_id) {
            session.correlated.insert(tool_call_id.to_string());
        }
        Ok(entry)
    }

    pub async fn get_entry(
        &self,
        session_id: &str,
        tool_call_id: &str,
    ) -> Option<ToolCallStateEntry> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .and_then(|s| s.entries.get(tool_call_id))
            .cloned()
    }

    /// The snapshot maintained for a session. Absent sessions report empty.
    pub async fn get_state_snapshot(&self, session_id: &str) -> StateSnapshot {
        self.sessions
            .read()
            .await
            .get(session_id)
            .map(|s| s.snapshot.clone())
            .unwrap_or_else(|| StateSnapshot {
                session_id: session_id.into(),
                ..StateSnapshot::default()
            })
    }

    /// Remove terminal entries older than `max_age`, across all sessions.
    ///
    /// Age is measured from `completed_at` (falling back to `updated_at`).
    /// Non-terminal entries are never evicted by this path regardless of
    /// age: liveness is not sacrificed for memory.
    pub async fn cleanup_expired(&self, max_age: Duration) -> CleanupReport {
        let cutoff = SystemTime::now()
            .checked_sub(max_age)
            .unwrap_or(SystemTime::UNIX_EPOCH);
        let mut report = CleanupReport::default();

        let mut sessions = self.sessions.write().await;
        for (session_id, session) in sessions.iter_mut() {
            let expired: Vec<String> = session
                .entries
                .values()
                .filter(|e| e.state.is_terminal() && e.age_reference() < cutoff)
                .map(|e| e.id.clone())
                .collect();
            for id in expired {
                if let Some(entry) = session.entries.remove(&id) {
                    report.removed += 1;
                    report.bytes_freed += entry.estimated_bytes();
                    session.correlated.remove(&id);
                }
            }
            session.recompute_snapshot(session_id);
        }
        sessions.retain(|_, s| !s.entries.is_empty());

        tracing::debug!(
            removed = report.removed,
            bytes_freed = report.bytes_freed,
            "cleaned up expired tool-call state"
        );
        report
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for SessionStateManager {
    fn default() -> Self {
        Self::new()
    }
}
