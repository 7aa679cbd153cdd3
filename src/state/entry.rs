//! Tool-call state entries and the transition table.

use crate::types::tool::ToolCall;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::SystemTime;

/// Lifecycle state of a tracked tool call.
///
/// `Completed`, `Failed` and `Cancelled` are terminal: no transition leaves
/// them, which is what makes a timeout-set failure immune to a late
/// completion from the underlying operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallState {
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl CallState {
    pub fn is_terminal(self) -> bool {
        matches!(self, CallState::Completed | CallState::Failed | CallState::Cancelled)
    }

    /// The fixed transition table.
    pub fn can_transition_to(self, next: CallState) -> bool {
        use CallState::*;
        matches!(
            (self, next),
            (Pending, InProgress)
                | (Pending, Cancelled)
                | (InProgress, Completed)
                | (InProgress, Failed)
                | (InProgress, Cancelled)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CallState::Pending => "pending",
            CallState::InProgress => "in_progress",
            CallState::Completed => "completed",
            CallState::Failed => "failed",
            CallState::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A tracked tool call with its full lifecycle record.
///
/// Owned exclusively by the state manager, keyed by `(session, id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallStateEntry {
    pub id: String,
    pub tool_call: ToolCall,
    pub state: CallState,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
    /// Set exactly when the state becomes terminal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<SystemTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl ToolCallStateEntry {
    pub fn new(tool_call: ToolCall, metadata: Option<Value>) -> Self {
        let now = SystemTime::now();
        Self {
            id: tool_call.id.clone(),
            tool_call,
            state: CallState::Pending,
            created_at: now,
            updated_at: now,
            completed_at: None,
            result: None,
            error: None,
            metadata,
        }
    }

    /// Estimated in-memory footprint, used for cleanup accounting.
    pub fn estimated_bytes(&self) -> usize {
        serde_json::to_vec(self).map(|v| v.len()).unwrap_or(0)
    }

    /// Age reference for expiry: `completed_at` for terminal entries,
    /// falling back to `updated_at`.
    pub fn age_reference(&self) -> SystemTime {
        self.completed_at.unwrap_or(self.updated_at)
    }
}
