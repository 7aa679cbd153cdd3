//! Per-session tool-call state tracking.
//!
//! Every tool call is tracked from creation through a terminal state along a
//! fixed transition table. Snapshots are recomputed on every mutation and
//! expiry-based cleanup only ever touches terminal entries.

pub mod entry;
pub mod manager;

pub use entry::{CallState, ToolCallStateEntry};
pub use manager::{
    CleanupReport, SessionStateManager, StateSnapshot, UpdateRequest,
};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("Tool call {id:?} already exists in session {session:?}")]
    DuplicateCall { session: String, id: String },

    #[error("Tool call {id:?} not found in session {session:?}")]
    CallNotFound { session: String, id: String },

    #[error("Illegal transition {from} -> {to} for tool call {id:?}")]
    IllegalTransition {
        id: String,
        from: CallState,
        to: CallState,
    },

    #[error("A result is already correlated with tool call {id:?}")]
    ResultAlreadyRecorded { id: String },
}

impl StateError {
    pub fn code(&self) -> &'static str {
        match self {
            StateError::DuplicateCall { .. } => "DUPLICATE_TOOL_CALL",
            StateError::CallNotFound { .. } => "TOOL_CALL_NOT_FOUND",
            StateError::IllegalTransition { .. } => "ILLEGAL_STATE_TRANSITION",
            StateError::ResultAlreadyRecorded { .. } => "RESULT_ALREADY_RECORDED",
        }
    }
}
