//! Multi-call coordination.
//!
//! Given several tool calls in one turn, decides which may run concurrently
//! (conflict detection over file-touching arguments, batch size caps) and
//! dispatches eligible calls under a sliding concurrency window. No state is
//! persisted; everything operates per invocation.

pub mod conflict;
pub mod dispatch;

pub use conflict::{can_process_in_parallel, detect_conflicts, Conflict, ParallelEligibility};
pub use dispatch::{
    mark_ready, BatchOutcome, CallFailure, CallOutcome, CoordinatorConfig, DispatchMode,
    ParallelCoordinator,
};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinationError {
    #[error("Batch of {count} calls exceeds the parallel limit of {limit}")]
    TooManyParallelCalls { count: usize, limit: usize },

    #[error("Calls {first} and {second} both write {path:?} and cannot run concurrently")]
    ConflictingCalls {
        path: String,
        first: usize,
        second: usize,
    },
}

impl CoordinationError {
    pub fn code(&self) -> &'static str {
        match self {
            CoordinationError::TooManyParallelCalls { .. } => "TOO_MANY_PARALLEL_CALLS",
            CoordinationError::ConflictingCalls { .. } => "CONFLICTING_CALLS",
        }
    }
}
