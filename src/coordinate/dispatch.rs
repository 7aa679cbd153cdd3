//! 并行分发 — 滑动窗口并发上限与单调用超时竞速。
//!
//! Parallel dispatch. Eligible batches run under a sliding concurrency
//! window: never more than `max_in_flight` calls are outstanding, and a new
//! dispatch waits for the earliest in-flight completion rather than for the
//! whole wave. Each call races a fixed timeout; a timed-out call alone is
//! marked failed and other in-flight calls are unaffected.

use super::conflict::{can_process_in_parallel, ParallelEligibility};
use super::CoordinationError;
use crate::types::tool::ToolCall;
use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::Value;
use std::future::Future;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Hard cap on batch size for parallel processing.
    pub max_parallel_calls: usize,
    /// Sliding-window width: maximum in-flight calls at any instant.
    pub max_in_flight: usize,
    /// Per-call timeout raced against the executor.
    pub call_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_parallel_calls: 10,
            max_in_flight: 5,
            call_timeout: Duration::from_secs(30),
        }
    }
}

impl CoordinatorConfig {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_max_parallel_calls(mut self, max: usize) -> Self {
        self.max_parallel_calls = max;
        self
    }
    pub fn with_max_in_flight(mut self, max: usize) -> Self {
        self.max_in_flight = max.max(1);
        self
    }
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }
}

/// How ineligible batches are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Reject ineligible batches whole.
    Strict,
    /// Fall back to sequential processing.
    Lenient,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFailure {
    pub code: String,
    pub message: String,
}

/// Result of one dispatched call, tagged with its originating id so callers
/// can reconstruct correspondence regardless of completion order.
#[derive(Debug, Clone)]
pub struct CallOutcome {
    pub tool_call_id: String,
    pub function_name: String,
    pub success: bool,
    pub result: Option<Value>,
    pub error: Option<CallFailure>,
}

#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// True iff every individual call succeeded.
    pub success: bool,
    /// Whether the batch ran under the parallel window (vs. sequentially).
    pub parallel: bool,
    pub results: Vec<CallOutcome>,
    pub errors: Vec<(String, CallFailure)>,
    pub elapsed: Duration,
}

/// The default executor: preparation only, no arbitrary code runs. It
/// resolves each call to a ready-for-execution marker.
pub async fn mark_ready(call: ToolCall) -> Result<Value, String> {
    Ok(serde_json::json!({
        "status": "ready_for_execution",
        "tool": call.function.name,
        "tool_call_id": call.id,
    }))
}

pub struct ParallelCoordinator {
    config: CoordinatorConfig,
}

impl ParallelCoordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Check parallel eligibility for a batch under this coordinator's cap.
    pub fn eligibility(&self, batch: &[ToolCall]) -> ParallelEligibility {
        can_process_in_parallel(batch, self.config.max_parallel_calls)
    }

    /// Process a batch with the given executor.
    ///
    /// Ineligible batches are rejected whole in [`DispatchMode::Strict`]
    /// (never truncated) and processed sequentially in
    /// [`DispatchMode::Lenient`].
    pub async fn process<F, Fut>(
        &self,
        batch: Vec<ToolCall>,
        mode: DispatchMode,
        executor: F,
    ) -> Result<BatchOutcome, CoordinationError>
    where
        F: Fn(ToolCall) -> Fut,
        Fut: Future<Output = Result<Value, String>>,
    {
        let start = Instant::now();
        let eligibility = self.eligibility(&batch);

        let (results, parallel) = match (&eligibility, mode) {
            (ParallelEligibility::Eligible, _) => {
                (self.run_window(batch, &executor).await, true)
            }
            (ParallelEligibility::TooManyCalls { count, limit }, DispatchMode::Strict) => {
                return Err(CoordinationError::TooManyParallelCalls {
                    count: *count,
                    limit: *limit,
                });
            }
            (ParallelEligibility::Conflicting { conflicts }, DispatchMode::Strict) => {
                let conflict = &conflicts[0];
                return Err(CoordinationError::ConflictingCalls {
                    path: conflict.path.clone(),
                    first: conflict.first,
                    second: conflict.second,
                });
            }
            (_, DispatchMode::Lenient) => (self.run_sequential(batch, &executor).await, false),
        };

        let errors: Vec<(String, CallFailure)> = results
            .iter()
            .filter_map(|outcome| {
                outcome
                    .error
                    .clone()
                    .map(|failure| (outcome.tool_call_id.clone(), failure))
            })
            .collect();

        Ok(BatchOutcome {
            success: errors.is_empty(),
            parallel,
            results,
            errors,
            elapsed: start.elapsed(),
        })
    }

    async fn run_window<F, Fut>(&self, batch: Vec<ToolCall>, executor: &F) -> Vec<CallOutcome>
    where
        F: Fn(ToolCall) -> Fut,
        Fut: Future<Output = Result<Value, String>>,
    {
        let timeout = self.config.call_timeout;
        let mut pending = batch.into_iter();
        let mut in_flight = FuturesUnordered::new();
        let mut results = Vec::new();

        for call in pending.by_ref().take(self.config.max_in_flight) {
            in_flight.push(Self::run_one(call, timeout, executor));
        }
        while let Some(outcome) = in_flight.next().await {
            results.push(outcome);
            // Window slot freed; admit the next pending call, if any.
            if let Some(call) = pending.next() {
                in_flight.push(Self::run_one(call, timeout, executor));
            }
        }
        results
    }

    async fn run_sequential<F, Fut>(&self, batch: Vec<ToolCall>, executor: &F) -> Vec<CallOutcome>
    where
        F: Fn(ToolCall) -> Fut,
        Fut: Future<Output = Result<Value, String>>,
    {
        let timeout = self.config.call_timeout;
        let mut results = Vec::new();
        for call in batch {
            results.push(Self::run_one(call, timeout, executor).await);
        }
        results
    }

    async fn run_one<F, Fut>(call: ToolCall, timeout: Duration, executor: &F) -> CallOutcome
    where
        F: Fn(ToolCall) -> Fut,
        Fut: Future<Output = Result<Value, String>>,
    {
        let tool_call_id = call.id.clone();
        let function_name = call.function.name.clone();

        match tokio::time::timeout(timeout, executor(call)).await {
            Ok(Ok(value)) => CallOutcome {
                tool_call_id,
                function_name,
                success: true,
                result: Some(value),
                error: None,
            },
            Ok(Err(message)) => CallOutcome {
                tool_call_id,
                function_name,
                success: false,
                result: None,
                error: Some(CallFailure {
                    code: "EXECUTION_FAILED".into(),
                    message,
                }),
            },
            Err(_) => CallOutcome {
                tool_call_id,
                function_name,
                success: false,
                result: None,
                error: Some(CallFailure {
                    code: "PROCESSING_TIMEOUT".into(),
                    message: format!("Call exceeded the {}ms timeout", timeout.as_millis()),
                }),
            },
        }
    }
}

impl Default for ParallelCoordinator {
    fn default() -> Self {
        Self::new(CoordinatorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn call(id: &str, name: &str) -> ToolCall {
        ToolCall::new(id, name, "{}")
    }

    fn batch(n: usize) -> Vec<ToolCall> {
        (0..n).map(|i| call(&format!("call_{}", i), "read_file")).collect()
    }

    #[tokio::test]
    async fn test_mark_ready_simulation() {
        let outcome = mark_ready(call("call_x", "write_file")).await.unwrap();
        assert_eq!(outcome["status"], "ready_for_execution");
        assert_eq!(outcome["tool_call_id"], "call_x");
    }

    #[tokio::test]
    async fn test_oversized_batch_rejected_whole_in_strict_mode() {
        let coordinator = ParallelCoordinator::default();
        let err = coordinator
            .process(batch(11), DispatchMode::Strict, mark_ready)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "TOO_MANY_PARALLEL_CALLS");
    }

    #[tokio::test]
    async fn test_oversized_batch_runs_sequentially_in_lenient_mode() {
        let coordinator = ParallelCoordinator::default();
        let outcome = coordinator
            .process(batch(11), DispatchMode::Lenient, mark_ready)
            .await
            .unwrap();
        assert!(outcome.success);
        assert!(!outcome.parallel);
        assert_eq!(outcome.results.len(), 11);
    }

    #[tokio::test]
    async fn test_window_never_exceeds_max_in_flight() {
        let coordinator = ParallelCoordinator::new(
            CoordinatorConfig::default().with_max_in_flight(3),
        );
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let outcome = coordinator
            .process(batch(10), DispatchMode::Strict, |_call| {
                let current = Arc::clone(&current);
                let peak = Arc::clone(&peak);
                async move {
                    let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    current.fetch_sub(1, Ordering::SeqCst);
                    Ok(serde_json::json!({"ok": true}))
                }
            })
            .await
            .unwrap();

        assert!(outcome.success);
        assert!(outcome.parallel);
        assert_eq!(outcome.results.len(), 10);
        assert!(peak.load(Ordering::SeqCst) <= 3, "peak {}", peak.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_timeout_fails_only_the_slow_call() {
        let coordinator = ParallelCoordinator::new(
            CoordinatorConfig::default().with_call_timeout(Duration::from_millis(25)),
        );
        let calls = vec![call("call_fast", "read_file"), call("call_slow", "read_file")];

        let outcome = coordinator
            .process(calls, DispatchMode::Strict, |c| async move {
                if c.id == "call_slow" {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                }
                Ok(serde_json::json!({"id": c.id}))
            })
            .await
            .unwrap();

        assert!(!outcome.success);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].0, "call_slow");
        assert_eq!(outcome.errors[0].1.code, "PROCESSING_TIMEOUT");
        let fast = outcome
            .results
            .iter()
            .find(|r| r.tool_call_id == "call_fast")
            .unwrap();
        assert!(fast.success);
    }

    #[tokio::test]
    async fn test_failures_do_not_suppress_other_results() {
        let coordinator = ParallelCoordinator::default();
        let calls = vec![call("call_a", "read_file"), call("call_b", "read_file")];
        let outcome = coordinator
            .process(calls, DispatchMode::Strict, |c| async move {
                if c.id == "call_a" {
                    Err("boom".to_string())
                } else {
                    Ok(serde_json::json!({"ok": true}))
                }
            })
            .await
            .unwrap();

        assert!(!outcome.success);
        assert_eq!(outcome.results.len(), 2);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].1.code, "EXECUTION_FAILED");
    }

    #[tokio::test]
    async fn test_conflicting_batch_rejected_in_strict_mode() {
        let coordinator = ParallelCoordinator::default();
        let calls = vec![
            ToolCall::new("call_a", "write_file", r#"{"path":"/tmp/x"}"#),
            ToolCall::new("call_b", "write_file", r#"{"path":"/tmp/x"}"#),
        ];
        let err = coordinator
            .process(calls, DispatchMode::Strict, mark_ready)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "CONFLICTING_CALLS");
    }
}
