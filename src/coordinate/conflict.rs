//! Cross-call conflict detection.
//!
//! Two write-class calls targeting the same path must not run concurrently.
//! The scan looks for a path-carrying field in each call's parsed arguments;
//! calls whose arguments do not parse are treated as having no path target.

use crate::types::tool::ToolCall;
use serde_json::Value;
use std::collections::HashMap;

/// Tool names whose effect mutates the filesystem target.
const WRITE_CLASS: &[&str] = &["write_file", "edit_file", "delete_file", "move_file"];

/// Argument keys that name a filesystem target, probed in order.
const PATH_KEYS: &[&str] = &["path", "file", "file_path", "directory"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub path: String,
    /// Indices into the batch, in encounter order.
    pub first: usize,
    pub second: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParallelEligibility {
    Eligible,
    TooManyCalls { count: usize, limit: usize },
    Conflicting { conflicts: Vec<Conflict> },
}

impl ParallelEligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, ParallelEligibility::Eligible)
    }
}

fn is_write_class(name: &str) -> bool {
    WRITE_CLASS.contains(&name)
}

/// Extract the first path-carrying field from a call's arguments.
fn extract_path(arguments: &Value) -> Option<String> {
    let obj = arguments.as_object()?;
    PATH_KEYS
        .iter()
        .find_map(|key| obj.get(*key).and_then(|v| v.as_str()))
        .map(String::from)
}

/// Find every pair of write-class calls that resolve to the same path.
pub fn detect_conflicts(batch: &[ToolCall]) -> Vec<Conflict> {
    let mut by_path: HashMap<String, Vec<usize>> = HashMap::new();
    for (index, call) in batch.iter().enumerate() {
        if !is_write_class(&call.function.name) {
            continue;
        }
        let arguments = match call.parsed_arguments() {
            Some(v) => v,
            None => continue,
        };
        if let Some(path) = extract_path(&arguments) {
            by_path.entry(path).or_default().push(index);
        }
    }

    let mut conflicts = Vec::new();
    for (path, indices) in by_path {
        for window in indices.windows(2) {
            conflicts.push(Conflict {
                path: path.clone(),
                first: window[0],
                second: window[1],
            });
        }
    }
    conflicts.sort_by_key(|c| (c.first, c.second));
    conflicts
}

/// A batch is parallel-eligible iff it fits the size cap and no pairwise
/// conflict exists. Ineligible batches carry the reason; callers decide
/// between sequential fallback and outright rejection.
pub fn can_process_in_parallel(batch: &[ToolCall], limit: usize) -> ParallelEligibility {
    if batch.len() > limit {
        return ParallelEligibility::TooManyCalls {
            count: batch.len(),
            limit,
        };
    }
    let conflicts = detect_conflicts(batch);
    if conflicts.is_empty() {
        ParallelEligibility::Eligible
    } else {
        ParallelEligibility::Conflicting { conflicts }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(id: &str, name: &str, arguments: serde_json::Value) -> ToolCall {
        ToolCall::new(id, name, arguments.to_string())
    }

    #[test]
    fn test_same_path_write_pair_conflicts() {
        let batch = vec![
            call("call_a", "write_file", serde_json::json!({"path": "/tmp/x", "content": "1"})),
            call("call_b", "edit_file", serde_json::json!({"path": "/tmp/x", "patch": "2"})),
        ];
        let conflicts = detect_conflicts(&batch);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].path, "/tmp/x");
        assert!(!can_process_in_parallel(&batch, 10).is_eligible());
    }

    #[test]
    fn test_distinct_paths_do_not_conflict() {
        let batch = vec![
            call("call_a", "write_file", serde_json::json!({"path": "/tmp/x"})),
            call("call_b", "write_file", serde_json::json!({"path": "/tmp/y"})),
        ];
        assert!(detect_conflicts(&batch).is_empty());
        assert!(can_process_in_parallel(&batch, 10).is_eligible());
    }

    #[test]
    fn test_reads_never_conflict() {
        let batch = vec![
            call("call_a", "read_file", serde_json::json!({"path": "/tmp/x"})),
            call("call_b", "read_file", serde_json::json!({"path": "/tmp/x"})),
            call("call_c", "write_file", serde_json::json!({"path": "/tmp/x"})),
        ];
        // Only one write-class call touches the path, so no pair conflicts.
        assert!(detect_conflicts(&batch).is_empty());
    }

    #[test]
    fn test_alternate_path_keys() {
        let batch = vec![
            call("call_a", "delete_file", serde_json::json!({"file": "/srv/data"})),
            call("call_b", "move_file", serde_json::json!({"file": "/srv/data", "to": "/srv/old"})),
        ];
        assert_eq!(detect_conflicts(&batch).len(), 1);
    }

    #[test]
    fn test_unparseable_arguments_have_no_target() {
        let batch = vec![
            ToolCall::new("call_a", "write_file", "not json"),
            call("call_b", "write_file", serde_json::json!({"path": "/tmp/x"})),
        ];
        assert!(detect_conflicts(&batch).is_empty());
    }

    #[test]
    fn test_size_cap() {
        let batch: Vec<ToolCall> = (0..11)
            .map(|i| call(&format!("call_{}", i), "read_file", serde_json::json!({})))
            .collect();
        match can_process_in_parallel(&batch, 10) {
            ParallelEligibility::TooManyCalls { count: 11, limit: 10 } => {}
            other => panic!("Expected TooManyCalls, got {:?}", other),
        }
    }

    #[test]
    fn test_three_way_conflict_reports_pairs() {
        let batch = vec![
            call("call_a", "write_file", serde_json::json!({"path": "/f"})),
            call("call_b", "write_file", serde_json::json!({"path": "/f"})),
            call("call_c", "write_file", serde_json::json!({"path": "/f"})),
        ];
        let conflicts = detect_conflicts(&batch);
        assert_eq!(conflicts.len(), 2);
        assert_eq!((conflicts[0].first, conflicts[0].second), (0, 1));
        assert_eq!((conflicts[1].first, conflicts[1].second), (1, 2));
    }
}
