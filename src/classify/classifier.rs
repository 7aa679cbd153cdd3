//! Error classification logic.
//!
//! Classification is keyword-based over the error message and, secondarily,
//! the stack trace. The bucket ordering resolves ambiguous messages (an
//! "invalid format" is a format error, not a validation error) and must not
//! be reordered: system > timeout > format > validation > processing >
//! execution, first match wins.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    Validation,
    Timeout,
    Format,
    Execution,
    System,
    Processing,
}

impl ErrorClass {
    /// Taxonomy code carried in the error envelope.
    pub fn code(self) -> &'static str {
        match self {
            ErrorClass::Validation => "validation_error",
            ErrorClass::Timeout => "timeout_error",
            ErrorClass::Format => "format_error",
            ErrorClass::Execution => "execution_error",
            ErrorClass::System => "system_error",
            ErrorClass::Processing => "processing_error",
        }
    }

    /// OpenAI error-type vocabulary.
    pub fn openai_type(self) -> &'static str {
        match self {
            ErrorClass::Validation | ErrorClass::Format | ErrorClass::Execution => {
                "invalid_request_error"
            }
            ErrorClass::Timeout => "timeout_error",
            ErrorClass::System | ErrorClass::Processing => "api_error",
        }
    }

    pub fn http_status(self) -> u16 {
        match self {
            ErrorClass::Validation | ErrorClass::Format | ErrorClass::Execution => 422,
            ErrorClass::Timeout => 408,
            ErrorClass::System | ErrorClass::Processing => 500,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    Retry,
    Skip,
    Fallback,
    Abort,
}

/// Keyword buckets in priority order. First matching bucket wins.
const CLASS_KEYWORDS: &[(ErrorClass, &[&str])] = &[
    (
        ErrorClass::System,
        &[
            "system",
            "internal error",
            "panic",
            "out of memory",
            "resource exhausted",
            "unavailable",
        ],
    ),
    (
        ErrorClass::Timeout,
        &["timeout", "timed out", "deadline", "elapsed"],
    ),
    (
        ErrorClass::Format,
        &["format", "malformed", "parse", "json", "serializ", "deserializ"],
    ),
    (
        ErrorClass::Validation,
        &["validation", "invalid", "schema", "missing required", "reserved", "not allowed"],
    ),
    (
        ErrorClass::Processing,
        &["processing", "interrupted", "busy", "overloaded"],
    ),
    (
        ErrorClass::Execution,
        &["execution", "execute", "tool error", "command failed"],
    ),
];

/// Terms that force non-recoverability regardless of class.
const FATAL_TERMS: &[&str] = &["fatal", "critical", "permanent", "corrupt"];

/// A classified error with its decided recovery behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedError {
    pub class: ErrorClass,
    pub recoverable: bool,
    pub action: RecoveryAction,
    pub message: String,
    /// Specific error code overriding the taxonomy code in the envelope
    /// (e.g. `CHOICE_FUNCTION_NOT_FOUND`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl ClassifiedError {
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_tool_call_id(mut self, id: impl Into<String>) -> Self {
        self.tool_call_id = Some(id.into());
        self
    }

    pub fn with_function_name(mut self, name: impl Into<String>) -> Self {
        self.function_name = Some(name.into());
        self
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorClassifier;

impl ErrorClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify a message (and optional stack trace) into the taxonomy.
    ///
    /// Pure function of its inputs: the same message always lands in the
    /// same bucket.
    pub fn classify(&self, message: &str, stack: Option<&str>) -> ErrorClass {
        let haystack = message.to_lowercase();
        if let Some(class) = Self::scan(&haystack) {
            return class;
        }
        if let Some(stack) = stack {
            let stack = stack.to_lowercase();
            if let Some(class) = Self::scan(&stack) {
                return class;
            }
        }
        ErrorClass::Processing
    }

    fn scan(haystack: &str) -> Option<ErrorClass> {
        for (class, keywords) in CLASS_KEYWORDS {
            if keywords.iter().any(|kw| haystack.contains(kw)) {
                return Some(*class);
            }
        }
        None
    }

    /// System errors are never recoverable; fatal-sounding messages force
    /// non-recoverability regardless of class. Validation failures are not
    /// retried, so they classify as non-recoverable here (their action is
    /// always `Skip`).
    pub fn is_recoverable(&self, class: ErrorClass, message: &str) -> bool {
        if class == ErrorClass::System {
            return false;
        }
        let lower = message.to_lowercase();
        if FATAL_TERMS.iter().any(|term| lower.contains(term)) {
            return false;
        }
        !matches!(class, ErrorClass::Validation)
    }

    /// Deterministic recovery mapping over `(class, recoverable)`.
    pub fn recovery_action(&self, class: ErrorClass, recoverable: bool) -> RecoveryAction {
        match (class, recoverable) {
            (ErrorClass::Validation, _) => RecoveryAction::Skip,
            (ErrorClass::System, _) => RecoveryAction::Abort,
            (ErrorClass::Timeout, true) => RecoveryAction::Retry,
            (ErrorClass::Format, true) => RecoveryAction::Fallback,
            (ErrorClass::Processing, true) | (ErrorClass::Execution, true) => RecoveryAction::Retry,
            (_, false) => RecoveryAction::Abort,
        }
    }

    /// Recommended caller-driven retry counts per class.
    pub fn recommended_retries(&self, class: ErrorClass) -> u32 {
        match class {
            ErrorClass::Timeout => 2,
            ErrorClass::Processing | ErrorClass::Execution => 1,
            ErrorClass::Validation | ErrorClass::Format | ErrorClass::System => 0,
        }
    }

    /// Full classification of a raised error message.
    pub fn classify_error(&self, message: impl Into<String>, stack: Option<&str>) -> ClassifiedError {
        let message = message.into();
        let class = self.classify(&message, stack);
        let recoverable = self.is_recoverable(class, &message);
        let action = self.recovery_action(class, recoverable);
        ClassifiedError {
            class,
            recoverable,
            action,
            message,
            code: None,
            tool_call_id: None,
            function_name: None,
            context: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> ErrorClassifier {
        ErrorClassifier::new()
    }

    #[test]
    fn test_priority_ordering_resolves_ambiguity() {
        let c = classifier();
        // "invalid format" matches both format and validation keyword sets;
        // format wins by priority.
        assert_eq!(c.classify("invalid format in arguments", None), ErrorClass::Format);
        // "system validation" matches system first.
        assert_eq!(c.classify("system validation breakdown", None), ErrorClass::System);
        // timeout beats format.
        assert_eq!(c.classify("json parse timed out", None), ErrorClass::Timeout);
        // plain "invalid" is validation.
        assert_eq!(c.classify("invalid tool name", None), ErrorClass::Validation);
    }

    #[test]
    fn test_fallback_bucket_is_processing() {
        assert_eq!(classifier().classify("something odd happened", None), ErrorClass::Processing);
    }

    #[test]
    fn test_stack_trace_is_secondary() {
        let c = classifier();
        let class = c.classify(
            "opaque failure",
            Some("at dispatch::run_one\nat tokio::time::timeout elapsed"),
        );
        assert_eq!(class, ErrorClass::Timeout);
        // Message match takes precedence over the stack.
        let class = c.classify("invalid input", Some("timeout in stack"));
        assert_eq!(class, ErrorClass::Validation);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let c = classifier();
        for _ in 0..10 {
            let e = c.classify_error("execution failed: command failed with code 1", None);
            assert_eq!(e.class, ErrorClass::Execution);
            assert_eq!(e.action, RecoveryAction::Retry);
        }
    }

    #[test]
    fn test_system_never_recoverable() {
        let c = classifier();
        assert!(!c.is_recoverable(ErrorClass::System, "system hiccup, probably fine"));
        assert_eq!(c.recovery_action(ErrorClass::System, false), RecoveryAction::Abort);
    }

    #[test]
    fn test_fatal_terms_force_non_recoverable() {
        let c = classifier();
        assert!(!c.is_recoverable(ErrorClass::Timeout, "fatal timeout"));
        assert!(!c.is_recoverable(ErrorClass::Execution, "corrupt tool output"));
        assert!(c.is_recoverable(ErrorClass::Timeout, "timed out, retry later"));
    }

    #[test]
    fn test_recovery_mapping() {
        let c = classifier();
        assert_eq!(c.recovery_action(ErrorClass::Timeout, true), RecoveryAction::Retry);
        assert_eq!(c.recovery_action(ErrorClass::Timeout, false), RecoveryAction::Abort);
        assert_eq!(c.recovery_action(ErrorClass::Validation, true), RecoveryAction::Skip);
        assert_eq!(c.recovery_action(ErrorClass::Validation, false), RecoveryAction::Skip);
        assert_eq!(c.recovery_action(ErrorClass::Format, true), RecoveryAction::Fallback);
        assert_eq!(c.recovery_action(ErrorClass::Format, false), RecoveryAction::Abort);
        assert_eq!(c.recovery_action(ErrorClass::Execution, true), RecoveryAction::Retry);
        assert_eq!(c.recovery_action(ErrorClass::Processing, false), RecoveryAction::Abort);
    }

    #[test]
    fn test_recommended_retries() {
        let c = classifier();
        assert_eq!(c.recommended_retries(ErrorClass::Timeout), 2);
        assert_eq!(c.recommended_retries(ErrorClass::Processing), 1);
        assert_eq!(c.recommended_retries(ErrorClass::Execution), 1);
        assert_eq!(c.recommended_retries(ErrorClass::Validation), 0);
        assert_eq!(c.recommended_retries(ErrorClass::System), 0);
    }

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(ErrorClass::Validation.http_status(), 422);
        assert_eq!(ErrorClass::Format.http_status(), 422);
        assert_eq!(ErrorClass::Execution.http_status(), 422);
        assert_eq!(ErrorClass::Timeout.http_status(), 408);
        assert_eq!(ErrorClass::System.http_status(), 500);
        assert_eq!(ErrorClass::Processing.http_status(), 500);
    }
}
