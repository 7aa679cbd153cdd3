//! Error envelope rendering.
//!
//! Internal stack traces and raw error objects never cross the HTTP
//! boundary: only the truncated message and a sanitized, size-capped
//! `error_context` do.

use super::classifier::ClassifiedError;
use crate::types::response::{ErrorBody, ErrorEnvelope};
use serde_json::Value;

/// Context keys whose values are redacted wholesale.
const SENSITIVE_KEYS: &[&str] = &[
    "api_key",
    "apikey",
    "authorization",
    "credential",
    "key",
    "password",
    "secret",
    "token",
];

const REDACTED: &str = "[REDACTED]";

#[derive(Debug, Clone)]
pub struct ErrorFormatter {
    max_message_len: usize,
    max_context_value_len: usize,
}

impl Default for ErrorFormatter {
    fn default() -> Self {
        Self {
            max_message_len: 512,
            max_context_value_len: 256,
        }
    }
}

impl ErrorFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_message_len(mut self, len: usize) -> Self {
        self.max_message_len = len;
        self
    }

    /// Render a classified error as the OpenAI-shaped envelope plus its
    /// HTTP status.
    pub fn format(&self, error: &ClassifiedError) -> (ErrorEnvelope, u16) {
        let envelope = ErrorEnvelope {
            error: ErrorBody {
                message: truncate(&error.message, self.max_message_len),
                error_type: error.class.openai_type().into(),
                code: error
                    .code
                    .clone()
                    .unwrap_or_else(|| error.class.code().into()),
                param: None,
                tool_call_id: error.tool_call_id.clone(),
                function_name: error.function_name.clone(),
                error_context: error.context.as_ref().map(|c| self.sanitize(c)),
            },
        };
        (envelope, error.class.http_status())
    }

    /// Redact sensitive-looking keys and cap value sizes, recursively.
    fn sanitize(&self, value: &Value) -> Value {
        match value {
            Value::Object(map) => {
                let sanitized = map
                    .iter()
                    .map(|(key, v)| {
                        let lower = key.to_lowercase();
                        if SENSITIVE_KEYS.iter().any(|s| lower.contains(s)) {
                            (key.clone(), Value::String(REDACTED.into()))
                        } else {
                            (key.clone(), self.sanitize(v))
                        }
                    })
                    .collect();
                Value::Object(sanitized)
            }
            Value::Array(items) => Value::Array(items.iter().map(|v| self.sanitize(v)).collect()),
            Value::String(s) => Value::String(truncate(s, self.max_context_value_len)),
            other => other.clone(),
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classifier::ErrorClassifier;

    #[test]
    fn test_envelope_shape_and_status() {
        let classified = ErrorClassifier::new()
            .classify_error("invalid tool name", None)
            .with_tool_call_id("call_0123456789abcdef01234567")
            .with_function_name("get_weather");
        let (envelope, status) = ErrorFormatter::new().format(&classified);
        assert_eq!(status, 422);
        assert_eq!(envelope.error.error_type, "invalid_request_error");
        assert_eq!(envelope.error.code, "validation_error");
        assert_eq!(
            envelope.error.tool_call_id.as_deref(),
            Some("call_0123456789abcdef01234567")
        );
        assert_eq!(envelope.error.function_name.as_deref(), Some("get_weather"));
    }

    #[test]
    fn test_message_truncation() {
        let classified = ErrorClassifier::new().classify_error("x".repeat(2000), None);
        let (envelope, _) = ErrorFormatter::new().format(&classified);
        assert!(envelope.error.message.len() <= 512 + 3);
        assert!(envelope.error.message.ends_with("..."));
    }

    #[test]
    fn test_sensitive_keys_redacted() {
        let classified = ErrorClassifier::new()
            .classify_error("execution failed", None)
            .with_context(serde_json::json!({
                "api_key": "sk-xxxx",
                "nested": {"Authorization": "Bearer abc", "path": "/tmp/x"},
                "attempts": 2
            }));
        let (envelope, _) = ErrorFormatter::new().format(&classified);
        let context = envelope.error.error_context.unwrap();
        assert_eq!(context["api_key"], "[REDACTED]");
        assert_eq!(context["nested"]["Authorization"], "[REDACTED]");
        assert_eq!(context["nested"]["path"], "/tmp/x");
        assert_eq!(context["attempts"], 2);
    }

    #[test]
    fn test_context_values_capped() {
        let classified = ErrorClassifier::new()
            .classify_error("processing hiccup", None)
            .with_context(serde_json::json!({"detail": "y".repeat(1000)}));
        let (envelope, _) = ErrorFormatter::new().format(&classified);
        let detail = envelope.error.error_context.unwrap()["detail"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(detail.len() <= 256 + 3);
    }

    #[test]
    fn test_timeout_maps_to_408() {
        let classified = ErrorClassifier::new().classify_error("call timed out", None);
        let (envelope, status) = ErrorFormatter::new().format(&classified);
        assert_eq!(status, 408);
        assert_eq!(envelope.error.code, "timeout_error");
    }
}
