//! Response formatting.
//!
//! Turns Claude-native tool invocations into the OpenAI tool-call wire shape
//! and assembles the chat-completion envelope. Serialization of arguments is
//! validated by immediately re-parsing the written string; a write that
//! cannot round-trip is itself an error.

use crate::ident::CallIdGenerator;
use crate::types::response::{
    AssistantMessage, ChatCompletionResponse, CompletionChoice, Usage,
};
use crate::types::tool::{ClaudeToolInvocation, ToolCall};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("Tool invocation is missing a function name")]
    MissingFunctionName,

    #[error("Arguments for {name:?} could not be serialized: {reason}")]
    UnserializableArguments { name: String, reason: String },

    #[error("Serialized arguments for {name:?} did not re-parse to the source value")]
    NonRoundTrippingArguments { name: String },
}

/// Outcome of formatting a batch of invocations. Partial success is
/// explicit: `errors` carries per-index failures and `tool_calls` carries
/// whatever formatted cleanly, except in strict mode where any failure
/// empties the call list.
#[derive(Debug, Clone)]
pub struct BatchFormatOutcome {
    pub success: bool,
    pub tool_calls: Vec<ToolCall>,
    pub errors: Vec<(usize, FormatError)>,
}

pub struct ResponseFormatter {
    ids: CallIdGenerator,
}

impl ResponseFormatter {
    pub fn new(ids: CallIdGenerator) -> Self {
        Self { ids }
    }

    /// Format a single invocation into the OpenAI wire shape.
    ///
    /// An id is assigned when the source lacks one.
    pub fn format_tool_call(&self, invocation: &ClaudeToolInvocation) -> Result<ToolCall, FormatError> {
        if invocation.name.is_empty() {
            return Err(FormatError::MissingFunctionName);
        }

        let arguments = serde_json::to_string(&invocation.arguments).map_err(|e| {
            FormatError::UnserializableArguments {
                name: invocation.name.clone(),
                reason: e.to_string(),
            }
        })?;
        // Re-parse to prove the write round-trips.
        let reparsed: serde_json::Value =
            serde_json::from_str(&arguments).map_err(|_| FormatError::NonRoundTrippingArguments {
                name: invocation.name.clone(),
            })?;
        if reparsed != invocation.arguments {
            return Err(FormatError::NonRoundTrippingArguments {
                name: invocation.name.clone(),
            });
        }

        let id = invocation
            .id
            .clone()
            .unwrap_or_else(|| self.ids.generate());

        Ok(ToolCall::new(id, invocation.name.clone(), arguments))
    }

    /// Format a batch, reporting malformed calls individually.
    pub fn format_tool_calls(
        &self,
        invocations: &[ClaudeToolInvocation],
        strict: bool,
    ) -> BatchFormatOutcome {
        let mut tool_calls = Vec::new();
        let mut errors = Vec::new();

        for (index, invocation) in invocations.iter().enumerate() {
            match self.format_tool_call(invocation) {
                Ok(call) => tool_calls.push(call),
                Err(e) => errors.push((index, e)),
            }
        }

        let success = errors.is_empty();
        if strict && !success {
            tool_calls.clear();
        }
        BatchFormatOutcome {
            success,
            tool_calls,
            errors,
        }
    }

    /// Assemble the full chat-completion envelope.
    ///
    /// `finish_reason` is a total function of whether the call list is
    /// non-empty: `"tool_calls"` when calls are present, `"stop"` otherwise.
    pub fn build_tool_call_response(
        &self,
        tool_calls: Vec<ToolCall>,
        content: Option<String>,
        model: &str,
        usage: Option<Usage>,
    ) -> ChatCompletionResponse {
        let finish_reason = if tool_calls.is_empty() {
            "stop"
        } else {
            "tool_calls"
        };
        let created = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let hex = Uuid::new_v4().simple().to_string();

        ChatCompletionResponse {
            id: format!("chatcmpl-{}", &hex[..24]),
            object: "chat.completion".into(),
            created,
            model: model.into(),
            choices: vec![CompletionChoice {
                index: 0,
                message: AssistantMessage {
                    role: "assistant".into(),
                    content,
                    tool_calls: if tool_calls.is_empty() {
                        None
                    } else {
                        Some(tool_calls)
                    },
                },
                finish_reason: finish_reason.into(),
            }],
            usage,
        }
    }
}

impl Default for ResponseFormatter {
    fn default() -> Self {
        Self::new(CallIdGenerator::new())
    }
}
