//! Typed events emitted by the completion provider.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ordered event sequence produced by a [`crate::provider::CompletionProvider`].
///
/// The engine treats the provider as opaque: it only ever sees this enum.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum ProviderEvent {
    /// Session/transport established; first event of every stream.
    #[serde(rename = "SystemInit")]
    SystemInit {
        session_id: String,
        model: String,
    },

    /// Partial assistant text content.
    #[serde(rename = "AssistantDelta")]
    AssistantDelta { content: String },

    /// The model invoked a tool.
    #[serde(rename = "ToolInvocation")]
    ToolInvocation {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        name: String,
        arguments: Value,
    },

    /// Terminal event carrying usage and cost accounting.
    #[serde(rename = "Completed")]
    Completed {
        #[serde(skip_serializing_if = "Option::is_none")]
        usage: Option<crate::types::response::Usage>,
        #[serde(skip_serializing_if = "Option::is_none")]
        cost_usd: Option<f64>,
    },
}
