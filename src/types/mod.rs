//! Core wire types shared across the gateway.
//!
//! Everything in this module is a value object: constructed from request
//! input or provider output, validated once, and treated as immutable
//! thereafter.

pub mod events;
pub mod request;
pub mod response;
pub mod tool;

pub use events::ProviderEvent;
pub use request::{ChatCompletionRequest, ChatMessage};
pub use response::{ChatCompletionResponse, ErrorBody, ErrorEnvelope, Usage};
pub use tool::{
    ClaudeTool, ClaudeToolChoice, ClaudeToolInvocation, FunctionCall, FunctionDefinition,
    ToolCall, ToolChoice, ToolDefinition,
};
