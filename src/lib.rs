//! # claude-gateway-rs
//!
//! OpenAI-compatible tool-call lifecycle engine over a Claude-style completion
//! provider.
//!
//! ## Overview
//!
//! This library implements the translation core of an HTTP gateway that accepts
//! OpenAI Chat Completions requests and serves them from a Claude-style model
//! SDK: tool schemas are validated and converted between the two
//! representations, tool invocations emitted by the model are stamped with
//! stable identifiers and tracked through a per-session state machine, and
//! parallel tool-call batches are analyzed for conflicts before being
//! dispatched under a bounded concurrency window. Every failure is classified
//! into a fixed taxonomy and rendered as an OpenAI-shaped error envelope.
//!
//! The HTTP routing layer and the model SDK transport are external
//! collaborators: routes hand a parsed [`ChatCompletionRequest`] to the
//! [`GatewayEngine`], and the engine talks to the model through the
//! [`provider::CompletionProvider`] trait.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use claude_gateway_rs::{GatewayConfig, GatewayEngine};
//! use claude_gateway_rs::types::request::ChatCompletionRequest;
//! use std::sync::Arc;
//!
//! # async fn run(provider: Arc<dyn claude_gateway_rs::provider::CompletionProvider>) {
//! let engine = GatewayEngine::new(GatewayConfig::default(), provider);
//!
//! let request: ChatCompletionRequest = serde_json::from_str(
//!     r#"{"model":"claude-sonnet-4-20250514","messages":[{"role":"user","content":"Hi"}]}"#,
//! ).unwrap();
//!
//! match engine.handle_completion(&request, "session-1").await {
//!     Ok(response) => println!("{}", serde_json::to_string(&response).unwrap()),
//!     Err(failure) => println!("HTTP {}: {:?}", failure.status, failure.envelope),
//! }
//! # }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`types`] | Wire types (tools, choices, calls, envelopes, provider events) |
//! | [`schema`] | Tool schema validation with a bounded, TTL-expiring cache |
//! | [`ident`] | Call id generation and per-session tracking |
//! | [`convert`] | OpenAI ↔ Claude format conversion with round-trip checks |
//! | [`choice`] | `tool_choice` resolution into a behavior descriptor |
//! | [`respond`] | Tool-call and chat-completion response formatting |
//! | [`coordinate`] | Conflict detection and sliding-window parallel dispatch |
//! | [`state`] | Per-session tool-call state machine with expiry cleanup |
//! | [`classify`] | Error taxonomy, recovery actions, error envelope rendering |
//! | [`provider`] | The asynchronous completion-provider boundary |
//! | [`engine`] | Dependency-injected wiring of the full request flow |

pub mod choice;
pub mod classify;
pub mod config;
pub mod convert;
pub mod coordinate;
pub mod engine;
pub mod ident;
pub mod provider;
pub mod respond;
pub mod schema;
pub mod state;
pub mod types;

// Re-export main types for convenience
pub use config::{GatewayConfig, PermissionMode, ToolConfiguration};
pub use engine::{GatewayEngine, GatewayFailure};
pub use types::{
    response::ChatCompletionResponse,
    tool::{ToolCall, ToolChoice, ToolDefinition},
};

use futures::Stream;
use std::pin::Pin;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// A unified pinned, boxed stream of provider events
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = Result<T>> + Send + 'a>>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
