//! The completion-provider boundary.
//!
//! The engine consumes an asynchronous, typed event sequence from an opaque
//! collaborator. Authentication, session transport and SDK details live on
//! the other side of this trait.

use crate::types::events::ProviderEvent;
use crate::types::tool::{ClaudeTool, ClaudeToolChoice};
use crate::{BoxStream, Result};
use async_trait::async_trait;

/// Options bag handed to the provider alongside the prompt.
#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    pub model: String,
    pub max_turns: u32,
    /// Tool names the model may invoke. Empty means "all provided tools".
    pub allowed_tools: Vec<String>,
    /// Tool names withheld from the model outright.
    pub disallowed_tools: Vec<String>,
    pub tools: Vec<ClaudeTool>,
    pub choice_directive: Option<ClaudeToolChoice>,
}

/// An asynchronous completion provider.
///
/// Implementations yield an ordered stream of [`ProviderEvent`]s:
/// `SystemInit` first, then any number of `AssistantDelta`/`ToolInvocation`
/// events, then a terminal `Completed`.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<BoxStream<'static, ProviderEvent>>;

    fn name(&self) -> &str {
        "completion-provider"
    }
}
