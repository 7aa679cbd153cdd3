//! Gateway engine.
//!
//! Explicit, constructed instances of every component, threaded through the
//! request flow by dependency injection. There is no ambient global state:
//! the HTTP layer owns one engine and hands it parsed requests.

use crate::choice::{ChoiceError, ChoiceResolver, ResolvedChoice};
use crate::classify::{ClassifiedError, ErrorClass, ErrorClassifier, ErrorFormatter};
use crate::config::GatewayConfig;
use crate::convert::{convert_openai_choice, to_claude_tools};
use crate::coordinate::{mark_ready, BatchOutcome, DispatchMode, ParallelCoordinator};
use crate::error::{Error, ErrorContext};
use crate::ident::{CallIdGenerator, CallIdTracker, IdError};
use crate::provider::{CompletionOptions, CompletionProvider};
use crate::respond::ResponseFormatter;
use crate::schema::SchemaValidator;
use crate::state::{CallState, CleanupReport, SessionStateManager, UpdateRequest};
use crate::types::events::ProviderEvent;
use crate::types::request::ChatCompletionRequest;
use crate::types::response::{ChatCompletionResponse, ErrorEnvelope, Usage};
use crate::types::tool::{ClaudeToolInvocation, ToolCall, ToolDefinition};
use futures::StreamExt;
use serde_json::Value;
use std::sync::Arc;

/// A failure ready for the HTTP boundary: the OpenAI-shaped envelope plus
/// the status it ships with.
#[derive(Debug, Clone)]
pub struct GatewayFailure {
    pub envelope: ErrorEnvelope,
    pub status: u16,
}

pub struct GatewayEngine {
    config: GatewayConfig,
    validator: SchemaValidator,
    tracker: CallIdTracker,
    resolver: ChoiceResolver,
    formatter: ResponseFormatter,
    coordinator: ParallelCoordinator,
    states: SessionStateManager,
    classifier: ErrorClassifier,
    errors: ErrorFormatter,
    provider: Arc<dyn CompletionProvider>,
}

impl GatewayEngine {
    pub fn new(config: GatewayConfig, provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            validator: SchemaValidator::new(config.schema.clone()),
            tracker: CallIdTracker::new(config.ids.clone()),
            resolver: ChoiceResolver::new(config.choice.clone()),
            formatter: ResponseFormatter::new(CallIdGenerator::new()),
            coordinator: ParallelCoordinator::new(config.coordinator.clone()),
            states: SessionStateManager::new(),
            classifier: ErrorClassifier::new(),
            errors: ErrorFormatter::new(),
            config,
            provider,
        }
    }

    /// Serve one chat-completion request for a session.
    pub async fn handle_completion(
        &self,
        request: &ChatCompletionRequest,
        session_id: &str,
    ) -> Result<ChatCompletionResponse, GatewayFailure> {
        match self.run(request, session_id).await {
            Ok(response) => Ok(response),
            Err(error) => Err(self.render_failure(error)),
        }
    }

    /// Prepare a batch of formatted tool calls for execution, driving the
    /// state machine alongside the dispatcher.
    pub async fn execute_tool_calls(
        &self,
        session_id: &str,
        calls: Vec<ToolCall>,
        mode: DispatchMode,
    ) -> Result<BatchOutcome, GatewayFailure> {
        match self.dispatch(session_id, calls, mode).await {
            Ok(outcome) => Ok(outcome),
            Err(error) => Err(self.render_failure(error)),
        }
    }

    /// Expire old terminal state across all sessions.
    pub async fn cleanup(&self) -> CleanupReport {
        self.states.cleanup_expired(self.config.state_max_age).await
    }

    pub fn state_manager(&self) -> &SessionStateManager {
        &self.states
    }

    pub fn id_tracker(&self) -> &CallIdTracker {
        &self.tracker
    }

    pub fn schema_validator(&self) -> &SchemaValidator {
        &self.validator
    }

    async fn run(
        &self,
        request: &ChatCompletionRequest,
        session_id: &str,
    ) -> crate::Result<ChatCompletionResponse> {
        self.correlate_tool_results(request, session_id).await?;

        let tools = request.tools.clone().unwrap_or_default();
        self.check_tool_permissions(&tools)?;
        self.validate_tool_schemas(&tools)?;

        let resolved = self
            .resolver
            .resolve(request.tool_choice.as_ref(), &tools)?;

        let options = self.build_options(request, &tools, &resolved)?;
        let prompt = render_prompt(&request.messages);

        let mut stream = self.provider.complete(&prompt, &options).await?;
        let mut content = String::new();
        let mut invocations: Vec<ClaudeToolInvocation> = Vec::new();
        let mut usage: Option<Usage> = None;

        while let Some(event) = stream.next().await {
            match event? {
                ProviderEvent::SystemInit { .. } => {}
                ProviderEvent::AssistantDelta { content: delta } => content.push_str(&delta),
                ProviderEvent::ToolInvocation { id, name, arguments } => {
                    invocations.push(ClaudeToolInvocation {
                        id,
                        name,
                        arguments,
                    });
                }
                ProviderEvent::Completed { usage: reported, .. } => usage = reported,
            }
        }

        let outcome = self
            .formatter
            .format_tool_calls(&invocations, self.config.strict_formatting);
        if !outcome.success {
            if self.config.strict_formatting {
                if let Some((_, error)) = outcome.errors.first() {
                    return Err(error.clone().into());
                }
            }
            for (index, error) in &outcome.errors {
                tracing::warn!(index, %error, "dropping malformed tool invocation");
            }
        }

        for call in &outcome.tool_calls {
            self.tracker.track(&call.id, Some(session_id))?;
            self.states
                .create_tool_call(session_id, call.clone(), None)
                .await?;
        }

        let content = if content.is_empty() {
            None
        } else {
            Some(content)
        };
        Ok(self
            .formatter
            .build_tool_call_response(outcome.tool_calls, content, &request.model, usage))
    }

    /// Correlate inbound `role: "tool"` messages before the provider call.
    async fn correlate_tool_results(
        &self,
        request: &ChatCompletionRequest,
        session_id: &str,
    ) -> crate::Result<()> {
        for message in &request.messages {
            if !message.is_tool_result() {
                continue;
            }
            let id = message.tool_call_id.as_ref().ok_or_else(|| {
                Error::validation_with_context(
                    "tool message is missing tool_call_id",
                    ErrorContext::new()
                        .with_field_path("messages[].tool_call_id")
                        .with_source("correlation"),
                )
            })?;
            let content = Value::String(message.content.clone().unwrap_or_default());
            self.states
                .correlate_result(session_id, id, content)
                .await?;
        }
        Ok(())
    }

    fn check_tool_permissions(&self, tools: &[ToolDefinition]) -> crate::Result<()> {
        let config = &self.config.tools;
        for tool in tools {
            let name = tool.name();
            if config.disallowed_tools.iter().any(|t| t == name) {
                return Err(Error::validation_with_context(
                    format!("Tool {:?} is disallowed by configuration", name),
                    ErrorContext::new()
                        .with_field_path("tools")
                        .with_source("tool_configuration"),
                ));
            }
            if !config.enabled_tools.is_empty()
                && !config.enabled_tools.iter().any(|t| t == name)
            {
                return Err(Error::validation_with_context(
                    format!("Tool {:?} is not enabled for this deployment", name),
                    ErrorContext::new()
                        .with_field_path("tools")
                        .with_source("tool_configuration"),
                ));
            }
        }
        Ok(())
    }

    fn validate_tool_schemas(&self, tools: &[ToolDefinition]) -> crate::Result<()> {
        for (index, tool) in tools.iter().enumerate() {
            let report = self.validator.validate_tool(tool);
            if !report.valid {
                let first = &report.errors[0];
                return Err(Error::validation_with_context(
                    format!("tools[{}]: {}", index, first.message),
                    ErrorContext::new()
                        .with_field_path(format!("tools[{}].{}", index, first.field))
                        .with_details(first.code.clone())
                        .with_source("schema_validator"),
                ));
            }
        }
        Ok(())
    }

    fn build_options(
        &self,
        request: &ChatCompletionRequest,
        tools: &[ToolDefinition],
        resolved: &ResolvedChoice,
    ) -> crate::Result<CompletionOptions> {
        let claude_tools = if resolved.allow_tools && !tools.is_empty() {
            let outcome = to_claude_tools(tools);
            if let Some(error) = outcome.errors.into_iter().next() {
                return Err(error.into());
            }
            outcome.converted
        } else {
            Vec::new()
        };

        let choice_directive = match request.tool_choice.as_ref() {
            Some(choice) => Some(convert_openai_choice(choice)?),
            None => None,
        };

        let allowed_tools = match resolved.force_function.as_ref() {
            Some(forced) => vec![forced.clone()],
            None => claude_tools.iter().map(|t| t.name.clone()).collect(),
        };

        Ok(CompletionOptions {
            model: request.model.clone(),
            max_turns: self.config.tools.max_turns,
            allowed_tools,
            disallowed_tools: self.config.tools.disallowed_tools.clone(),
            tools: claude_tools,
            choice_directive,
        })
    }

    async fn dispatch(
        &self,
        session_id: &str,
        calls: Vec<ToolCall>,
        mode: DispatchMode,
    ) -> crate::Result<BatchOutcome> {
        for call in &calls {
            self.states
                .update_state(
                    session_id,
                    UpdateRequest::transition(call.id.as_str(), CallState::InProgress),
                )
                .await?;
        }

        let outcome = self.coordinator.process(calls, mode, mark_ready).await?;

        for result in &outcome.results {
            let request = if result.success {
                UpdateRequest::transition(result.tool_call_id.as_str(), CallState::Completed)
                    .with_result(result.result.clone().unwrap_or(Value::Null))
            } else {
                let message = result
                    .error
                    .as_ref()
                    .map(|f| f.message.clone())
                    .unwrap_or_else(|| "call failed".into());
                UpdateRequest::transition(result.tool_call_id.as_str(), CallState::Failed)
                    .with_error(message)
            };
            // A terminal state set elsewhere (e.g. cancellation) wins; the
            // transition table rejects the late write and we keep going.
            if let Err(error) = self.states.update_state(session_id, request).await {
                tracing::warn!(%error, "skipping state update after dispatch");
            }
        }
        Ok(outcome)
    }

    fn render_failure(&self, error: Error) -> GatewayFailure {
        let classified = self.classify_gateway_error(&error);
        let (envelope, status) = self.errors.format(&classified);
        GatewayFailure { envelope, status }
    }

    /// Map subsystem errors onto the taxonomy directly; anything else goes
    /// through keyword classification.
    fn classify_gateway_error(&self, error: &Error) -> ClassifiedError {
        let hint: Option<(ErrorClass, Option<String>)> = match error {
            // Choice failures, including the resolution-budget overrun, are
            // normal validation failures resolved before any SDK call.
            Error::Choice(e) => Some((ErrorClass::Validation, Some(e.code().to_string()))),
            Error::Conversion(e) => Some((ErrorClass::Format, Some(e.code().to_string()))),
            Error::Format(_) | Error::Serialization(_) => Some((ErrorClass::Format, None)),
            Error::Id(e) => {
                let class = match e {
                    IdError::OperationTimeout { .. } => ErrorClass::Timeout,
                    _ => ErrorClass::Validation,
                };
                Some((class, Some(e.code().to_string())))
            }
            Error::State(e) => Some((ErrorClass::Validation, Some(e.code().to_string()))),
            Error::Coordination(e) => Some((ErrorClass::Validation, Some(e.code().to_string()))),
            Error::Validation { .. } => Some((ErrorClass::Validation, None)),
            Error::Provider { .. } => Some((ErrorClass::System, None)),
            Error::Runtime { .. } | Error::Unknown { .. } => None,
        };

        let message = error.to_string();
        match hint {
            Some((class, code)) => {
                let recoverable = self.classifier.is_recoverable(class, &message);
                let action = self.classifier.recovery_action(class, recoverable);
                let mut classified = ClassifiedError {
                    class,
                    recoverable,
                    action,
                    message,
                    code,
                    tool_call_id: None,
                    function_name: None,
                    context: None,
                };
                if let Error::Choice(ChoiceError::FunctionNotFound { name }) = error {
                    classified = classified.with_function_name(name.clone());
                }
                classified
            }
            None => self.classifier.classify_error(message, None),
        }
    }
}

fn render_prompt(messages: &[crate::types::request::ChatMessage]) -> String {
    let mut prompt = String::new();
    for message in messages {
        if message.is_tool_result() {
            continue;
        }
        if let Some(ref content) = message.content {
            prompt.push_str(&message.role);
            prompt.push_str(": ");
            prompt.push_str(content);
            prompt.push('\n');
        }
    }
    prompt
}
