//! Tool-choice resolution.
//!
//! Interprets the `tool_choice` parameter into a behavior descriptor the
//! completion-request builder consumes. Validation happens here, before any
//! SDK call is issued: a function-choice naming an absent tool is an error,
//! and each resolution runs under a processing-time budget.

use crate::types::tool::{ToolChoice, ToolDefinition};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoiceMode {
    /// The model decides whether to call a tool.
    Auto,
    /// Text-only; tools are withheld from the request.
    NoTools,
    /// The model must call the named function.
    Specific,
    /// The model must call some tool, any tool.
    Any,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceRestrictions {
    pub specific_function: bool,
}

/// Behavior descriptor produced from a `tool_choice`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedChoice {
    pub mode: ChoiceMode,
    pub allow_tools: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force_function: Option<String>,
    pub restrictions: ChoiceRestrictions,
}

impl ResolvedChoice {
    fn auto() -> Self {
        Self {
            mode: ChoiceMode::Auto,
            allow_tools: true,
            force_function: None,
            restrictions: ChoiceRestrictions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChoiceError {
    #[error("tool_choice names function {name:?}, which is not among the provided tools")]
    FunctionNotFound { name: String },

    #[error("Unknown tool_choice value {value:?}")]
    UnknownMode { value: String },

    #[error("Choice resolution took {elapsed_ms}ms, budget is {budget_ms}ms")]
    ProcessingTimeout { elapsed_ms: u64, budget_ms: u64 },
}

impl ChoiceError {
    pub fn code(&self) -> &'static str {
        match self {
            ChoiceError::FunctionNotFound { .. } => "CHOICE_FUNCTION_NOT_FOUND",
            ChoiceError::UnknownMode { .. } => "CHOICE_UNKNOWN_MODE",
            ChoiceError::ProcessingTimeout { .. } => "CHOICE_PROCESSING_TIMEOUT",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChoiceResolverConfig {
    pub budget: Duration,
}

impl Default for ChoiceResolverConfig {
    fn default() -> Self {
        Self {
            budget: Duration::from_millis(5),
        }
    }
}

pub struct ChoiceResolver {
    config: ChoiceResolverConfig,
}

impl ChoiceResolver {
    pub fn new(config: ChoiceResolverConfig) -> Self {
        Self { config }
    }

    /// Resolve a `tool_choice` (absent means `"auto"`) against the tool set.
    pub fn resolve(
        &self,
        choice: Option<&ToolChoice>,
        tools: &[ToolDefinition],
    ) -> Result<ResolvedChoice, ChoiceError> {
        let start = Instant::now();

        let resolved = match choice {
            None => ResolvedChoice::auto(),
            Some(ToolChoice::Mode(mode)) => match mode.as_str() {
                "auto" => ResolvedChoice::auto(),
                "none" => ResolvedChoice {
                    mode: ChoiceMode::NoTools,
                    allow_tools: false,
                    force_function: None,
                    restrictions: ChoiceRestrictions::default(),
                },
                "required" => ResolvedChoice {
                    mode: ChoiceMode::Any,
                    allow_tools: true,
                    force_function: None,
                    restrictions: ChoiceRestrictions::default(),
                },
                other => {
                    return Err(ChoiceError::UnknownMode {
                        value: other.into(),
                    })
                }
            },
            Some(ToolChoice::Function(named)) => {
                let name = &named.function.name;
                if !tools.iter().any(|t| t.function.name == *name) {
                    return Err(ChoiceError::FunctionNotFound { name: name.clone() });
                }
                ResolvedChoice {
                    mode: ChoiceMode::Specific,
                    allow_tools: true,
                    force_function: Some(name.clone()),
                    restrictions: ChoiceRestrictions {
                        specific_function: true,
                    },
                }
            }
        };

        let elapsed = start.elapsed();
        if elapsed > self.config.budget {
            return Err(ChoiceError::ProcessingTimeout {
                elapsed_ms: elapsed.as_millis() as u64,
                budget_ms: self.config.budget.as_millis() as u64,
            });
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> ChoiceResolver {
        ChoiceResolver::new(ChoiceResolverConfig::default())
    }

    fn tools() -> Vec<ToolDefinition> {
        vec![ToolDefinition::function("get_weather")]
    }

    #[test]
    fn test_absent_choice_resolves_to_auto() {
        let resolved = resolver().resolve(None, &tools()).unwrap();
        assert_eq!(resolved.mode, ChoiceMode::Auto);
        assert!(resolved.allow_tools);
        assert!(resolved.force_function.is_none());
    }

    #[test]
    fn test_none_disables_tools() {
        let resolved = resolver()
            .resolve(Some(&ToolChoice::none()), &tools())
            .unwrap();
        assert_eq!(resolved.mode, ChoiceMode::NoTools);
        assert!(!resolved.allow_tools);
    }

    #[test]
    fn test_required_allows_any_tool() {
        let resolved = resolver()
            .resolve(Some(&ToolChoice::required()), &tools())
            .unwrap();
        assert_eq!(resolved.mode, ChoiceMode::Any);
        assert!(resolved.allow_tools);
        assert!(resolved.force_function.is_none());
    }

    #[test]
    fn test_function_choice_forces_named_function() {
        let resolved = resolver()
            .resolve(Some(&ToolChoice::function("get_weather")), &tools())
            .unwrap();
        assert_eq!(resolved.mode, ChoiceMode::Specific);
        assert_eq!(resolved.force_function.as_deref(), Some("get_weather"));
        assert!(resolved.restrictions.specific_function);
    }

    #[test]
    fn test_function_absent_from_tool_list() {
        let err = resolver()
            .resolve(Some(&ToolChoice::function("missing")), &[])
            .unwrap_err();
        assert_eq!(err.code(), "CHOICE_FUNCTION_NOT_FOUND");
    }

    #[test]
    fn test_unknown_mode_rejected() {
        let err = resolver()
            .resolve(Some(&ToolChoice::Mode("sometimes".into())), &tools())
            .unwrap_err();
        assert_eq!(err.code(), "CHOICE_UNKNOWN_MODE");
    }
}
