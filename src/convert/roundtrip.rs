//! Round-trip fidelity checks.
//!
//! Converting OpenAI → Claude → OpenAI must preserve `type`, `function.name`,
//! `function.description`, and structurally-equal `parameters`. This is an
//! explicit, testable operation rather than hoped-for behavior.

use super::choice::{convert_claude_choice, convert_openai_choice};
use super::tools::{to_claude_tools, to_openai_tools};
use super::ConversionError;
use crate::types::tool::{ToolChoice, ToolDefinition};

#[derive(Debug, Clone, Default)]
pub struct RoundTripReport {
    pub passed: bool,
    pub mismatches: Vec<String>,
}

/// Run a full openai → claude → openai round trip and compare the essential
/// fields of each tool.
pub fn verify_round_trip(tools: &[ToolDefinition]) -> Result<RoundTripReport, ConversionError> {
    let forward = to_claude_tools(tools);
    if let Some(error) = forward.errors.into_iter().next() {
        return Err(error);
    }
    let back = to_openai_tools(&forward.converted);
    if let Some(error) = back.errors.into_iter().next() {
        return Err(error);
    }

    let mut mismatches = Vec::new();
    for (index, (original, restored)) in tools.iter().zip(back.converted.iter()).enumerate() {
        if original.tool_type != restored.tool_type {
            mismatches.push(format!("tools[{}].type", index));
        }
        if original.function.name != restored.function.name {
            mismatches.push(format!("tools[{}].function.name", index));
        }
        if original.function.description != restored.function.description {
            mismatches.push(format!("tools[{}].function.description", index));
        }
        // Deep structural equality; absent parameters round-trip to the
        // default empty object schema, which counts as preserved.
        if let Some(ref original_params) = original.function.parameters {
            if restored.function.parameters.as_ref() != Some(original_params) {
                mismatches.push(format!("tools[{}].function.parameters", index));
            }
        }
    }

    Ok(RoundTripReport {
        passed: mismatches.is_empty(),
        mismatches,
    })
}

/// Round-trip a tool choice through the Claude representation.
pub fn verify_choice_round_trip(choice: &ToolChoice) -> Result<bool, ConversionError> {
    let forward = convert_openai_choice(choice)?;
    let back = convert_claude_choice(&forward)?;
    Ok(&back == choice)
}
