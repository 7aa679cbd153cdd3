//! 工具定义的双向转换 — OpenAI `function.parameters` 与 Claude `input_schema`。
//!
//! Tool definition conversion. Handles the key differences between the sides:
//! - OpenAI nests under `function`, Claude is flat.
//! - `function.parameters` ↔ `input_schema` (both JSON Schema, pass-through).
//! - Claude → OpenAI defaults `type: "object"` when `properties` exist but
//!   `type` is absent.
//! - OpenAI `strict` has no Claude counterpart and is dropped with a warning.

use super::ConversionError;
use crate::types::tool::{ClaudeTool, FunctionDefinition, ToolDefinition};
use serde_json::Value;

/// Outcome of a batch conversion. `converted` is empty whenever `success`
/// is false; there is no partial conversion.
#[derive(Debug, Clone)]
pub struct ConversionOutcome<T> {
    pub success: bool,
    pub converted: T,
    pub errors: Vec<ConversionError>,
    pub warnings: Vec<ConversionWarning>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionWarning {
    pub tool: String,
    pub field: String,
    pub message: String,
}

fn empty_object_schema() -> Value {
    serde_json::json!({"type": "object", "properties": {}})
}

/// Convert OpenAI tool definitions into the Claude representation.
pub fn to_claude_tools(tools: &[ToolDefinition]) -> ConversionOutcome<Vec<ClaudeTool>> {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    // Validation pass first: no mapping is attempted for a malformed batch.
    for (index, tool) in tools.iter().enumerate() {
        if tool.tool_type != "function" {
            errors.push(ConversionError::UnsupportedToolType {
                index,
                found: tool.tool_type.clone(),
            });
        }
        if tool.function.name.is_empty() {
            errors.push(ConversionError::MissingName { index });
        }
        if let Some(ref parameters) = tool.function.parameters {
            if !parameters.is_object() {
                errors.push(ConversionError::SchemaNotAnObject { index });
            }
        }
    }
    if !errors.is_empty() {
        return ConversionOutcome {
            success: false,
            converted: Vec::new(),
            errors,
            warnings,
        };
    }

    let converted = tools
        .iter()
        .map(|tool| {
            if tool.function.strict.is_some() {
                tracing::warn!(
                    tool = %tool.function.name,
                    "dropping `strict` flag: no Claude counterpart"
                );
                warnings.push(ConversionWarning {
                    tool: tool.function.name.clone(),
                    field: "function.strict".into(),
                    message: "dropped: no Claude counterpart".into(),
                });
            }
            ClaudeTool {
                name: tool.function.name.clone(),
                description: tool.function.description.clone(),
                input_schema: tool
                    .function
                    .parameters
                    .clone()
                    .unwrap_or_else(empty_object_schema),
            }
        })
        .collect();

    ConversionOutcome {
        success: true,
        converted,
        errors,
        warnings,
    }
}

/// Convert Claude tools back into OpenAI tool definitions.
pub fn to_openai_tools(tools: &[ClaudeTool]) -> ConversionOutcome<Vec<ToolDefinition>> {
    let mut errors = Vec::new();
    let warnings = Vec::new();

    for (index, tool) in tools.iter().enumerate() {
        if tool.name.is_empty() {
            errors.push(ConversionError::MissingName { index });
        }
        if !tool.input_schema.is_object() {
            errors.push(ConversionError::InputSchemaNotAnObject { index });
        }
    }
    if !errors.is_empty() {
        return ConversionOutcome {
            success: false,
            converted: Vec::new(),
            errors,
            warnings,
        };
    }

    let converted = tools
        .iter()
        .map(|tool| {
            let mut parameters = tool.input_schema.clone();
            // Claude schemas sometimes omit the top-level type; OpenAI
            // consumers expect it when properties are declared.
            if let Some(obj) = parameters.as_object_mut() {
                if !obj.contains_key("type") && obj.contains_key("properties") {
                    obj.insert("type".into(), Value::String("object".into()));
                }
            }
            ToolDefinition {
                tool_type: "function".into(),
                function: FunctionDefinition {
                    name: tool.name.clone(),
                    description: tool.description.clone(),
                    parameters: Some(parameters),
                    strict: None,
                },
            }
        })
        .collect();

    ConversionOutcome {
        success: true,
        converted,
        errors,
        warnings,
    }
}
