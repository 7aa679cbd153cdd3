//! Tool and tool-choice definitions in both wire representations.
//!
//! The OpenAI side uses `function.parameters` (JSON Schema) and a
//! string-or-object `tool_choice`; the Claude side uses `input_schema` and a
//! mode string. Conversion between the two lives in [`crate::convert`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tool definition as carried by an OpenAI Chat Completions request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: String, // "function"
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>, // JSON Schema
    /// OpenAI structured-output flag. Claude has no counterpart; the
    /// converter drops it with a warning.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
}

impl ToolDefinition {
    pub fn function(name: impl Into<String>) -> Self {
        Self {
            tool_type: "function".into(),
            function: FunctionDefinition {
                name: name.into(),
                description: None,
                parameters: None,
                strict: None,
            },
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.function.description = Some(description.into());
        self
    }

    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.function.parameters = Some(parameters);
        self
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }
}

/// The `tool_choice` request parameter.
///
/// The mode variant keeps the raw string so that unknown values survive
/// parsing and are rejected by the converter rather than the deserializer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolChoice {
    Function(NamedToolChoice),
    Mode(String), // "auto" | "none" | "required"
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedToolChoice {
    #[serde(rename = "type")]
    pub choice_type: String, // "function"
    pub function: FunctionName,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionName {
    pub name: String,
}

impl ToolChoice {
    pub fn auto() -> Self {
        ToolChoice::Mode("auto".into())
    }

    pub fn none() -> Self {
        ToolChoice::Mode("none".into())
    }

    pub fn required() -> Self {
        ToolChoice::Mode("required".into())
    }

    pub fn function(name: impl Into<String>) -> Self {
        ToolChoice::Function(NamedToolChoice {
            choice_type: "function".into(),
            function: FunctionName { name: name.into() },
        })
    }
}

/// Tool call emitted in an OpenAI-shaped assistant message.
///
/// `id` is unique within a response and within the active session;
/// `function.arguments` is a JSON-encoded string. Immutable once formatted;
/// the state manager references it by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: String, // "function"
    pub function: FunctionCall,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String, // JSON-encoded
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            call_type: "function".into(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }

    /// Parse the JSON-encoded arguments string.
    pub fn parsed_arguments(&self) -> Option<Value> {
        serde_json::from_str(&self.function.arguments).ok()
    }
}

/// Tool definition in the Claude representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaudeTool {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub input_schema: Value,
}

/// Tool choice in the Claude representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClaudeToolChoice {
    Named { name: String },
    Mode(String), // "allowed" | "disabled" | "required"
}

/// A tool invocation as emitted by the model, before formatting.
///
/// `arguments` is still a structured value here; the response formatter
/// serializes it to the OpenAI wire string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaudeToolInvocation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub arguments: Value,
}

impl ClaudeToolInvocation {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: None,
            name: name.into(),
            arguments,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_choice_mode_roundtrip() {
        let choice: ToolChoice = serde_json::from_str(r#""auto""#).unwrap();
        assert_eq!(choice, ToolChoice::auto());
        assert_eq!(serde_json::to_string(&choice).unwrap(), r#""auto""#);
    }

    #[test]
    fn test_tool_choice_function_shape() {
        let raw = r#"{"type":"function","function":{"name":"get_weather"}}"#;
        let choice: ToolChoice = serde_json::from_str(raw).unwrap();
        match &choice {
            ToolChoice::Function(named) => assert_eq!(named.function.name, "get_weather"),
            other => panic!("Expected function choice, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_mode_survives_parsing() {
        // Unknown strings must reach the converter, which rejects them.
        let choice: ToolChoice = serde_json::from_str(r#""banana""#).unwrap();
        assert_eq!(choice, ToolChoice::Mode("banana".into()));
    }

    #[test]
    fn test_tool_definition_wire_shape() {
        let tool = ToolDefinition::function("lookup")
            .with_description("Look something up")
            .with_parameters(serde_json::json!({"type": "object"}));
        let v = serde_json::to_value(&tool).unwrap();
        assert_eq!(v["type"], "function");
        assert_eq!(v["function"]["name"], "lookup");
        assert!(v["function"].get("strict").is_none());
    }
}
