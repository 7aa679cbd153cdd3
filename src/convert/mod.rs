//! OpenAI ↔ Claude format conversion.
//!
//! Conversion is information-preserving for the fields both sides support
//! (`name`, `description`, schema body); fields with no counterpart are
//! dropped with an explicit warning, never silently corrupted. Validation
//! precedes conversion: malformed input is rejected before any mapping is
//! attempted.

pub mod choice;
pub mod roundtrip;
pub mod tools;

pub use choice::{convert_claude_choice, convert_openai_choice};
pub use roundtrip::{verify_choice_round_trip, verify_round_trip, RoundTripReport};
pub use tools::{to_claude_tools, to_openai_tools, ConversionOutcome, ConversionWarning};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("tools[{index}]: unsupported tool type {found:?}")]
    UnsupportedToolType { index: usize, found: String },

    #[error("tools[{index}]: function name is empty")]
    MissingName { index: usize },

    #[error("tools[{index}]: parameters schema is not a JSON object")]
    SchemaNotAnObject { index: usize },

    #[error("tools[{index}]: input_schema is not a JSON object")]
    InputSchemaNotAnObject { index: usize },

    #[error("Unknown tool choice value {value:?}")]
    UnknownChoice { value: String },
}

impl ConversionError {
    pub fn code(&self) -> &'static str {
        match self {
            ConversionError::UnsupportedToolType { .. } => "UNSUPPORTED_TOOL_TYPE",
            ConversionError::MissingName { .. } => "MISSING_FUNCTION_NAME",
            ConversionError::SchemaNotAnObject { .. }
            | ConversionError::InputSchemaNotAnObject { .. } => "SCHEMA_NOT_AN_OBJECT",
            ConversionError::UnknownChoice { .. } => "UNKNOWN_TOOL_CHOICE",
        }
    }
}
