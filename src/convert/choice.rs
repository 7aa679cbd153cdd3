//! Tool-choice conversion.
//!
//! The enumerated string values map through a fixed lookup table; unknown
//! values are a conversion error, not a best-effort guess.

use super::ConversionError;
use crate::types::tool::{ClaudeToolChoice, ToolChoice};

/// `(openai, claude)` mode pairs, used in both directions.
const CHOICE_MODES: &[(&str, &str)] = &[
    ("auto", "allowed"),
    ("none", "disabled"),
    ("required", "required"),
];

pub fn convert_openai_choice(choice: &ToolChoice) -> Result<ClaudeToolChoice, ConversionError> {
    match choice {
        ToolChoice::Mode(mode) => CHOICE_MODES
            .iter()
            .find(|(openai, _)| openai == mode)
            .map(|(_, claude)| ClaudeToolChoice::Mode((*claude).into()))
            .ok_or_else(|| ConversionError::UnknownChoice {
                value: mode.clone(),
            }),
        ToolChoice::Function(named) => {
            if named.choice_type != "function" {
                return Err(ConversionError::UnknownChoice {
                    value: named.choice_type.clone(),
                });
            }
            Ok(ClaudeToolChoice::Named {
                name: named.function.name.clone(),
            })
        }
    }
}

pub fn convert_claude_choice(choice: &ClaudeToolChoice) -> Result<ToolChoice, ConversionError> {
    match choice {
        ClaudeToolChoice::Mode(mode) => CHOICE_MODES
            .iter()
            .find(|(_, claude)| claude == mode)
            .map(|(openai, _)| ToolChoice::Mode((*openai).into()))
            .ok_or_else(|| ConversionError::UnknownChoice {
                value: mode.clone(),
            }),
        ClaudeToolChoice::Named { name } => Ok(ToolChoice::function(name.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_lookup_table_both_ways() {
        for (openai, claude) in super::CHOICE_MODES {
            let converted = convert_openai_choice(&ToolChoice::Mode((*openai).into())).unwrap();
            assert_eq!(converted, ClaudeToolChoice::Mode((*claude).into()));
            let back = convert_claude_choice(&converted).unwrap();
            assert_eq!(back, ToolChoice::Mode((*openai).into()));
        }
    }

    #[test]
    fn test_function_choice_maps_to_named_tool() {
        let converted = convert_openai_choice(&ToolChoice::function("get_weather")).unwrap();
        assert_eq!(
            converted,
            ClaudeToolChoice::Named {
                name: "get_weather".into()
            }
        );
    }

    #[test]
    fn test_unknown_mode_is_an_error() {
        let err = convert_openai_choice(&ToolChoice::Mode("banana".into())).unwrap_err();
        assert!(matches!(err, ConversionError::UnknownChoice { .. }));
        let err = convert_claude_choice(&ClaudeToolChoice::Mode("anything".into())).unwrap_err();
        assert_eq!(err.code(), "UNKNOWN_TOOL_CHOICE");
    }
}
