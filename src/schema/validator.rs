//! 工具模式校验：名称规则、递归深度与属性数量上限、类型关键字白名单。
//!
//! Tool schema validator.
//!
//! Validates a tool definition against the supported JSON-Schema subset:
//! - Name pattern, reserved-word and length checks
//! - Parameters must be object-shaped, recursion bounded at depth 5
//! - At most 100 properties total, counted recursively
//! - Every `type` keyword drawn from the closed primitive set
//!
//! Reports are memoized by canonical schema hash; a cache hit returns the
//! stored report with `cache_hit: true` without re-running validation.

use super::cache::{canonical_hash, ValidationCache, ValidationCacheConfig};
use crate::types::tool::{FunctionDefinition, ToolDefinition};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Mutex;
use std::time::{Duration, Instant};

static NAME_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

const RESERVED_NAMES: &[&str] = &["function", "tool", "system", "user", "assistant"];
const ALLOWED_TYPES: &[&str] = &[
    "string", "number", "integer", "boolean", "object", "array", "null",
];
const MAX_NAME_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Error,
    Warning,
}

/// Field-scoped validation issue, enabling targeted client remediation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaIssue {
    pub field: String,
    pub code: String,
    pub message: String,
    pub severity: IssueSeverity,
}

impl SchemaIssue {
    pub fn error(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
            severity: IssueSeverity::Error,
        }
    }
}

/// Result of a validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaReport {
    pub valid: bool,
    pub errors: Vec<SchemaIssue>,
    pub validation_time_ms: f64,
    pub cache_hit: bool,
}

impl SchemaReport {
    fn from_issues(errors: Vec<SchemaIssue>, elapsed: Duration) -> Self {
        let valid = !errors.iter().any(|e| e.severity == IssueSeverity::Error);
        Self {
            valid,
            errors,
            validation_time_ms: elapsed.as_secs_f64() * 1000.0,
            cache_hit: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SchemaValidatorConfig {
    pub max_depth: usize,
    pub max_properties: usize,
    /// Advisory single-validation budget; overruns are logged, never failed.
    pub time_budget_ms: u64,
    pub cache: ValidationCacheConfig,
}

impl Default for SchemaValidatorConfig {
    fn default() -> Self {
        Self {
            max_depth: 5,
            max_properties: 100,
            time_budget_ms: 10,
            cache: ValidationCacheConfig::default(),
        }
    }
}

/// Tool schema validator with memoized reports.
pub struct SchemaValidator {
    config: SchemaValidatorConfig,
    cache: Mutex<ValidationCache>,
}

impl SchemaValidator {
    pub fn new(config: SchemaValidatorConfig) -> Self {
        let cache = Mutex::new(ValidationCache::new(&config.cache));
        Self { config, cache }
    }

    /// Validate a full tool definition.
    pub fn validate_tool(&self, tool: &ToolDefinition) -> SchemaReport {
        let key = canonical_hash(&serde_json::to_value(tool).unwrap_or(Value::Null));
        if let Some(mut report) = self.cache.lock().unwrap().get(&key) {
            report.cache_hit = true;
            return report;
        }

        let start = Instant::now();
        let mut issues = Vec::new();

        if tool.tool_type != "function" {
            issues.push(SchemaIssue::error(
                "type",
                "unsupported_tool_type",
                format!("Unsupported tool type: {:?}", tool.tool_type),
            ));
        }
        self.check_function(&tool.function, &mut issues);

        let report = SchemaReport::from_issues(issues, start.elapsed());
        self.log_budget_overrun(&report);
        self.cache.lock().unwrap().put(key, report.clone());
        report
    }

    /// Validate just a function definition.
    pub fn validate_function(&self, function: &FunctionDefinition) -> SchemaReport {
        let start = Instant::now();
        let mut issues = Vec::new();
        self.check_function(function, &mut issues);
        let report = SchemaReport::from_issues(issues, start.elapsed());
        self.log_budget_overrun(&report);
        report
    }

    /// Validate a parameters schema on its own.
    pub fn validate_parameters(&self, parameters: &Value) -> SchemaReport {
        let start = Instant::now();
        let mut issues = Vec::new();
        self.check_parameters(parameters, "parameters", &mut issues);
        let report = SchemaReport::from_issues(issues, start.elapsed());
        self.log_budget_overrun(&report);
        report
    }

    pub fn cache_len(&self) -> usize {
        self.cache.lock().unwrap().len()
    }

    fn check_function(&self, function: &FunctionDefinition, issues: &mut Vec<SchemaIssue>) {
        let name = &function.name;
        if name.is_empty() || name.len() > MAX_NAME_LEN {
            issues.push(SchemaIssue::error(
                "function.name",
                "name_length",
                format!(
                    "Function name must be 1-{} characters, got {}",
                    MAX_NAME_LEN,
                    name.len()
                ),
            ));
        } else if !NAME_PATTERN.is_match(name) {
            issues.push(SchemaIssue::error(
                "function.name",
                "invalid_name_pattern",
                format!("Function name {:?} must match ^[A-Za-z0-9_-]+$", name),
            ));
        }
        if RESERVED_NAMES.contains(&name.as_str()) {
            issues.push(SchemaIssue::error(
                "function.name",
                "reserved_name",
                format!("Function name {:?} is reserved", name),
            ));
        }

        if let Some(ref parameters) = function.parameters {
            self.check_parameters(parameters, "function.parameters", issues);
        }
    }

    fn check_parameters(&self, parameters: &Value, field: &str, issues: &mut Vec<SchemaIssue>) {
        let obj = match parameters.as_object() {
            Some(o) => o,
            None => {
                issues.push(SchemaIssue::error(
                    field,
                    "not_an_object",
                    "Parameters schema must be a JSON object",
                ));
                return;
            }
        };

        if let Some(declared) = obj.get("type").and_then(|t| t.as_str()) {
            if declared != "object" {
                issues.push(SchemaIssue::error(
                    format!("{}.type", field),
                    "not_an_object",
                    format!("Top-level parameters schema must be object-shaped, got {:?}", declared),
                ));
            }
        }

        let mut property_count = 0usize;
        self.walk_schema(parameters, field, 1, &mut property_count, issues);

        if property_count > self.config.max_properties {
            issues.push(SchemaIssue::error(
                field,
                "too_many_properties",
                format!(
                    "Schema declares {} properties, maximum is {}",
                    property_count, self.config.max_properties
                ),
            ));
        }
    }

    fn walk_schema(
        &self,
        schema: &Value,
        path: &str,
        depth: usize,
        property_count: &mut usize,
        issues: &mut Vec<SchemaIssue>,
    ) {
        if depth > self.config.max_depth {
            issues.push(SchemaIssue::error(
                path,
                "max_depth_exceeded",
                format!("Schema nesting exceeds maximum depth {}", self.config.max_depth),
            ));
            return;
        }
        let obj = match schema.as_object() {
            Some(o) => o,
            None => return,
        };

        if let Some(declared) = obj.get("type") {
            match declared.as_str() {
                Some(name) if ALLOWED_TYPES.contains(&name) => {}
                Some(name) => issues.push(SchemaIssue::error(
                    format!("{}.type", path),
                    "invalid_type_keyword",
                    format!("Unknown schema type {:?}", name),
                )),
                None => issues.push(SchemaIssue::error(
                    format!("{}.type", path),
                    "invalid_type_keyword",
                    "Schema type keyword must be a string",
                )),
            }
        }

        if let Some(properties) = obj.get("properties").and_then(|p| p.as_object()) {
            for (name, child) in properties {
                *property_count += 1;
                let child_path = format!("{}.properties.{}", path, name);
                self.walk_schema(child, &child_path, depth + 1, property_count, issues);
            }
        }

        if let Some(items) = obj.get("items") {
            let item_path = format!("{}.items", path);
            self.walk_schema(items, &item_path, depth + 1, property_count, issues);
        }
    }

    fn log_budget_overrun(&self, report: &SchemaReport) {
        let budget = self.config.time_budget_ms as f64;
        if report.validation_time_ms > budget {
            tracing::warn!(
                elapsed_ms = report.validation_time_ms,
                budget_ms = budget,
                "schema validation exceeded advisory time budget"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> SchemaValidator {
        SchemaValidator::new(SchemaValidatorConfig::default())
    }

    fn weather_tool() -> ToolDefinition {
        ToolDefinition::function("get_weather").with_parameters(serde_json::json!({
            "type": "object",
            "properties": {"city": {"type": "string"}}
        }))
    }

    #[test]
    fn test_valid_tool_passes() {
        let report = validator().validate_tool(&weather_tool());
        assert!(report.valid, "errors: {:?}", report.errors);
        assert!(!report.cache_hit);
    }

    #[test]
    fn test_reserved_name_rejected() {
        let tool = ToolDefinition::function("function");
        let report = validator().validate_tool(&tool);
        assert!(!report.valid);
        assert!(report.errors.iter().any(|e| e.code == "reserved_name"));
    }

    #[test]
    fn test_name_pattern_rejected() {
        let tool = ToolDefinition::function("bad name!");
        let report = validator().validate_tool(&tool);
        assert!(!report.valid);
        assert!(report.errors.iter().any(|e| e.code == "invalid_name_pattern"));
    }

    #[test]
    fn test_name_length_bounds() {
        let report = validator().validate_tool(&ToolDefinition::function("a".repeat(65)));
        assert!(report.errors.iter().any(|e| e.code == "name_length"));
        let report = validator().validate_tool(&ToolDefinition::function(""));
        assert!(report.errors.iter().any(|e| e.code == "name_length"));
    }

    #[test]
    fn test_parameters_must_be_object() {
        let tool = ToolDefinition::function("lookup")
            .with_parameters(serde_json::json!(["not", "an", "object"]));
        let report = validator().validate_tool(&tool);
        assert!(report.errors.iter().any(|e| e.code == "not_an_object"));
    }

    #[test]
    fn test_depth_limit() {
        // properties at depths 2 through 6; the innermost exceeds max_depth 5
        let schema = serde_json::json!({
            "type": "object",
            "properties": {"a": {"type": "object",
                "properties": {"b": {"type": "object",
                    "properties": {"c": {"type": "object",
                        "properties": {"d": {"type": "object",
                            "properties": {"e": {"type": "string"}}}}}}}}}}
        });
        let report = validator().validate_parameters(&schema);
        assert!(report.errors.iter().any(|e| e.code == "max_depth_exceeded"));
    }

    #[test]
    fn test_property_count_limit() {
        let mut properties = serde_json::Map::new();
        for i in 0..101 {
            properties.insert(format!("p{}", i), serde_json::json!({"type": "string"}));
        }
        let schema = serde_json::json!({"type": "object", "properties": properties});
        let report = validator().validate_parameters(&schema);
        assert!(report.errors.iter().any(|e| e.code == "too_many_properties"));
    }

    #[test]
    fn test_unknown_type_keyword() {
        let schema = serde_json::json!({
            "type": "object",
            "properties": {"x": {"type": "decimal"}}
        });
        let report = validator().validate_parameters(&schema);
        assert!(report.errors.iter().any(|e| e.code == "invalid_type_keyword"));
    }

    #[test]
    fn test_cache_hit_returns_stored_report() {
        let v = validator();
        let tool = weather_tool();
        let first = v.validate_tool(&tool);
        assert!(!first.cache_hit);
        let second = v.validate_tool(&tool);
        assert!(second.cache_hit);
        assert_eq!(second.valid, first.valid);
        assert_eq!(v.cache_len(), 1);
    }
}
