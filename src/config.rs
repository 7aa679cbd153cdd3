//! Gateway configuration.
//!
//! [`ToolConfiguration`] is parsed by an external collaborator (headers,
//! flags) and handed in as a plain value; the engine never reads environment
//! variables or headers directly.

use crate::choice::ChoiceResolverConfig;
use crate::coordinate::CoordinatorConfig;
use crate::ident::IdTrackerConfig;
use crate::schema::SchemaValidatorConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which tools are enabled and how permissive execution preparation is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfiguration {
    /// Tool names the deployment allows. Empty means "all requested tools".
    #[serde(default)]
    pub enabled_tools: Vec<String>,
    /// Tool names the deployment forbids outright.
    #[serde(default)]
    pub disallowed_tools: Vec<String>,
    #[serde(default)]
    pub permission_mode: PermissionMode,
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
}

fn default_max_turns() -> u32 {
    10
}

impl Default for ToolConfiguration {
    fn default() -> Self {
        Self {
            enabled_tools: Vec::new(),
            disallowed_tools: Vec::new(),
            permission_mode: PermissionMode::default(),
            max_turns: default_max_turns(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PermissionMode {
    #[default]
    Default,
    AcceptEdits,
    BypassPermissions,
    Plan,
}

/// Aggregated per-component tunables.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub schema: SchemaValidatorConfig,
    pub ids: IdTrackerConfig,
    pub choice: ChoiceResolverConfig,
    pub coordinator: CoordinatorConfig,
    pub tools: ToolConfiguration,
    /// All-or-nothing tool-call formatting instead of per-index partial success.
    pub strict_formatting: bool,
    /// Age threshold for [`crate::state::SessionStateManager::cleanup_expired`].
    pub state_max_age: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            schema: SchemaValidatorConfig::default(),
            ids: IdTrackerConfig::default(),
            choice: ChoiceResolverConfig::default(),
            coordinator: CoordinatorConfig::default(),
            tools: ToolConfiguration::default(),
            strict_formatting: false,
            state_max_age: Duration::from_secs(30 * 60),
        }
    }
}

impl GatewayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tools(mut self, tools: ToolConfiguration) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_strict_formatting(mut self, strict: bool) -> Self {
        self.strict_formatting = strict;
        self
    }

    pub fn with_state_max_age(mut self, max_age: Duration) -> Self {
        self.state_max_age = max_age;
        self
    }

    pub fn with_coordinator(mut self, coordinator: CoordinatorConfig) -> Self {
        self.coordinator = coordinator;
        self
    }
}
