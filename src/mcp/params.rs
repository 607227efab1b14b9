//! MCP tool parameter types with JSON Schema support.

use schemars::JsonSchema;
use serde::Deserialize;

use crate::ProfileSelector;

/// Parameters for the `search_profiles` MCP tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SearchParams {
    /// Organization key.
    pub organization: String,
    /// Only profiles for this language.
    #[serde(default)]
    pub language: Option<String>,
    /// Only profiles associated with this project key.
    #[serde(default)]
    pub project: Option<String>,
    /// Only the default profile of each language.
    #[serde(default)]
    pub defaults: bool,
}

/// Parameters for the `show_profile` MCP tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ShowParams {
    #[serde(flatten)]
    pub profile: ProfileSelector,
}

/// Parameters for the `changelog` MCP tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ChangelogParams {
    #[serde(flatten)]
    pub profile: ProfileSelector,
    /// Start date or datetime.
    #[serde(default)]
    pub since: Option<String>,
    /// End date or datetime.
    #[serde(default)]
    pub to: Option<String>,
    /// Maximum number of events to return (default 100, max 1000).
    #[serde(default)]
    pub limit: Option<usize>,
}
