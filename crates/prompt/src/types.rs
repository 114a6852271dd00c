//! Prompt definition types.

use serde::{Deserialize, Serialize};

/// A system prompt definition loaded from YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Unique prompt identifier
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Creator identifier
    #[serde(rename = "createdBy", default, skip_serializing_if = "String::is_empty")]
    pub created_by: String,

    /// Handlebars system template; must reference `{{context}}`
    pub template: String,
}
