//! Serde-driven selector configuration.
//!
//! ```json
//! [
//!   { "type": "aspect",
//!     "file_name_allowlist": [".*\\.kzip"],
//!     "output_group_allowlist": ["kythe_compilation_unit"],
//!     "target_aspect_allowlist": [".*kythe.*"] },
//!   { "type": "extra_action", "action_types": ["CppCompile"] }
//! ]
//! ```

use serde::{Deserialize, Serialize};

use crate::allowlist::Allowlist;
use crate::aspect::{AspectArtifactSelector, AspectSelectorOptions};
use crate::error::ConfigError;
use crate::extra_action::ExtraActionSelector;
use crate::selector::AnySelector;

fn match_all() -> Vec<String> {
    vec![".*".to_string()]
}

/// Declarative description of one selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SelectorConfig {
    Aspect {
        #[serde(default)]
        file_name_allowlist: Vec<String>,
        #[serde(default)]
        output_group_allowlist: Vec<String>,
        #[serde(default = "match_all")]
        target_aspect_allowlist: Vec<String>,
    },
    ExtraAction {
        /// Allowed action types; empty selects every successful action.
        #[serde(default)]
        action_types: Vec<String>,
        /// Takes precedence over `action_types` when present.
        #[serde(default)]
        action_pattern: Option<String>,
    },
}

impl SelectorConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn list_from_json(json: &str) -> Result<Vec<Self>, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Compile this description into a selector.
    pub fn build(&self) -> Result<AnySelector, ConfigError> {
        match self {
            SelectorConfig::Aspect {
                file_name_allowlist,
                output_group_allowlist,
                target_aspect_allowlist,
            } => {
                let options = AspectSelectorOptions {
                    file_name_allowlist: Allowlist::build(file_name_allowlist.iter().cloned())?,
                    output_group_allowlist: Allowlist::build(
                        output_group_allowlist.iter().cloned(),
                    )?,
                    target_aspect_allowlist: Allowlist::build(
                        target_aspect_allowlist.iter().cloned(),
                    )?,
                };
                Ok(AspectArtifactSelector::new(options).into())
            }
            SelectorConfig::ExtraAction {
                action_pattern: Some(pattern),
                ..
            } => Ok(ExtraActionSelector::from_pattern(Some(pattern.as_str()))?.into()),
            SelectorConfig::ExtraAction { action_types, .. } => {
                Ok(ExtraActionSelector::new(action_types.iter().cloned()).into())
            }
        }
    }
}

/// Build every selector in `configs`, failing on the first bad pattern.
pub fn build_selectors(configs: &[SelectorConfig]) -> Result<Vec<AnySelector>, ConfigError> {
    configs.iter().map(SelectorConfig::build).collect()
}
