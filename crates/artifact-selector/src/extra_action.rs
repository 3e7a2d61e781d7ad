//! Selection of artifacts emitted by extra actions.

use std::collections::HashSet;

use regex::Regex;
use tracing::debug;

use crate::artifact::Artifact;
use crate::error::ConfigError;
use crate::event::{ActionCompleted, BuildEvent};
use crate::selector::ArtifactSelector;

#[derive(Debug, Clone)]
enum ActionMatcher {
    AnyAction,
    Types(HashSet<String>),
    Pattern(Regex),
    Nothing,
}

impl ActionMatcher {
    fn matches(&self, action_type: &str) -> bool {
        match self {
            ActionMatcher::AnyAction => true,
            ActionMatcher::Types(types) => types.contains(action_type),
            ActionMatcher::Pattern(re) => re.is_match(action_type),
            ActionMatcher::Nothing => false,
        }
    }
}

/// Selects the primary output of successful `ActionCompleted` events.
///
/// Stateless: serialization is a no-op and deserialization reports
/// `Unimplemented`.
#[derive(Debug, Clone)]
pub struct ExtraActionSelector {
    matcher: ActionMatcher,
}

impl ExtraActionSelector {
    /// Match actions whose type is in `action_types`. An empty set
    /// selects every successful action.
    pub fn new<I, S>(action_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let types: HashSet<String> = action_types.into_iter().map(Into::into).collect();
        let matcher = if types.is_empty() {
            ActionMatcher::AnyAction
        } else {
            ActionMatcher::Types(types)
        };
        Self { matcher }
    }

    /// Match actions whose whole type matches `pattern`. A missing or
    /// empty pattern matches nothing.
    pub fn from_pattern(pattern: Option<&str>) -> Result<Self, ConfigError> {
        let matcher = match pattern {
            None | Some("") => ActionMatcher::Nothing,
            Some(pattern) => {
                let re = Regex::new(&format!("^(?:{pattern})$")).map_err(|source| {
                    ConfigError::InvalidPattern {
                        pattern: pattern.to_string(),
                        source,
                    }
                })?;
                ActionMatcher::Pattern(re)
            }
        };
        Ok(Self { matcher })
    }

    fn select_action(&self, action: &ActionCompleted) -> Option<Artifact> {
        if !action.success || !self.matcher.matches(&action.action_type) {
            return None;
        }
        let output = action.primary_output.as_ref()?;
        debug!(
            label = %action.label,
            action_type = %action.action_type,
            output = %output.name,
            "selected extra action artifact"
        );
        Some(Artifact {
            id: action.label.clone(),
            files: vec![output.clone()],
        })
    }
}

impl Default for ExtraActionSelector {
    fn default() -> Self {
        Self::new(Vec::<String>::new())
    }
}

impl ArtifactSelector for ExtraActionSelector {
    fn select(&mut self, event: &BuildEvent) -> Option<Artifact> {
        match event {
            BuildEvent::ActionCompleted(action) => self.select_action(action),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SelectorStateError;
    use crate::event::File;
    use crate::state::StatePayload;

    fn action(action_type: &str, success: bool) -> BuildEvent {
        BuildEvent::ActionCompleted(ActionCompleted {
            action_type: action_type.to_string(),
            success,
            primary_output: Some(File::new(
                format!("out/{action_type}.xa"),
                format!("file:///out/{action_type}.xa"),
            )),
            label: "//pkg:lib".to_string(),
        })
    }

    #[test]
    fn test_empty_set_selects_successful_actions() {
        let mut selector = ExtraActionSelector::default();
        let artifact = selector.select(&action("compile", true)).unwrap();
        assert_eq!(artifact.id, "//pkg:lib");
        assert_eq!(artifact.file_names(), vec!["out/compile.xa"]);
        assert!(selector.select(&action("compile", false)).is_none());
    }

    #[test]
    fn test_type_set() {
        let mut selector = ExtraActionSelector::new(["compile"]);
        assert!(selector.select(&action("compile", true)).is_some());
        assert!(selector.select(&action("link", true)).is_none());
    }

    #[test]
    fn test_pattern() {
        let mut selector = ExtraActionSelector::from_pattern(Some("(java|cc)_compile")).unwrap();
        assert!(selector.select(&action("java_compile", true)).is_some());
        assert!(selector.select(&action("cc_compile", true)).is_some());
        assert!(selector.select(&action("go_compile", true)).is_none());
        assert!(selector.select(&action("java_compile_extra", true)).is_none());
    }

    #[test]
    fn test_null_and_empty_pattern_match_nothing() {
        for pattern in [None, Some("")] {
            let mut selector = ExtraActionSelector::from_pattern(pattern).unwrap();
            assert!(selector.select(&action("compile", true)).is_none());
        }
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(ExtraActionSelector::from_pattern(Some("[")).is_err());
    }

    #[test]
    fn test_missing_primary_output() {
        let mut selector = ExtraActionSelector::default();
        let event = BuildEvent::ActionCompleted(ActionCompleted {
            action_type: "compile".to_string(),
            success: true,
            primary_output: None,
            label: "//pkg:lib".to_string(),
        });
        assert!(selector.select(&event).is_none());
    }

    #[test]
    fn test_stateless() {
        let mut selector = ExtraActionSelector::default();
        let mut payload = StatePayload::default();
        assert!(!selector.serialize_into(&mut payload));
        assert!(payload.is_empty());
        assert_eq!(
            selector.deserialize_from(&payload),
            Err(SelectorStateError::Unimplemented)
        );
    }
}
