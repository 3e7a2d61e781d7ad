//! Build event model.
//!
//! Only the event kinds the selectors act on are modelled; everything else
//! in the stream decodes to [`BuildEvent::Other`].

use serde::{Deserialize, Serialize};

/// A single file reported by the build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    /// Workspace-relative output name (e.g. `out/foo.kzip`).
    pub name: String,

    /// Locator the file can be fetched from.
    #[serde(default)]
    pub uri: String,

    /// Target path when the output is a symlink.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symlink_target: Option<String>,
}

impl File {
    pub fn new(name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uri: uri.into(),
            symlink_target: None,
        }
    }
}

/// A named group of files, possibly referencing other groups by id.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NamedSetOfFiles {
    pub id: String,

    #[serde(default)]
    pub files: Vec<File>,

    /// Ids of child filesets whose files belong to this set.
    #[serde(default)]
    pub file_sets: Vec<String>,
}

/// Fileset ids produced for one output group of a completed target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputGroup {
    pub name: String,

    #[serde(default)]
    pub file_sets: Vec<String>,
}

/// A target (optionally with an aspect applied) finished building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetCompleted {
    pub label: String,

    /// Aspect name, empty for the target itself.
    #[serde(default)]
    pub aspect: String,

    pub success: bool,

    #[serde(default)]
    pub output_groups: Vec<OutputGroup>,
}

/// A single action finished executing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCompleted {
    pub action_type: String,

    pub success: bool,

    #[serde(default)]
    pub primary_output: Option<File>,

    #[serde(default)]
    pub label: String,
}

/// One event observed on the build event stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BuildEvent {
    NamedSetOfFiles(NamedSetOfFiles),
    TargetCompleted(TargetCompleted),
    ActionCompleted(ActionCompleted),
    /// Any event kind no selector cares about.
    #[serde(other)]
    Other,
}

impl BuildEvent {
    /// Short kind name, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            BuildEvent::NamedSetOfFiles(_) => "named_set_of_files",
            BuildEvent::TargetCompleted(_) => "target_completed",
            BuildEvent::ActionCompleted(_) => "action_completed",
            BuildEvent::Other => "other",
        }
    }
}
