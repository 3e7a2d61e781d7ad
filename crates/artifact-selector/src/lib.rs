//! Artifact selection from build event streams
//!
//! Consumes an ordered stream of build events and emits each completed
//! extractor artifact exactly once:
//! - `AspectArtifactSelector` pairs `NamedSetOfFiles` with `TargetCompleted`
//!   events produced by an extractor aspect, in either order
//! - `ExtraActionSelector` picks the primary output of matching actions
//! - Selector state can be serialized mid-stream and restored into a fresh
//!   selector to resume where the previous one stopped

mod allowlist;
mod artifact;
pub mod aspect;
pub mod config;
mod error;
pub mod event;
pub mod extra_action;
pub mod selector;
pub mod state;

pub use allowlist::Allowlist;
pub use artifact::Artifact;
pub use aspect::{AspectArtifactSelector, AspectSelectorOptions};
pub use config::{build_selectors, SelectorConfig};
pub use error::{ConfigError, SelectorStateError};
pub use event::{ActionCompleted, BuildEvent, File, NamedSetOfFiles, OutputGroup, TargetCompleted};
pub use extra_action::ExtraActionSelector;
pub use selector::{AnySelector, ArtifactSelector};
pub use state::{AspectSelectorState, StatePayload, ASPECT_SELECTOR_STATE_TYPE};
