//! Aspect-produced artifact selection.
//!
//! Extractor aspects report their outputs in two halves: a
//! `NamedSetOfFiles` event carrying the files, and a `TargetCompleted`
//! event naming the filesets in each output group. Either half may arrive
//! first, so the selector keeps the unmatched half around until the other
//! one shows up.
//!
//! ```text
//!   fileset first:  NamedSetOfFiles ──► filesets[id]
//!                   TargetCompleted ──► take filesets[id] ──► Artifact, disposed += id
//!
//!   target first:   TargetCompleted ──► pending[id] = label
//!                   NamedSetOfFiles ──► take pending[id]  ──► Artifact, disposed += id
//! ```

use tracing::{debug, trace, warn};

use crate::allowlist::Allowlist;
use crate::artifact::Artifact;
use crate::error::SelectorStateError;
use crate::event::{BuildEvent, File, NamedSetOfFiles, TargetCompleted};
use crate::selector::ArtifactSelector;
use crate::state::{AspectSelectorState, StatePayload, ASPECT_SELECTOR_STATE_TYPE};

/// Options for [`AspectArtifactSelector`].
#[derive(Debug, Clone)]
pub struct AspectSelectorOptions {
    /// Filters file names from `NamedSetOfFiles` events. Matches nothing by default.
    pub file_name_allowlist: Allowlist,

    /// Filters output group names from `TargetCompleted` events. Matches nothing by default.
    pub output_group_allowlist: Allowlist,

    /// Filters aspect names from `TargetCompleted` events. Matches everything by default.
    pub target_aspect_allowlist: Allowlist,
}

impl Default for AspectSelectorOptions {
    fn default() -> Self {
        Self {
            file_name_allowlist: Allowlist::nothing(),
            output_group_allowlist: Allowlist::nothing(),
            target_aspect_allowlist: Allowlist::any(),
        }
    }
}

/// Tracks `NamedSetOfFiles` and `TargetCompleted` events to select the
/// artifacts produced by extractor aspects.
///
/// When one `TargetCompleted` resolves several filesets, their files are
/// merged into a single artifact for that target: output groups in event
/// order, fileset ids in group order, each fileset's own files before its
/// children.
#[derive(Debug, Clone, Default)]
pub struct AspectArtifactSelector {
    options: AspectSelectorOptions,
    state: AspectSelectorState,
}

impl AspectArtifactSelector {
    pub fn new(options: AspectSelectorOptions) -> Self {
        Self {
            options,
            state: AspectSelectorState::default(),
        }
    }

    pub fn options(&self) -> &AspectSelectorOptions {
        &self.options
    }

    /// The accumulated per-stream state.
    pub fn state(&self) -> &AspectSelectorState {
        &self.state
    }

    fn select_fileset(&mut self, fileset: &NamedSetOfFiles) -> Option<Artifact> {
        if self.state.disposed.contains(&fileset.id) {
            trace!(fileset = %fileset.id, "ignoring already disposed fileset");
            return None;
        }

        let filtered = NamedSetOfFiles {
            id: fileset.id.clone(),
            files: fileset
                .files
                .iter()
                .filter(|f| self.options.file_name_allowlist.matches(&f.name))
                .cloned()
                .collect(),
            file_sets: fileset.file_sets.clone(),
        };
        self.state.filesets.insert(fileset.id.clone(), filtered);

        let label = self.state.pending.remove(&fileset.id)?;
        debug!(fileset = %fileset.id, label = %label, "resolving pending fileset");
        let mut files = Vec::new();
        self.read_files_into([fileset.id.clone()], &label, &mut files);
        artifact(label, files)
    }

    fn select_target(&mut self, target: &TargetCompleted) -> Option<Artifact> {
        if !target.success {
            trace!(label = %target.label, "ignoring failed target");
            return None;
        }
        if !self.options.target_aspect_allowlist.matches(&target.aspect) {
            trace!(label = %target.label, aspect = %target.aspect, "aspect not allowed");
            return None;
        }

        let ids: Vec<String> = target
            .output_groups
            .iter()
            .filter(|group| self.options.output_group_allowlist.matches(&group.name))
            .flat_map(|group| group.file_sets.iter().cloned())
            .collect();
        if ids.is_empty() {
            trace!(label = %target.label, "no matching output groups");
            return None;
        }

        let mut files = Vec::new();
        self.read_files_into(ids, &target.label, &mut files);
        artifact(target.label.clone(), files)
    }

    /// Resolve `roots` and every fileset they transitively reference.
    ///
    /// Known filesets are moved to `disposed` as they are visited, which
    /// also terminates reference cycles. Unknown ids are claimed for
    /// `label` in `pending`; the first claim wins.
    fn read_files_into<I>(&mut self, roots: I, label: &str, files: &mut Vec<File>)
    where
        I: IntoIterator<Item = String>,
        I::IntoIter: DoubleEndedIterator,
    {
        let mut worklist: Vec<String> = roots.into_iter().rev().collect();
        while let Some(id) = worklist.pop() {
            if self.state.disposed.contains(&id) {
                continue;
            }
            match self.state.filesets.remove(&id) {
                Some(set) => {
                    files.extend(set.files);
                    worklist.extend(set.file_sets.into_iter().rev());
                    self.state.disposed.insert(id);
                }
                None => {
                    trace!(fileset = %id, label = %label, "claiming unseen fileset");
                    self.state.pending.entry(id).or_insert_with(|| label.to_string());
                }
            }
        }
    }
}

fn artifact(id: String, files: Vec<File>) -> Option<Artifact> {
    if files.is_empty() {
        return None;
    }
    debug!(label = %id, files = files.len(), "selected aspect artifact");
    Some(Artifact { id, files })
}

impl ArtifactSelector for AspectArtifactSelector {
    fn select(&mut self, event: &BuildEvent) -> Option<Artifact> {
        match event {
            BuildEvent::NamedSetOfFiles(fileset) => self.select_fileset(fileset),
            BuildEvent::TargetCompleted(target) => self.select_target(target),
            BuildEvent::ActionCompleted(_) | BuildEvent::Other => None,
        }
    }

    fn serialize_into(&self, state: &mut StatePayload) -> bool {
        match StatePayload::pack(ASPECT_SELECTOR_STATE_TYPE, &self.state) {
            Ok(payload) => {
                *state = payload;
                true
            }
            Err(e) => {
                warn!(error = %e, "failed to encode aspect selector state");
                false
            }
        }
    }

    fn deserialize_from(&mut self, state: &StatePayload) -> Result<(), SelectorStateError> {
        let restored: AspectSelectorState = state.unpack(ASPECT_SELECTOR_STATE_TYPE)?;
        restored.validate()?;
        debug!(
            disposed = restored.disposed.len(),
            filesets = restored.filesets.len(),
            pending = restored.pending.len(),
            "restored aspect selector state"
        );
        self.state = restored;
        Ok(())
    }

    fn is_stateful(&self) -> bool {
        true
    }

    fn pending_filesets(&self) -> Vec<String> {
        self.state.pending.keys().cloned().collect()
    }
}
