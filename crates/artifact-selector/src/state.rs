//! Selector state wire format.
//!
//! Selector state travels as a [`StatePayload`]: a type url naming the
//! encoded message plus its bytes. A list of payloads from several
//! selectors can be stored together and handed back to each selector on
//! resume; each one picks out the payload carrying its own type.

use std::collections::{BTreeMap, BTreeSet};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::SelectorStateError;
use crate::event::NamedSetOfFiles;

/// Type url of [`AspectSelectorState`] payloads.
pub const ASPECT_SELECTOR_STATE_TYPE: &str = "artifact_selector.AspectSelectorState";

/// A typed, opaque blob of selector state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatePayload {
    pub type_url: String,
    #[serde(default)]
    pub value: Vec<u8>,
}

impl StatePayload {
    /// Encode `message` under `type_url`.
    pub fn pack<T: Serialize>(type_url: &str, message: &T) -> serde_json::Result<Self> {
        Ok(Self {
            type_url: type_url.to_string(),
            value: serde_json::to_vec(message)?,
        })
    }

    /// Decode the payload as `T` after checking its type url.
    pub fn unpack<T: DeserializeOwned>(&self, type_url: &str) -> Result<T, SelectorStateError> {
        if self.type_url != type_url {
            return Err(SelectorStateError::FailedPrecondition {
                expected: type_url.to_string(),
                actual: self.type_url.clone(),
            });
        }
        serde_json::from_slice(&self.value)
            .map_err(|e| SelectorStateError::InvalidArgument(e.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.type_url.is_empty() && self.value.is_empty()
    }
}

/// Per-stream state accumulated by the aspect selector.
///
/// Ordered collections keep the encoding deterministic: equal states
/// always produce equal payload bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AspectSelectorState {
    /// Fileset ids already resolved into an artifact (or skipped).
    #[serde(default)]
    pub disposed: BTreeSet<String>,

    /// Allowlist-filtered filesets seen but not yet claimed by a target.
    #[serde(default)]
    pub filesets: BTreeMap<String, NamedSetOfFiles>,

    /// Fileset id -> label of the target that claimed it before arrival.
    #[serde(default)]
    pub pending: BTreeMap<String, String>,
}

impl AspectSelectorState {
    pub fn is_empty(&self) -> bool {
        self.disposed.is_empty() && self.filesets.is_empty() && self.pending.is_empty()
    }

    /// Check the cross-field invariants of a decoded state.
    pub fn validate(&self) -> Result<(), SelectorStateError> {
        if let Some(id) = self.filesets.keys().find(|id| self.disposed.contains(*id)) {
            return Err(SelectorStateError::InvalidArgument(format!(
                "fileset {id} is both disposed and unclaimed"
            )));
        }
        if let Some(id) = self.pending.keys().find(|id| self.filesets.contains_key(*id)) {
            return Err(SelectorStateError::InvalidArgument(format!(
                "fileset {id} is both pending and unclaimed"
            )));
        }
        if let Some((id, set)) = self.filesets.iter().find(|(id, set)| set.id != **id) {
            return Err(SelectorStateError::InvalidArgument(format!(
                "fileset stored under {id} carries id {}",
                set.id
            )));
        }
        Ok(())
    }
}
