//! The selector capability and its uniform wrapper.

use crate::artifact::Artifact;
use crate::aspect::AspectArtifactSelector;
use crate::error::SelectorStateError;
use crate::event::BuildEvent;
use crate::extra_action::ExtraActionSelector;
use crate::state::StatePayload;

/// Finds extractor artifacts in an ordered sequence of build events.
///
/// `select` is called for every event in stream order so implementations
/// can update internal state. Selectors are not synchronized; `&mut self`
/// keeps a single caller in charge of the stream.
pub trait ArtifactSelector {
    /// Select at most one artifact from `event`.
    fn select(&mut self, event: &BuildEvent) -> Option<Artifact>;

    /// Encode per-stream state into `state`.
    ///
    /// Stateful selectors always write a non-empty payload of their own
    /// type and return true, even if nothing has been accumulated.
    /// Stateless selectors leave `state` alone and return false.
    fn serialize_into(&self, _state: &mut StatePayload) -> bool {
        false
    }

    /// Replace per-stream state from `state`.
    ///
    /// Stateless selectors return [`SelectorStateError::Unimplemented`].
    /// Stateful selectors return `InvalidArgument` when the payload is of
    /// their type but undecodable and `FailedPrecondition` when it is of a
    /// different type; the current state is untouched on error.
    fn deserialize_from(&mut self, _state: &StatePayload) -> Result<(), SelectorStateError> {
        Err(SelectorStateError::Unimplemented)
    }

    /// Whether this selector accumulates per-stream state.
    fn is_stateful(&self) -> bool {
        false
    }

    /// Fileset ids claimed by a target that have not arrived yet.
    fn pending_filesets(&self) -> Vec<String> {
        Vec::new()
    }

    /// Find and restore this selector's state from a list of payloads.
    ///
    /// Succeeds without change for stateless selectors. Stateful
    /// selectors return `NotFound` when no payload carries their type and
    /// `InvalidArgument` when the matching payload fails to decode.
    fn deserialize(&mut self, states: &[StatePayload]) -> Result<(), SelectorStateError> {
        if !self.is_stateful() {
            return Ok(());
        }
        let mut wanted = None;
        for state in states {
            match self.deserialize_from(state) {
                Ok(()) => return Ok(()),
                Err(SelectorStateError::FailedPrecondition { expected, .. }) => {
                    wanted = Some(expected);
                }
                Err(SelectorStateError::Unimplemented) => return Ok(()),
                Err(err) => return Err(err),
            }
        }
        let type_url = wanted.unwrap_or_else(|| {
            let mut probe = StatePayload::default();
            self.serialize_into(&mut probe);
            probe.type_url
        });
        Err(SelectorStateError::NotFound { type_url })
    }
}

/// Any of the supported selectors, stored by value.
///
/// Cloning produces an independent selector with a copy of the current
/// state.
#[derive(Debug, Clone)]
pub enum AnySelector {
    Aspect(AspectArtifactSelector),
    ExtraAction(ExtraActionSelector),
}

impl AnySelector {
    pub fn name(&self) -> &'static str {
        match self {
            AnySelector::Aspect(_) => "aspect",
            AnySelector::ExtraAction(_) => "extra_action",
        }
    }
}

impl From<AspectArtifactSelector> for AnySelector {
    fn from(selector: AspectArtifactSelector) -> Self {
        AnySelector::Aspect(selector)
    }
}

impl From<ExtraActionSelector> for AnySelector {
    fn from(selector: ExtraActionSelector) -> Self {
        AnySelector::ExtraAction(selector)
    }
}

impl ArtifactSelector for AnySelector {
    fn select(&mut self, event: &BuildEvent) -> Option<Artifact> {
        match self {
            AnySelector::Aspect(s) => s.select(event),
            AnySelector::ExtraAction(s) => s.select(event),
        }
    }

    fn serialize_into(&self, state: &mut StatePayload) -> bool {
        match self {
            AnySelector::Aspect(s) => s.serialize_into(state),
            AnySelector::ExtraAction(s) => s.serialize_into(state),
        }
    }

    fn deserialize_from(&mut self, state: &StatePayload) -> Result<(), SelectorStateError> {
        match self {
            AnySelector::Aspect(s) => s.deserialize_from(state),
            AnySelector::ExtraAction(s) => s.deserialize_from(state),
        }
    }

    fn is_stateful(&self) -> bool {
        match self {
            AnySelector::Aspect(s) => s.is_stateful(),
            AnySelector::ExtraAction(s) => s.is_stateful(),
        }
    }

    fn pending_filesets(&self) -> Vec<String> {
        match self {
            AnySelector::Aspect(s) => s.pending_filesets(),
            AnySelector::ExtraAction(s) => s.pending_filesets(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aspect::AspectSelectorOptions;
    use crate::state::ASPECT_SELECTOR_STATE_TYPE;

    fn aspect() -> AnySelector {
        AspectArtifactSelector::new(AspectSelectorOptions::default()).into()
    }

    #[test]
    fn test_stateless_deserialize_is_ok() {
        let mut selector: AnySelector = ExtraActionSelector::default().into();
        assert!(selector.deserialize(&[]).is_ok());
        assert!(selector
            .deserialize(&[StatePayload {
                type_url: "x".to_string(),
                value: vec![1],
            }])
            .is_ok());
    }

    #[test]
    fn test_stateful_deserialize_not_found() {
        let mut selector = aspect();
        let err = selector
            .deserialize(&[StatePayload {
                type_url: "other.State".to_string(),
                value: b"{}".to_vec(),
            }])
            .unwrap_err();
        assert_eq!(
            err,
            SelectorStateError::NotFound {
                type_url: ASPECT_SELECTOR_STATE_TYPE.to_string()
            }
        );

        let err = selector.deserialize(&[]).unwrap_err();
        assert!(matches!(err, SelectorStateError::NotFound { .. }));
    }

    #[test]
    fn test_stateful_deserialize_skips_foreign_payloads() {
        let mut source = aspect();
        let mut saved = StatePayload::default();
        assert!(source.serialize_into(&mut saved));

        let mut selector = aspect();
        let states = vec![
            StatePayload {
                type_url: "other.State".to_string(),
                value: b"garbage".to_vec(),
            },
            saved,
        ];
        assert!(selector.deserialize(&states).is_ok());
    }

    #[test]
    fn test_stateful_deserialize_invalid() {
        let mut selector = aspect();
        let err = selector
            .deserialize(&[StatePayload {
                type_url: ASPECT_SELECTOR_STATE_TYPE.to_string(),
                value: b"{".to_vec(),
            }])
            .unwrap_err();
        assert!(matches!(err, SelectorStateError::InvalidArgument(_)));
    }

    #[test]
    fn test_wrapper_forwards_statefulness() {
        assert!(aspect().is_stateful());
        let extra: AnySelector = ExtraActionSelector::default().into();
        assert!(!extra.is_stateful());
        assert_eq!(extra.name(), "extra_action");

        let mut payload = StatePayload::default();
        assert!(!extra.serialize_into(&mut payload));
        assert!(payload.is_empty());
    }
}
