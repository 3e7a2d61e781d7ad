//! Error types for artifact-selector

use thiserror::Error;

/// Errors produced while restoring per-stream selector state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectorStateError {
    /// A stateful selector found no payload of its type.
    #[error("no selector state of type {type_url} found")]
    NotFound { type_url: String },

    /// The payload had the right type but could not be decoded.
    #[error("invalid selector state: {0}")]
    InvalidArgument(String),

    /// The payload belongs to a different selector type.
    #[error("selector state type mismatch: expected {expected}, got {actual}")]
    FailedPrecondition { expected: String, actual: String },

    /// The selector keeps no per-stream state.
    #[error("stateless selector")]
    Unimplemented,
}

/// Errors produced while building selectors from configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An allowlist pattern failed to compile.
    #[error("invalid allowlist pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The configuration document could not be parsed.
    #[error("invalid selector config: {0}")]
    Parse(#[from] serde_json::Error),
}
