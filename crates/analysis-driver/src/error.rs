//! Driver error taxonomy.

use thiserror::Error;

/// Errors surfaced by [`crate::Driver::run`] and the [`crate::Queue`]s
/// feeding it.
#[derive(Error, Debug)]
pub enum DriverError {
    /// The driver is missing a required collaborator. Reported before any
    /// queue I/O.
    #[error("driver misconfigured: {0}")]
    Configuration(String),

    /// The setup hook failed; the item was not analyzed.
    #[error("analysis setup error: {0:#}")]
    Setup(anyhow::Error),

    /// The analyzer failed and the error hook (if any) did not suppress it.
    #[error("analysis error: {0:#}")]
    Analysis(anyhow::Error),

    /// The teardown hook failed after an otherwise successful item.
    #[error("analysis teardown error: {0:#}")]
    Teardown(anyhow::Error),

    /// The queue could not produce the next compilation.
    #[error("queue error: {0:#}")]
    Queue(anyhow::Error),

    /// A collaborator observed cancellation.
    #[error("cancelled")]
    Cancelled,
}

impl DriverError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DriverError::Cancelled)
    }
}

/// Result type for driver operations.
pub type Result<T> = std::result::Result<T, DriverError>;
