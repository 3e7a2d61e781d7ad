//! Analyzer and output sink traits.

use async_trait::async_trait;

use crate::cancel::Cancellation;
use crate::compilation::{AnalysisOutput, AnalysisRequest};

/// Result of one analysis attempt.
#[derive(Debug)]
pub enum AnalysisOutcome {
    /// The analysis completed.
    Success,
    /// Analyze the same compilation again immediately.
    RetryableFailure(anyhow::Error),
    /// The analysis failed.
    FatalFailure(anyhow::Error),
}

impl AnalysisOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AnalysisOutcome::Success)
    }

    pub fn retry(cause: impl Into<anyhow::Error>) -> Self {
        AnalysisOutcome::RetryableFailure(cause.into())
    }

    pub fn fatal(cause: impl Into<anyhow::Error>) -> Self {
        AnalysisOutcome::FatalFailure(cause.into())
    }

    /// The failure carried by this outcome, if any.
    pub fn into_failure(self) -> Option<AnalysisFailure> {
        match self {
            AnalysisOutcome::Success => None,
            AnalysisOutcome::RetryableFailure(e) => Some(AnalysisFailure::Retryable(e)),
            AnalysisOutcome::FatalFailure(e) => Some(AnalysisFailure::Fatal(e)),
        }
    }
}

/// A failed analysis attempt, as handed to the error hook.
#[derive(Debug)]
pub enum AnalysisFailure {
    /// The analyzer asked to be run again.
    Retryable(anyhow::Error),
    Fatal(anyhow::Error),
}

impl AnalysisFailure {
    pub fn is_retryable(&self) -> bool {
        matches!(self, AnalysisFailure::Retryable(_))
    }

    pub fn error(&self) -> &anyhow::Error {
        match self {
            AnalysisFailure::Retryable(e) | AnalysisFailure::Fatal(e) => e,
        }
    }

    pub fn into_error(self) -> anyhow::Error {
        match self {
            AnalysisFailure::Retryable(e) | AnalysisFailure::Fatal(e) => e,
        }
    }
}

impl From<AnalysisFailure> for AnalysisOutcome {
    fn from(failure: AnalysisFailure) -> Self {
        match failure {
            AnalysisFailure::Retryable(e) => AnalysisOutcome::RetryableFailure(e),
            AnalysisFailure::Fatal(e) => AnalysisOutcome::FatalFailure(e),
        }
    }
}

impl From<anyhow::Result<()>> for AnalysisOutcome {
    fn from(result: anyhow::Result<()>) -> Self {
        match result {
            Ok(()) => AnalysisOutcome::Success,
            Err(e) => AnalysisOutcome::FatalFailure(e),
        }
    }
}

/// Receives analysis outputs in emission order.
#[async_trait]
pub trait OutputSink: Send + Sync {
    async fn output(&self, cancel: &Cancellation, output: AnalysisOutput) -> anyhow::Result<()>;
}

/// Analyzes a single compilation, streaming outputs to `sink` before
/// returning.
#[async_trait]
pub trait CompilationAnalyzer: Send + Sync {
    async fn analyze(
        &self,
        cancel: &Cancellation,
        request: AnalysisRequest,
        sink: &dyn OutputSink,
    ) -> AnalysisOutcome;
}
