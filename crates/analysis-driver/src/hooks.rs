//! Per-item hooks invoked by the [`crate::Driver`].
//!
//! Hooks are called once per item and never concurrently with
//! themselves, but must tolerate being called again for the next item.

use async_trait::async_trait;

use crate::analyzer::{AnalysisFailure, AnalysisOutcome, OutputSink};
use crate::cancel::Cancellation;
use crate::compilation::Compilation;

/// Called after a compilation is pulled from the queue and before it is
/// sent to the analyzer.
#[async_trait]
pub trait SetupHook: Send + Sync {
    async fn setup(&self, cancel: &Cancellation, compilation: &Compilation) -> anyhow::Result<()>;
}

/// Called once analysis of a compilation is over and no further outputs
/// will be forwarded for it.
#[async_trait]
pub trait TeardownHook: Send + Sync {
    async fn teardown(
        &self,
        cancel: &Cancellation,
        compilation: &Compilation,
    ) -> anyhow::Result<()>;
}

/// Called for every failed analysis attempt, retryable or fatal, before
/// teardown.
///
/// The returned outcome replaces the failure: `Success` suppresses it,
/// `FatalFailure` ends the item with that error, and `RetryableFailure`
/// analyzes the compilation again. Returning `failure.into()` keeps the
/// analyzer's own verdict.
#[async_trait]
pub trait AnalysisErrorHook: Send + Sync {
    async fn on_analysis_error(
        &self,
        cancel: &Cancellation,
        compilation: &Compilation,
        failure: AnalysisFailure,
    ) -> AnalysisOutcome;
}

/// The complete I/O surface of a driver, implemented by one value.
///
/// See [`crate::Driver::apply`].
pub trait DriverIo: SetupHook + OutputSink + TeardownHook + AnalysisErrorHook {}

impl<T> DriverIo for T where T: SetupHook + OutputSink + TeardownHook + AnalysisErrorHook {}
