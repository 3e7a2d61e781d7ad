//! In-memory fakes for driver collaborators (testing only)
//!
//! Provides `FakeAnalyzer`, `RecordingIo`, `FailingQueue` and
//! `ArtifactUnitLoader` that exercise the driver contracts without any
//! external services.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use artifact_selector::Artifact;
use async_trait::async_trait;
use serde_json::json;

use crate::analyzer::{AnalysisFailure, AnalysisOutcome, CompilationAnalyzer, OutputSink};
use crate::artifact_queue::UnitLoader;
use crate::cancel::Cancellation;
use crate::compilation::{AnalysisOutput, AnalysisRequest, Compilation, CompilationUnit};
use crate::error::{DriverError, Result};
use crate::hooks::{AnalysisErrorHook, SetupHook, TeardownHook};
use crate::queue::{CompilationHandler, Fetched, Queue};

// ---------------------------------------------------------------------------
// FakeAnalyzer
// ---------------------------------------------------------------------------

/// One scripted analyzer result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scripted {
    Success,
    Retry,
    Fatal(String),
    /// Wait for cancellation, then fail with the cancellation error.
    AwaitCancel,
}

/// Analyzer that replays a script of outcomes, one per call.
///
/// Every call first emits one output per entry in `outputs`, tagged with
/// the request revision. Once the script runs out every call succeeds.
#[derive(Debug, Default)]
pub struct FakeAnalyzer {
    script: Mutex<VecDeque<Scripted>>,
    outputs: Vec<String>,
    calls: AtomicUsize,
    requests: Mutex<Vec<AnalysisRequest>>,
}

impl FakeAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(script: impl IntoIterator<Item = Scripted>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn with_outputs(mut self, outputs: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.outputs = outputs.into_iter().map(Into::into).collect();
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<AnalysisRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompilationAnalyzer for FakeAnalyzer {
    async fn analyze(
        &self,
        cancel: &Cancellation,
        request: AnalysisRequest,
        sink: &dyn OutputSink,
    ) -> AnalysisOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let revision = request.revision.clone();
        self.requests.lock().unwrap().push(request);

        for output in &self.outputs {
            let value = format!("{revision}:{output}");
            if let Err(e) = sink.output(cancel, AnalysisOutput::new(value)).await {
                return AnalysisOutcome::FatalFailure(e);
            }
        }

        let step = self.script.lock().unwrap().pop_front();
        match step.unwrap_or(Scripted::Success) {
            Scripted::Success => AnalysisOutcome::Success,
            Scripted::Retry => AnalysisOutcome::retry(anyhow::anyhow!("transient failure")),
            Scripted::Fatal(msg) => AnalysisOutcome::fatal(anyhow::anyhow!(msg)),
            Scripted::AwaitCancel => {
                cancel.cancelled().await;
                AnalysisOutcome::fatal(DriverError::Cancelled)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// RecordingIo
// ---------------------------------------------------------------------------

/// What [`RecordingIo`] does with a fatal analysis error.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Keep the analyzer's verdict, retryable or fatal.
    #[default]
    Propagate,
    /// Swallow the error.
    Suppress,
    /// Replace the error with one carrying this message.
    Replace(String),
    /// Ask for a retry this many times in total, then propagate.
    Retry(usize),
}

/// Driver I/O that records every hook call in order.
///
/// Log entries look like `setup:<rev>`, `output:<value>`,
/// `error:<rev>:<message>` and `teardown:<rev>`.
#[derive(Debug, Default)]
pub struct RecordingIo {
    log: Mutex<Vec<String>>,
    outputs: Mutex<Vec<AnalysisOutput>>,
    fail_setup: bool,
    fail_teardown: bool,
    fail_output: bool,
    policy: ErrorPolicy,
    retries_left: Mutex<Option<usize>>,
}

impl RecordingIo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: ErrorPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn failing_setup(mut self) -> Self {
        self.fail_setup = true;
        self
    }

    pub fn failing_teardown(mut self) -> Self {
        self.fail_teardown = true;
        self
    }

    pub fn failing_output(mut self) -> Self {
        self.fail_output = true;
        self
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn outputs(&self) -> Vec<AnalysisOutput> {
        self.outputs.lock().unwrap().clone()
    }

    /// Number of log entries starting with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| entry.starts_with(prefix))
            .count()
    }

    fn record(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }
}

#[async_trait]
impl SetupHook for RecordingIo {
    async fn setup(&self, _cancel: &Cancellation, compilation: &Compilation) -> anyhow::Result<()> {
        self.record(format!("setup:{}", compilation.revision));
        if self.fail_setup {
            anyhow::bail!("setup failed for {}", compilation.revision);
        }
        Ok(())
    }
}

#[async_trait]
impl OutputSink for RecordingIo {
    async fn output(&self, _cancel: &Cancellation, output: AnalysisOutput) -> anyhow::Result<()> {
        self.record(format!("output:{}", String::from_utf8_lossy(&output.value)));
        if self.fail_output {
            anyhow::bail!("output rejected");
        }
        self.outputs.lock().unwrap().push(output);
        Ok(())
    }
}

#[async_trait]
impl TeardownHook for RecordingIo {
    async fn teardown(
        &self,
        _cancel: &Cancellation,
        compilation: &Compilation,
    ) -> anyhow::Result<()> {
        self.record(format!("teardown:{}", compilation.revision));
        if self.fail_teardown {
            anyhow::bail!("teardown failed for {}", compilation.revision);
        }
        Ok(())
    }
}

#[async_trait]
impl AnalysisErrorHook for RecordingIo {
    async fn on_analysis_error(
        &self,
        _cancel: &Cancellation,
        compilation: &Compilation,
        failure: AnalysisFailure,
    ) -> AnalysisOutcome {
        self.record(format!("error:{}:{}", compilation.revision, failure.error()));
        match &self.policy {
            ErrorPolicy::Propagate => failure.into(),
            ErrorPolicy::Suppress => AnalysisOutcome::Success,
            ErrorPolicy::Replace(msg) => AnalysisOutcome::fatal(anyhow::anyhow!(msg.clone())),
            ErrorPolicy::Retry(times) => {
                let mut left = self.retries_left.lock().unwrap();
                let remaining = left.get_or_insert(*times);
                if *remaining == 0 {
                    failure.into()
                } else {
                    *remaining -= 1;
                    AnalysisOutcome::RetryableFailure(failure.into_error())
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// FailingQueue
// ---------------------------------------------------------------------------

/// Queue that fails every fetch, counting attempts.
#[derive(Debug, Default)]
pub struct FailingQueue {
    pub fetches: usize,
}

#[async_trait]
impl Queue for FailingQueue {
    async fn next(
        &mut self,
        _cancel: &Cancellation,
        _handler: &dyn CompilationHandler,
    ) -> Result<Fetched> {
        self.fetches += 1;
        Err(DriverError::Queue(anyhow::anyhow!("queue unavailable")))
    }
}

// ---------------------------------------------------------------------------
// ArtifactUnitLoader
// ---------------------------------------------------------------------------

/// Loader producing one compilation per artifact file, without reading it.
///
/// The unit records the artifact id and file name; the revision is the
/// file's uri.
#[derive(Debug, Default)]
pub struct ArtifactUnitLoader {
    loaded: Mutex<Vec<String>>,
    failures_left: AtomicUsize,
}

impl ArtifactUnitLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the first `times` loads.
    pub fn failing_times(times: usize) -> Self {
        Self {
            failures_left: AtomicUsize::new(times),
            ..Self::default()
        }
    }

    /// Ids of successfully loaded artifacts, in load order.
    pub fn loaded(&self) -> Vec<String> {
        self.loaded.lock().unwrap().clone()
    }
}

#[async_trait]
impl UnitLoader for ArtifactUnitLoader {
    async fn load(
        &self,
        _cancel: &Cancellation,
        artifact: &Artifact,
    ) -> anyhow::Result<Vec<Compilation>> {
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            anyhow::bail!("fetch of {} failed", artifact.id);
        }

        self.loaded.lock().unwrap().push(artifact.id.clone());
        Ok(artifact
            .files
            .iter()
            .map(|file| {
                Compilation::new(
                    CompilationUnit::new(json!({ "target": artifact.id, "file": file.name })),
                    file.uri.clone(),
                )
            })
            .collect())
    }
}
