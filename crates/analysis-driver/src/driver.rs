//! Sequential analysis driver.
//!
//! For every compilation pulled from a [`Queue`]:
//!
//! ```text
//!   setup? ──► analyze ──► Success ──────────────────────────┐
//!                ▲   │                                        │
//!                │   └──► failure ──► error hook? ──► Success ├──► teardown? ──► next item
//!                │                          │    └──► Fatal ──┘
//!                └──────── Retryable ◄──────┘
//! ```
//!
//! Items are processed strictly one at a time; the next item is not
//! requested until teardown of the current one has finished.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::analyzer::{AnalysisOutcome, CompilationAnalyzer, OutputSink};
use crate::cancel::Cancellation;
use crate::compilation::{AnalysisOutput, AnalysisRequest, Compilation};
use crate::error::{DriverError, Result};
use crate::hooks::{AnalysisErrorHook, DriverIo, SetupHook, TeardownHook};
use crate::metrics::METRICS;
use crate::obs;
use crate::queue::{CompilationHandler, Fetched, Queue};

/// Static driver configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Address of the file data service passed along in every request.
    #[serde(default)]
    pub file_data_service: String,
}

/// Sends compilations sequentially from a queue to an analyzer.
#[derive(Clone, Default)]
pub struct Driver {
    analyzer: Option<Arc<dyn CompilationAnalyzer>>,
    file_data_service: String,
    setup: Option<Arc<dyn SetupHook>>,
    output: Option<Arc<dyn OutputSink>>,
    teardown: Option<Arc<dyn TeardownHook>>,
    analysis_error: Option<Arc<dyn AnalysisErrorHook>>,
}

impl Driver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &DriverConfig) -> Self {
        Self::new().with_file_data_service(config.file_data_service.clone())
    }

    pub fn with_analyzer(mut self, analyzer: Arc<dyn CompilationAnalyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    pub fn with_file_data_service(mut self, address: impl Into<String>) -> Self {
        self.file_data_service = address.into();
        self
    }

    pub fn with_setup(mut self, hook: Arc<dyn SetupHook>) -> Self {
        self.setup = Some(hook);
        self
    }

    pub fn with_output(mut self, sink: Arc<dyn OutputSink>) -> Self {
        self.output = Some(sink);
        self
    }

    pub fn with_teardown(mut self, hook: Arc<dyn TeardownHook>) -> Self {
        self.teardown = Some(hook);
        self
    }

    pub fn with_analysis_error(mut self, hook: Arc<dyn AnalysisErrorHook>) -> Self {
        self.analysis_error = Some(hook);
        self
    }

    /// Route setup, output, teardown and analysis errors through `io`,
    /// replacing any hooks set individually.
    pub fn apply<T: DriverIo + 'static>(mut self, io: Arc<T>) -> Self {
        self.setup = Some(io.clone());
        self.output = Some(io.clone());
        self.teardown = Some(io.clone());
        self.analysis_error = Some(io);
        self
    }

    pub fn file_data_service(&self) -> &str {
        &self.file_data_service
    }

    fn required(&self) -> Result<(&dyn CompilationAnalyzer, &dyn OutputSink)> {
        let analyzer = self
            .analyzer
            .as_deref()
            .ok_or_else(|| DriverError::Configuration("missing analyzer".to_string()))?;
        let output = self
            .output
            .as_deref()
            .ok_or_else(|| DriverError::Configuration("missing output sink".to_string()))?;
        Ok((analyzer, output))
    }

    /// Send each compilation received from `queue` to the analyzer,
    /// passing every output to the output sink in turn.
    ///
    /// Fails before touching the queue if the analyzer or output sink is
    /// unset. Returns `Ok(())` once the queue reports end of stream and
    /// the first error otherwise.
    #[instrument(skip_all, fields(run_id = %Uuid::new_v4()))]
    pub async fn run<Q>(&self, cancel: &Cancellation, queue: &mut Q) -> Result<()>
    where
        Q: Queue + ?Sized,
    {
        self.required()?;

        let start = Instant::now();
        let mut items = 0u64;
        info!("starting analysis driver");

        let result = loop {
            match queue.next(cancel, self).await {
                Ok(Fetched::Item) => items += 1,
                Ok(Fetched::EndOfStream) => break Ok(()),
                Err(e) => break Err(e),
            }
        };

        obs::emit_run_finished(items, elapsed_ms(start), result.is_ok());
        METRICS.flush();
        result
    }

    async fn analyze_with_retries(
        &self,
        cancel: &Cancellation,
        compilation: &Compilation,
        attempts: &mut u32,
    ) -> Result<()> {
        let (analyzer, output) = self.required()?;
        let sink = ForwardingSink { inner: output };

        loop {
            *attempts += 1;
            METRICS.inc_analyses();

            let request = AnalysisRequest::new(compilation, &self.file_data_service);
            let failure = analyzer.analyze(cancel, request, &sink).await.into_failure();
            let outcome = match (failure, &self.analysis_error) {
                (None, _) => AnalysisOutcome::Success,
                (Some(failure), Some(hook)) => {
                    hook.on_analysis_error(cancel, compilation, failure).await
                }
                (Some(failure), None) => failure.into(),
            };

            match outcome {
                AnalysisOutcome::Success => return Ok(()),
                AnalysisOutcome::RetryableFailure(cause) => {
                    debug!(
                        revision = %compilation.revision,
                        attempt = *attempts,
                        cause = %cause,
                        "retrying analysis"
                    );
                    METRICS.inc_retries();
                }
                AnalysisOutcome::FatalFailure(err) => return Err(DriverError::Analysis(err)),
            }
        }
    }
}

#[async_trait]
impl CompilationHandler for Driver {
    async fn handle(&self, cancel: &Cancellation, compilation: Compilation) -> Result<()> {
        let start = Instant::now();
        let mut attempts = 0u32;
        obs::emit_item_started(&compilation.revision);
        METRICS.inc_items();

        let setup = match &self.setup {
            Some(hook) => hook
                .setup(cancel, &compilation)
                .await
                .map_err(DriverError::Setup),
            None => Ok(()),
        };

        let mut result = match setup {
            Ok(()) => {
                self.analyze_with_retries(cancel, &compilation, &mut attempts)
                    .await
            }
            Err(e) => Err(e),
        };

        if let Some(hook) = &self.teardown {
            if let Err(teardown_err) = hook.teardown(cancel, &compilation).await {
                result = match result {
                    Ok(()) => Err(DriverError::Teardown(teardown_err)),
                    Err(prior) => {
                        obs::emit_teardown_masked(&compilation.revision, &teardown_err, &prior);
                        Err(prior)
                    }
                };
            }
        }

        obs::emit_item_finished(
            &compilation.revision,
            attempts,
            elapsed_ms(start),
            result.is_ok(),
        );
        result
    }
}

/// Milliseconds since `start`, saturating at `u64::MAX`.
fn elapsed_ms(start: Instant) -> u64 {
    millis(start.elapsed())
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Passes outputs to the configured sink, counting them on the way.
struct ForwardingSink<'a> {
    inner: &'a dyn OutputSink,
}

#[async_trait]
impl OutputSink for ForwardingSink<'_> {
    async fn output(&self, cancel: &Cancellation, output: AnalysisOutput) -> anyhow::Result<()> {
        METRICS.inc_outputs();
        self.inner.output(cancel, output).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let config: DriverConfig =
            serde_json::from_str(r#"{ "file_data_service": "localhost:9000" }"#).unwrap();
        let driver = Driver::from_config(&config);
        assert_eq!(driver.file_data_service(), "localhost:9000");
    }

    #[test]
    fn test_millis_saturates() {
        assert_eq!(millis(Duration::from_millis(1500)), 1500);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }

    #[test]
    fn test_required_reports_missing_parts() {
        let err = Driver::new().required().err().unwrap();
        assert!(err.to_string().contains("missing analyzer"));
    }
}
