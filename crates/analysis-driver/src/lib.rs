//! Sequential compilation analysis driver
//!
//! Pulls compilations from a [`Queue`] one at a time and runs each through:
//! - an optional setup hook
//! - the [`CompilationAnalyzer`], forwarding every output to the sink
//! - retry and error-hook policy for failed analyses
//! - an optional teardown hook, run even when setup or analysis failed
//!
//! [`ArtifactQueue`] feeds the driver from a build event stream through
//! the selectors in `artifact_selector`.

pub mod analyzer;
pub mod artifact_queue;
pub mod cancel;
pub mod compilation;
pub mod driver;
pub mod error;
pub mod fakes;
pub mod hooks;
pub mod metrics;
pub mod obs;
pub mod queue;
pub mod telemetry;

pub use analyzer::{AnalysisFailure, AnalysisOutcome, CompilationAnalyzer, OutputSink};
pub use artifact_queue::{ArtifactQueue, EventStream, UnitLoader, UNLOADED_ARTIFACTS_TYPE};
pub use cancel::{Cancellation, CancellationSource};
pub use compilation::{AnalysisOutput, AnalysisRequest, Compilation, CompilationUnit};
pub use driver::{Driver, DriverConfig};
pub use error::{DriverError, Result};
pub use hooks::{AnalysisErrorHook, DriverIo, SetupHook, TeardownHook};
pub use metrics::{MetricsSnapshot, METRICS};
pub use queue::{CompilationHandler, Fetched, MemoryQueue, Queue};
pub use telemetry::init_tracing;
