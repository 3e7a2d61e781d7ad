//! Structured observability hooks for the driver lifecycle.
//!
//! Events are emitted at `info!` level except for masked teardown failures,
//! which are warnings. Filter with `RUST_LOG=analysis_driver=debug`.

use tracing::{info, warn};

/// Emit event: the driver pulled a compilation and is about to set it up.
pub fn emit_item_started(revision: &str) {
    info!(event = "item.started", revision = %revision);
}

/// Emit event: a compilation finished (successfully or not).
pub fn emit_item_finished(revision: &str, attempts: u32, duration_ms: u64, success: bool) {
    info!(
        event = "item.finished",
        revision = %revision,
        attempts = attempts,
        duration_ms = duration_ms,
        success = success,
    );
}

/// Emit event: teardown failed, but an earlier error is already the item's
/// result.
pub fn emit_teardown_masked(
    revision: &str,
    teardown_error: &dyn std::fmt::Display,
    prior_error: &dyn std::fmt::Display,
) {
    warn!(
        event = "item.teardown_masked",
        revision = %revision,
        error = %teardown_error,
        prior_error = %prior_error,
        "analysis teardown error after analysis error"
    );
}

/// Emit event: the driver loop ended.
pub fn emit_run_finished(items: u64, duration_ms: u64, success: bool) {
    info!(
        event = "run.finished",
        items = items,
        duration_ms = duration_ms,
        success = success,
    );
}
