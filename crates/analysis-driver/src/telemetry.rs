//! Tracing setup for programs embedding the driver.
//!
//! `RUST_LOG` wins when set. Otherwise the driver and selector crates log
//! at the requested level and everything else at `warn`.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber. Only the first call in a process takes
/// effect.
///
/// With `json` set, events are written as newline-delimited JSON that
/// includes the current span (and with it the run id).
pub fn init_tracing(json: bool, level: Level) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    let (text, structured) = if json {
        (None, Some(fmt::layer().json().with_current_span(true)))
    } else {
        (Some(fmt::layer().compact()), None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(text)
        .with(structured)
        .try_init()
        .ok();
}

fn default_directives(level: Level) -> String {
    let level = level.as_str().to_ascii_lowercase();
    format!("warn,analysis_driver={level},artifact_selector={level}")
}
