//! Log setup for the `vtag` binary.
//!
//! Logs go to stderr. Stdout carries the build/test output and the run
//! summary.

use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Install the global subscriber. `RUST_LOG` directives win over `level`;
/// `json` switches to one JSON object per line. Only the first call has an
/// effect.
pub fn init_tracing(json: bool, level: Level) {
    let _ = tracing_subscriber::registry()
        .with(filter(level))
        .with(stderr_layer(json))
        .try_init();
}

fn filter(level: Level) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy()
}

fn stderr_layer<S>(json: bool) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
    if json {
        layer.json().with_current_span(true).boxed()
    } else {
        layer.boxed()
    }
}
