//! Tracing subscriber setup.
//!
//! Lambda runs get single-line JSON with the per-event span (`event_name`,
//! `encoded_key`) attached to every line, so one object's history can be
//! filtered out of CloudWatch. Local replay runs get the plain formatter on
//! stderr. Both honour `RUST_LOG`; without it the AWS SDK and HTTP stack are
//! held at `warn` while bucket-sync logs at `info`.
//!
//! Only the first initialisation in a process installs a subscriber.

use std::sync::Once;

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str =
    "info,aws_config=warn,aws_smithy_runtime=warn,hyper=warn,reqwest=warn";

static INIT: Once = Once::new();

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn install<L>(layer: L)
where
    L: Layer<tracing_subscriber::Registry> + Send + Sync + 'static,
{
    INIT.call_once(|| {
        let _ = tracing_subscriber::registry()
            .with(layer.with_filter(env_filter()))
            .try_init();
    });
}

/// JSON logs for the Lambda runtime.
pub fn init_logging() {
    install(
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true),
    );
}

/// Human-readable logs for replay. Written to stderr so stdout stays
/// reserved for the invocation result.
pub fn init_cli_logging() {
    install(
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_span_events(FmtSpan::NONE),
    );
}
