//! Logging setup for test binaries
//!
//! Assertions report progress through `tracing`; nothing is printed unless a
//! subscriber is installed. Suites call [`init_logging`] at the start of each
//! test. Only the first call installs anything, so tests can run in any order.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info,kube_converge=debug,kube=info,tower=warn,hyper=warn";

/// Output format for log lines
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines, captured per test by the test harness
    #[default]
    Pretty,
    /// JSON lines, for CI log collectors
    Json,
}

impl LogFormat {
    /// Read the format from `KUBE_CONVERGE_LOG_FORMAT` ("json" or anything else)
    pub fn from_env() -> Self {
        match std::env::var("KUBE_CONVERGE_LOG_FORMAT") {
            Ok(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Install a global subscriber; returns false if one was already installed
pub fn init_logging(format: LogFormat) -> bool {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match format {
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_test_writer()
                    .with_target(true),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_test_writer(),
            )
            .try_init(),
    };
    result.is_ok()
}
