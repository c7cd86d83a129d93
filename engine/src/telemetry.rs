//! Logging setup for the `rinterp` binary
//!
//! The configured `[core] log_level` applies to the engine and to the HTTP
//! request traces. Connection-level chatter from hyper and reqwest stays at
//! `warn` unless `RUST_LOG` asks for more.
//!
//! Debug builds print human-readable spans; release builds emit one JSON
//! object per event so the server's output can be shipped as-is.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter directives used when `RUST_LOG` is unset
pub fn default_filter(log_level: &str) -> String {
    format!(
        "{level},rinterp_engine={level},tower_http={level},hyper=warn,reqwest=warn",
        level = log_level
    )
}

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `log_level`. Only the first call has an
/// effect, so tests and the binary can both call it.
pub fn init_telemetry_with_level(log_level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(log_level)));

    #[cfg(debug_assertions)]
    let fmt_layer = fmt::layer().pretty().with_target(false);

    #[cfg(not(debug_assertions))]
    let fmt_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .ok();
}
