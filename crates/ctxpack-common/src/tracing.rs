//! Tracing bootstrap shared by binaries and long-running tests

use std::path::Path;
use std::sync::Once;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

static TRACING: Once = Once::new();

/// Initialize the global tracing subscriber
///
/// Respects `RUST_LOG` via `EnvFilter`, defaulting to `info` for the given
/// service. Safe to call multiple times - only the first call installs a
/// subscriber.
pub fn init_tracing(service_name: &str) {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("info,{service_name}=debug")));

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    });
}

/// Initialize tracing with an additional daily-rotated file layer
///
/// Log files land under `<logs_dir>/<service_name>.<date>`. Returns the
/// appender guard; dropping it flushes and stops the background writer, so
/// callers keep it alive for the process lifetime.
pub fn init_tracing_with_file(
    service_name: &str,
    logs_dir: &Path,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let mut guard_slot = None;
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("info,{service_name}=debug")));

        let appender = tracing_appender::rolling::daily(logs_dir, service_name);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        guard_slot = Some(guard);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .with(fmt::layer().json().with_writer(writer))
            .init();
    });
    guard_slot
}
