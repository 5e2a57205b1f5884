//! Tracing subscriber setup.
//!
//! Environment variables:
//!   SHOTLENS_LOG_FORMAT - "json" or "text" (default: "text")
//!   RUST_LOG            - standard env filter (default: "shotlens=info")

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const DEFAULT_FILTER: &str = "shotlens=info,shotlens_analysis=info,shotlens_jobs=info,shotlens_inference=info";

/// Installs the global subscriber. Logs go to stderr, or to a daily-rotated
/// file when `log_file` is given; keep the guard alive until exit.
pub fn init(log_file: Option<&Path>) -> Option<WorkerGuard> {
    let json = std::env::var("SHOTLENS_LOG_FORMAT").is_ok_and(|v| v == "json");
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_FILTER.into());
    let registry = tracing_subscriber::registry().with(env_filter);

    match log_file {
        Some(path) => {
            let dir = path.parent().unwrap_or(Path::new("."));
            let file_name = path
                .file_name()
                .and_then(|f| f.to_str())
                .unwrap_or("shotlens.log");
            let file_appender = tracing_appender::rolling::daily(dir, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            if json {
                registry
                    .with(tracing_subscriber::fmt::layer().json().with_writer(non_blocking))
                    .init();
            } else {
                registry
                    .with(
                        tracing_subscriber::fmt::layer()
                            .with_writer(non_blocking)
                            .with_ansi(false),
                    )
                    .init();
            }
            Some(guard)
        }
        None => {
            if json {
                registry
                    .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                    .init();
            } else {
                registry
                    .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                    .init();
            }
            None
        }
    }
}
