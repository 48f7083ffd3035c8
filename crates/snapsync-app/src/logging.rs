//! Logging setup, mirroring `coldvox-app::main::init_logging`: a stderr
//! layer plus a daily-rotated file layer under `logs/`, both governed by a
//! single `RUST_LOG`-driven `EnvFilter`. The file layer disables ANSI so
//! rotated logs stay greppable.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initializes the global subscriber. The returned guard must be held for
/// the lifetime of the process — dropping it early stops flushing the
/// non-blocking file writer.
pub fn init_logging(log_file_prefix: &str) -> anyhow::Result<WorkerGuard> {
    std::fs::create_dir_all("logs")?;
    let file_appender = RollingFileAppender::new(Rotation::DAILY, "logs", log_file_prefix);
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = EnvFilter::try_new(&log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = fmt::layer().with_writer(std::io::stderr);
    let file_layer = fmt::layer().with_writer(non_blocking_file).with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}
