use std::io;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Install console and daily rolling file logging
///
/// Respects `RUST_LOG`, falling back to `default_level`. The returned guard
/// flushes the file writer and must be held until exit.
pub fn init_with_stdout(app_name: &str, log_dir: &str, default_level: Level) -> WorkerGuard {
    let _ = std::fs::create_dir_all(log_dir);

    let file_appender = tracing_appender::rolling::daily(log_dir, format!("{app_name}.log"));
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::builder().with_default_directive(default_level.into()).from_env_lossy();

    let file_layer = fmt::layer().with_writer(non_blocking).with_target(true).with_thread_names(true).with_ansi(false).compact();

    // Console output is for the person watching the game, keep it short
    let stdout_layer = fmt::layer().with_writer(io::stdout).with_target(false).with_ansi(true).compact();

    tracing_subscriber::registry().with(env_filter).with(file_layer).with(stdout_layer).init();

    guard
}
