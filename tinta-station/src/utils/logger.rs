//! Logging Infrastructure
//!
//! `RUST_LOG` wins over the configured level when set.

use std::path::Path;

use tracing_subscriber::EnvFilter;

/// Initialize the logger with the default level
pub fn init_logger() {
    init_logger_with_file(None, None);
}

/// Initialize the logger with optional daily-rolling file output
///
/// File output is only enabled when `log_dir` exists.
pub fn init_logger_with_file(log_level: Option<&str>, log_dir: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.unwrap_or("info")));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    if let Some(dir) = log_dir {
        let log_path = Path::new(dir);
        if log_path.is_dir() {
            let file_appender = tracing_appender::rolling::daily(log_path, "tinta-station");
            subscriber.with_ansi(false).with_writer(file_appender).init();
            return;
        }
    }

    subscriber.init();
}
