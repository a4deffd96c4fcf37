use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use tinta_intake::ListenerConfig;

/// Station configuration
///
/// # Environment
///
/// Every field can be overridden from the environment (a `.env` file is
/// honored by the binary):
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | WORK_DIR | ./data | Working directory (session archive, logs) |
/// | PRINTER_LISTEN_ADDR | 127.0.0.1:9100 | Raw printer listener address |
/// | PRINTER_IDLE_TIMEOUT_MS | 2000 | Idle time that closes a job |
/// | MAX_JOB_BYTES | 4194304 | Max buffered bytes per job |
/// | JOB_HISTORY_LIMIT | 50 | Print jobs kept in history |
/// | JOB_QUEUE_CAPACITY | 32 | Intake work queue capacity |
/// | DEFAULT_TOLERANCE | 0.5 | Tolerance when the recipe carries none |
/// | PREVIEW_CHARS | 200 | Job preview length |
/// | LOG_LEVEL | info | Log level |
/// | LOG_DIR | (unset) | Optional log directory |
/// | ENVIRONMENT | development | Environment name |
///
/// Unparsable numeric values fall back to their defaults.
///
/// # Example
///
/// ```ignore
/// PRINTER_LISTEN_ADDR=0.0.0.0:9100 DEFAULT_TOLERANCE=1.0 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory, holds `sessions.jsonl`
    pub work_dir: String,
    pub printer_listen_addr: String,
    pub printer_idle_timeout_ms: u64,
    pub max_job_bytes: usize,
    pub job_history_limit: usize,
    pub job_queue_capacity: usize,
    /// Absolute tolerance (grams) used when a recipe does not print one
    pub default_tolerance: Decimal,
    pub preview_chars: usize,
    pub log_level: String,
    pub log_dir: Option<String>,
    /// development | staging | production
    pub environment: String,
}

impl Config {
    /// Load configuration from the environment
    ///
    /// Missing variables take their default values.
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into()),
            printer_listen_addr: std::env::var("PRINTER_LISTEN_ADDR")
                .unwrap_or_else(|_| "127.0.0.1:9100".into()),
            printer_idle_timeout_ms: env_parse("PRINTER_IDLE_TIMEOUT_MS", 2000),
            max_job_bytes: env_parse("MAX_JOB_BYTES", 4 * 1024 * 1024),
            job_history_limit: env_parse("JOB_HISTORY_LIMIT", 50),
            job_queue_capacity: env_parse("JOB_QUEUE_CAPACITY", 32),
            default_tolerance: env_parse("DEFAULT_TOLERANCE", Decimal::new(5, 1)),
            preview_chars: env_parse("PREVIEW_CHARS", 200),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("LOG_DIR").ok(),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
        }
    }

    /// Override the values tests care about
    ///
    /// The listener binds to an ephemeral port.
    pub fn with_overrides(work_dir: impl Into<String>, printer_listen_addr: impl Into<String>) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.printer_listen_addr = printer_listen_addr.into();
        config
    }

    /// Listener settings derived from this configuration
    pub fn listener_config(&self) -> ListenerConfig {
        ListenerConfig {
            bind_addr: self.printer_listen_addr.clone(),
            idle_timeout: Duration::from_millis(self.printer_idle_timeout_ms),
            max_job_bytes: self.max_job_bytes,
        }
    }

    /// JSON-lines archive of completed sessions
    pub fn archive_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("sessions.jsonl")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
