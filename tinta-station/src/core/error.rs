use thiserror::Error;
use tinta_intake::IntakeError;

/// Startup and runtime failures of the station service
///
/// Everything here is fatal: per-connection and per-job problems are
/// handled where they happen and never reach this type.
#[derive(Error, Debug)]
pub enum StationError {
    #[error("Print intake failed: {0}")]
    Intake(#[from] IntakeError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StationError>;
