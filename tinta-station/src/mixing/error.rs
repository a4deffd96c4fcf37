use rust_decimal::Decimal;
use shared::mix::{CommandError, CommandErrorCode};
use shared::models::SessionState;
use thiserror::Error;

/// Engine command rejections
///
/// A rejected command never mutates the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MixError {
    #[error("No recipe loaded")]
    NoRecipe,

    #[error("Recipe {0} has no ingredients")]
    EmptyRecipe(String),

    #[error("{command} is not allowed in state {state}")]
    InvalidState {
        command: &'static str,
        state: SessionState,
    },

    #[error("Recipe mismatch: loaded {loaded}, requested {requested}")]
    RecipeMismatch { loaded: String, requested: String },

    #[error("Session in progress for recipe {0}")]
    SessionInProgress(String),

    #[error("No weight recorded for ingredient {0}")]
    NoReading(String),

    #[error("Invalid weight: {0}")]
    InvalidWeight(Decimal),
}

impl MixError {
    pub fn code(&self) -> CommandErrorCode {
        match self {
            MixError::NoRecipe => CommandErrorCode::NoRecipe,
            MixError::EmptyRecipe(_) => CommandErrorCode::EmptyRecipe,
            MixError::InvalidState { .. } => CommandErrorCode::InvalidState,
            MixError::RecipeMismatch { .. } => CommandErrorCode::RecipeMismatch,
            MixError::SessionInProgress(_) => CommandErrorCode::SessionInProgress,
            MixError::NoReading(_) => CommandErrorCode::NoReading,
            MixError::InvalidWeight(_) => CommandErrorCode::InvalidWeight,
        }
    }
}

impl From<MixError> for CommandError {
    fn from(err: MixError) -> Self {
        CommandError::new(err.code(), err.to_string())
    }
}

pub type MixResult<T> = Result<T, MixError>;
