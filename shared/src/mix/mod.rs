//! Mixing command envelope
//!
//! Commands issued by the operator UI against the mixing engine, and the
//! synchronous response returned for each of them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{MixingSession, SessionState};

/// Operator command payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MixCommandPayload {
    StartMix {
        recipe_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        operator_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        operator_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mix_type: Option<String>,
    },
    RecordWeight {
        weight: Decimal,
    },
    NextIngredient,
    CancelMix,
}

/// Operator command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixCommand {
    pub command_id: String,
    pub payload: MixCommandPayload,
}

impl MixCommand {
    pub fn new(payload: MixCommandPayload) -> Self {
        Self {
            command_id: uuid::Uuid::new_v4().to_string(),
            payload,
        }
    }

    pub fn start(recipe_id: impl Into<String>) -> Self {
        Self::new(MixCommandPayload::StartMix {
            recipe_id: recipe_id.into(),
            operator_id: None,
            operator_name: None,
            mix_type: None,
        })
    }

    pub fn record_weight(weight: Decimal) -> Self {
        Self::new(MixCommandPayload::RecordWeight { weight })
    }

    pub fn next_ingredient() -> Self {
        Self::new(MixCommandPayload::NextIngredient)
    }

    pub fn cancel() -> Self {
        Self::new(MixCommandPayload::CancelMix)
    }
}

/// Command rejection codes (frontend localizes)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandErrorCode {
    /// No recipe is loaded
    NoRecipe,
    /// Recipe has no ingredients to walk
    EmptyRecipe,
    /// Command not valid in the current state
    InvalidState,
    /// Requested recipe id differs from the loaded recipe
    RecipeMismatch,
    /// A session is ACTIVE and cannot be replaced
    SessionInProgress,
    /// No reading recorded for the current ingredient
    NoReading,
    /// Weight is negative or otherwise unusable
    InvalidWeight,
    InternalError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandError {
    pub code: CommandErrorCode,
    pub message: String,
}

impl CommandError {
    pub fn new(code: CommandErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Command response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResponse {
    /// The command ID this responds to
    pub command_id: String,
    pub success: bool,
    /// Engine state after the command
    pub state: SessionState,
    /// Session snapshot after the command (absent when IDLE)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<MixingSession>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CommandError>,
}

impl CommandResponse {
    pub fn success(
        command_id: String,
        state: SessionState,
        session: Option<MixingSession>,
    ) -> Self {
        Self {
            command_id,
            success: true,
            state,
            session,
            error: None,
        }
    }

    pub fn error(command_id: String, state: SessionState, error: CommandError) -> Self {
        Self {
            command_id,
            success: false,
            state,
            session: None,
            error: Some(error),
        }
    }
}
