//! Station event types
//!
//! Published by the listener, the intake worker and the mixing engine, delivered
//! to UI and logging observers in publication order.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{MixingSession, PrintJob, PrinterStatus, Recipe};

/// Live weight feedback for the current ingredient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightUpdate {
    pub recipe_id: String,
    /// Index into the flattened ingredient list
    pub index: usize,
    pub code: String,
    pub weight: Decimal,
    pub target: Decimal,
    pub tolerance: Decimal,
    pub lower: Decimal,
    pub upper: Decimal,
    pub within_tolerance: bool,
}

/// Outbound station event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum StationEvent {
    RecipeDetected(Recipe),
    WeightUpdated(WeightUpdate),
    PrinterStatusChanged {
        status: PrinterStatus,
        queue_len: usize,
    },
    /// Full job history, oldest first
    PrinterQueueChanged(Vec<PrintJob>),
    SessionStarted(MixingSession),
    SessionCompleted(MixingSession),
    SessionCancelled {
        #[serde(skip_serializing_if = "Option::is_none")]
        recipe_id: Option<String>,
    },
    SessionError {
        message: String,
    },
}

impl StationEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            StationEvent::RecipeDetected(_) => "recipe_detected",
            StationEvent::WeightUpdated(_) => "weight_updated",
            StationEvent::PrinterStatusChanged { .. } => "printer_status_changed",
            StationEvent::PrinterQueueChanged(_) => "printer_queue_changed",
            StationEvent::SessionStarted(_) => "session_started",
            StationEvent::SessionCompleted(_) => "session_completed",
            StationEvent::SessionCancelled { .. } => "session_cancelled",
            StationEvent::SessionError { .. } => "session_error",
        }
    }

    pub fn session_error(message: impl Into<String>) -> Self {
        StationEvent::SessionError {
            message: message.into(),
        }
    }
}

impl fmt::Display for StationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind())
    }
}
