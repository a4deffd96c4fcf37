//! Shared types for the Tinta mixing station
//!
//! Domain models, outbound station events and the command envelope used by
//! both the intake crate and the station service.

pub mod message;
pub mod mix;
pub mod models;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use message::{StationEvent, WeightUpdate};
pub use mix::{CommandError, CommandErrorCode, CommandResponse, MixCommand, MixCommandPayload};
pub use models::{
    Classification, IngredientTarget, JobStatus, Layer, MixingSession, PrintJob, PrinterStatus,
    Recipe, RecipeMeta, SessionIngredient, SessionState, WeightReading,
};
