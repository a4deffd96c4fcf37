//! Domain models shared between intake and station

pub mod print_job;
pub mod recipe;
pub mod session;

pub use print_job::{JobStatus, PrintJob, PrinterStatus};
pub use recipe::{DEFAULT_LAYER_NAME, IngredientTarget, Layer, Recipe, RecipeMeta};
pub use session::{Classification, MixingSession, SessionIngredient, SessionState, WeightReading};
