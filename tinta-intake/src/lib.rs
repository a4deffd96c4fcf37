//! # tinta-intake
//!
//! Raw print-stream intake for the mixing station.
//!
//! ## Scope
//!
//! This crate handles how a recipe gets in:
//! - Raw printer listener (TCP port 9100), one connection = one job
//! - ESC/POS control sequence stripping
//! - Windows-1252 / UTF-8 text decoding
//! - Line-oriented recipe grammar
//!
//! What happens with a recipe afterwards (sessions, weighing, events) stays
//! in the station service.
//!
//! ## Example
//!
//! ```ignore
//! use tinta_intake::{ListenerConfig, PrintListener, RecipeParser};
//!
//! let listener = PrintListener::bind(ListenerConfig::default()).await?;
//! tokio::spawn(listener.run(events_tx, shutdown.clone()));
//!
//! // For each IntakeEvent::Job(job):
//! let parsed = RecipeParser::default().parse_job(&job.bytes)?;
//! println!("Receta {}", parsed.recipe.number);
//! ```

mod encoding;
mod error;
mod escpos;
mod extract;
mod listener;
mod parser;

// Re-exports
pub use encoding::{decode_text, truncate_chars};
pub use error::{IntakeError, IntakeResult, ParseError, ParseResult};
pub use escpos::strip_control_sequences;
pub use extract::{extract_lines, job_preview};
pub use listener::{DEFAULT_PORT, IntakeEvent, ListenerConfig, PrintListener, RawJob};
pub use parser::{
    IngredientMatcher, LayerHeaderMatcher, LineClassifier, LineKind, LineMatcher,
    MalformedIngredientMatcher, MetaKey, MetadataMatcher, ParsedRecipe, RecipeParser, SkipReason,
    SkippedLine, parse_decimal, parse_ingredient_line,
};
