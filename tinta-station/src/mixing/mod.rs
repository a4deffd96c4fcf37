//! Mixing session engine
//!
//! - [`MixingEngine`] - state machine over one recipe at a time
//! - [`MixError`] - command rejections, convertible to `CommandError`

mod engine;
mod error;

pub use engine::{MixingEngine, StartOptions};
pub use error::{MixError, MixResult};

#[cfg(test)]
mod tests;
