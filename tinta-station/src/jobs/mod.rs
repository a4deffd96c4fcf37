//! Print job tracking
//!
//! - [`JobTracker`] - bounded job history and printer status
//! - [`IntakeWorker`] - listener events → parse → engine

pub mod tracker;
pub mod worker;

pub use tracker::JobTracker;
pub use worker::IntakeWorker;
