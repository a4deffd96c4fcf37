//! Core module - configuration, state, background tasks and errors
//!
//! # Structure
//!
//! - [`Config`] - station configuration
//! - [`ServerState`] - shared components (bus, tracker, engine)
//! - [`Server`] - wires the listener and workers together
//! - [`BackgroundTasks`] - task registry with graceful shutdown
//! - [`StationError`] - fatal errors

pub mod config;
pub mod error;
pub mod server;
pub mod state;
pub mod tasks;

pub use config::Config;
pub use error::{Result, StationError};
pub use server::{RunningServer, Server};
pub use state::ServerState;
pub use tasks::{BackgroundTasks, TaskKind};
