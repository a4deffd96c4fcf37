//! Tinta Station - paint mixing workstation service
//!
//! # Overview
//!
//! The dispensing controller prints each recipe to a "printer" that is really
//! this service. Captured jobs are parsed into recipes, and the operator then
//! weighs every ingredient on a scale while the station tracks progress and
//! classifies the final mix against the recipe tolerance.
//!
//! - **Intake** (`jobs`): listener events → job history + recipe parsing
//! - **Mixing** (`mixing`): single-session state machine
//! - **Events** (`message`): ordered publish-subscribe for UI and logging
//! - **Scale** (`scale`): external weight readings → engine
//! - **Archive** (`archive`): completed sessions → `SessionStore`
//!
//! # Structure
//!
//! ```text
//! tinta-station/src/
//! ├── core/          # config, state, server, tasks, errors
//! ├── jobs/          # job tracker, intake worker
//! ├── message/       # event bus
//! ├── mixing/        # mixing session engine
//! ├── utils/         # logger
//! ├── archive.rs     # session store + archive worker
//! └── scale.rs       # scale feed
//! ```

pub mod archive;
pub mod core;
pub mod jobs;
pub mod message;
pub mod mixing;
pub mod scale;
pub mod utils;

// Re-exports
pub use archive::{
    ArchivedSession, JsonlSessionStore, MemorySessionStore, SessionArchiveWorker, SessionStore,
    StoreError,
};
pub use core::{Config, RunningServer, Server, ServerState, StationError};
pub use jobs::{IntakeWorker, JobTracker};
pub use message::{EventBus, EventSubscriber, LoggingSubscriber};
pub use mixing::{MixError, MixingEngine, StartOptions};
pub use scale::{ScaleFeed, ScaleHandle};
pub use utils::logger::{init_logger, init_logger_with_file};

pub fn print_banner() {
    println!(
        r#"
 _____ _       _
|_   _(_)_ __ | |_ __ _
  | | | | '_ \| __/ _` |
  | | | | | | | || (_| |
  |_| |_|_| |_|\__\__,_|
        mixing station
    "#
    );
}
