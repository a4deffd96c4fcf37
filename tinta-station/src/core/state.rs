use std::sync::Arc;

use shared::models::{MixingSession, WeightReading};
use tokio::sync::mpsc;

use crate::core::Config;
use crate::jobs::JobTracker;
use crate::message::{EventBus, LoggingSubscriber};
use crate::mixing::MixingEngine;
use crate::scale::{self, ScaleHandle};

/// Shared station components
///
/// Cheap to clone: every component sits behind an `Arc`.
///
/// | Field | Meaning |
/// |-------|---------|
/// | config | Configuration (immutable) |
/// | bus | Event bus, UI and logging observers subscribe here |
/// | tracker | Print job history and printer status |
/// | engine | Mixing session engine, operator commands go here |
/// | scale | Producer handle for the scale driver |
///
/// # Example
///
/// ```ignore
/// let (state, channels) = ServerState::initialize(&config);
/// let mut events = state.bus.subscribe();
/// let resp = state.engine.execute(MixCommand::start("42"));
/// state.scale.push(WeightReading::new(weight));
/// ```
#[derive(Clone, Debug)]
pub struct ServerState {
    pub config: Config,
    pub bus: Arc<EventBus>,
    pub tracker: Arc<JobTracker>,
    pub engine: Arc<MixingEngine>,
    pub scale: ScaleHandle,
}

/// Receiving ends consumed by the background workers
#[derive(Debug)]
pub struct StateChannels {
    pub archive_rx: mpsc::UnboundedReceiver<MixingSession>,
    pub scale_rx: mpsc::UnboundedReceiver<WeightReading>,
}

impl ServerState {
    /// Build every component and wire them together
    pub fn initialize(config: &Config) -> (Self, StateChannels) {
        let bus = Arc::new(EventBus::new());
        bus.add_subscriber(Arc::new(LoggingSubscriber));

        let tracker = Arc::new(JobTracker::new(Arc::clone(&bus), config.job_history_limit));

        let (archive_tx, archive_rx) = mpsc::unbounded_channel();
        let engine = Arc::new(
            MixingEngine::new(Arc::clone(&bus), config.default_tolerance).with_archive(archive_tx),
        );

        let (scale, scale_rx) = scale::channel();

        let state = Self {
            config: config.clone(),
            bus,
            tracker,
            engine,
            scale,
        };
        (
            state,
            StateChannels {
                archive_rx,
                scale_rx,
            },
        )
    }
}
