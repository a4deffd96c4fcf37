//! Station server
//!
//! ```text
//! PrintListener ──(bounded mpsc)──▶ IntakeWorker ──▶ JobTracker / MixingEngine
//! ScaleHandle   ──(unbounded)─────▶ ScaleFeed    ──▶ MixingEngine::record_weight
//! MixingEngine  ──(unbounded)─────▶ SessionArchiveWorker ──▶ SessionStore
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use tinta_intake::PrintListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::archive::{JsonlSessionStore, SessionArchiveWorker, SessionStore};
use crate::core::state::StateChannels;
use crate::core::tasks::{BackgroundTasks, TaskKind};
use crate::core::{Config, Result, ServerState, StationError};
use crate::jobs::IntakeWorker;
use crate::scale::ScaleFeed;

pub struct Server {
    config: Config,
    state: ServerState,
    channels: StateChannels,
    store: Arc<dyn SessionStore>,
}

impl Server {
    /// Server archiving to `sessions.jsonl` under the work directory
    pub fn new(config: Config) -> Self {
        let store = Arc::new(JsonlSessionStore::new(config.archive_path()));
        Self::with_store(config, store)
    }

    /// Server with a custom archive store
    pub fn with_store(config: Config, store: Arc<dyn SessionStore>) -> Self {
        let (state, channels) = ServerState::initialize(&config);
        Self {
            config,
            state,
            channels,
            store,
        }
    }

    pub fn state(&self) -> &ServerState {
        &self.state
    }

    /// Bind the listener and start every background task
    ///
    /// A bind failure is fatal and returned before anything is spawned.
    pub async fn start(self) -> Result<RunningServer> {
        let Self {
            config,
            state,
            channels,
            store,
        } = self;

        if config.default_tolerance.is_sign_negative() {
            return Err(StationError::Config(format!(
                "DEFAULT_TOLERANCE must not be negative: {}",
                config.default_tolerance
            )));
        }

        tokio::fs::create_dir_all(&config.work_dir).await?;

        let listener = PrintListener::bind(config.listener_config()).await?;
        let local_addr = listener.local_addr()?;

        let (intake_tx, intake_rx) = mpsc::channel(config.job_queue_capacity.max(1));

        let mut tasks = BackgroundTasks::new();
        let token = tasks.shutdown_token();

        tasks.spawn(
            "print_listener",
            TaskKind::Listener,
            listener.run(intake_tx, token.clone()),
        );

        let intake = IntakeWorker::new(
            Arc::clone(&state.tracker),
            Arc::clone(&state.engine),
            config.preview_chars,
        );
        tasks.spawn(
            "intake_worker",
            TaskKind::Worker,
            intake.run(intake_rx, token.clone()),
        );

        let scale_feed = ScaleFeed::new(Arc::clone(&state.engine));
        tasks.spawn(
            "scale_feed",
            TaskKind::Worker,
            scale_feed.run(channels.scale_rx, token.clone()),
        );

        let archive = SessionArchiveWorker::new(store);
        tasks.spawn(
            "session_archive",
            TaskKind::Worker,
            archive.run(channels.archive_rx, token),
        );

        tasks.log_summary();
        tracing::info!(
            addr = %local_addr,
            work_dir = %config.work_dir,
            environment = %config.environment,
            "Tinta station ready"
        );

        Ok(RunningServer {
            state,
            local_addr,
            tasks,
        })
    }

    /// Start, wait for Ctrl-C, then shut down gracefully
    pub async fn run(self) -> Result<()> {
        let running = self.start().await?;
        tokio::signal::ctrl_c().await?;
        tracing::info!("Shutdown signal received");
        running.shutdown().await;
        Ok(())
    }
}

/// Handle to a started server
pub struct RunningServer {
    state: ServerState,
    local_addr: SocketAddr,
    tasks: BackgroundTasks,
}

impl RunningServer {
    pub fn state(&self) -> &ServerState {
        &self.state
    }

    /// Address the print listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.tasks.shutdown_token()
    }

    /// Cancel every background task and wait for it
    pub async fn shutdown(self) {
        self.tasks.shutdown().await;
    }
}
