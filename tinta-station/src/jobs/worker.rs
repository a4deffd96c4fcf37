//! Intake Worker
//!
//! Consumes the listener's bounded work queue: records every job, parses it,
//! and hands detected recipes to the mixing engine.
//!
//! ```text
//! Receiving ──▶ status RECEIVING
//! Job       ──▶ status PROCESSING ──▶ parse ──┬─ ok  ──▶ PrintJob SUCCESS, RecipeDetected, status IDLE
//!                                             └─ err ──▶ PrintJob ERROR_PARSE, status ERROR
//! Empty            ──▶ status IDLE (no PrintJob)
//! ConnectionFailed ──▶ status ERROR
//! ```

use std::sync::Arc;

use shared::models::{PrintJob, PrinterStatus};
use tinta_intake::{IntakeEvent, RawJob, RecipeParser, job_preview};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::tracker::JobTracker;
use crate::mixing::{MixError, MixingEngine};

pub struct IntakeWorker {
    parser: RecipeParser,
    tracker: Arc<JobTracker>,
    engine: Arc<MixingEngine>,
    preview_chars: usize,
}

impl IntakeWorker {
    pub fn new(tracker: Arc<JobTracker>, engine: Arc<MixingEngine>, preview_chars: usize) -> Self {
        Self {
            parser: RecipeParser::default(),
            tracker,
            engine,
            preview_chars,
        }
    }

    /// Run until shutdown or until every listener sender is gone
    pub async fn run(self, mut rx: mpsc::Receiver<IntakeEvent>, shutdown: CancellationToken) {
        tracing::info!("Intake worker started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Intake worker received shutdown signal");
                    break;
                }
                event = rx.recv() => {
                    let Some(event) = event else {
                        tracing::info!("Intake channel closed, intake worker stopping");
                        break;
                    };
                    self.handle(event);
                }
            }
        }
    }

    /// Process one listener event
    pub fn handle(&self, event: IntakeEvent) {
        match event {
            IntakeEvent::Receiving { peer } => {
                tracing::debug!(%peer, "Receiving print job");
                self.tracker.set_status(PrinterStatus::Receiving);
            }
            IntakeEvent::Job(job) => {
                self.process_job(job);
            }
            IntakeEvent::Empty { peer } => {
                tracing::debug!(%peer, "Status probe");
                self.tracker.set_status(PrinterStatus::Idle);
            }
            IntakeEvent::ConnectionFailed { peer, error } => {
                tracing::warn!(%peer, %error, "Print connection failed");
                self.tracker.set_status(PrinterStatus::Error);
            }
        }
    }

    /// Parse one job and record the outcome
    pub fn process_job(&self, job: RawJob) -> PrintJob {
        self.tracker.set_status(PrinterStatus::Processing);

        let size = job.bytes.len();
        let preview = job_preview(&job.bytes, self.preview_chars);

        match self.parser.parse_job(&job.bytes) {
            Ok(parsed) => {
                for skipped in &parsed.skipped {
                    tracing::warn!(
                        line_no = skipped.line_no,
                        line = %skipped.text,
                        reason = ?skipped.reason,
                        "Skipped recipe line"
                    );
                }

                let record = PrintJob::success(preview, size, parsed.recipe.number.clone());
                tracing::info!(
                    peer = %job.peer,
                    job_id = %record.id,
                    recipe = %parsed.recipe.number,
                    bytes = size,
                    truncated = job.truncated,
                    "Recipe detected"
                );
                self.tracker.record(record.clone());

                match self.engine.on_recipe_detected(parsed.recipe) {
                    Ok(()) | Err(MixError::SessionInProgress(_)) => {}
                    Err(e) => tracing::warn!(error = %e, "Recipe not loaded"),
                }
                self.tracker.set_status(PrinterStatus::Idle);
                record
            }
            Err(e) => {
                let record = PrintJob::parse_error(preview, size, e.to_string());
                tracing::warn!(
                    peer = %job.peer,
                    job_id = %record.id,
                    bytes = size,
                    error = %e,
                    "Print job could not be parsed"
                );
                self.tracker.record(record.clone());
                self.tracker.set_status(PrinterStatus::Error);
                record
            }
        }
    }
}
