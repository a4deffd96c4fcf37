//! Background task registry
//!
//! The listener and every worker run as tokio tasks registered here, so
//! shutdown can cancel them together and wait for them to drain.

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Accepts inbound connections
    Listener,
    /// Consumes a channel until shutdown
    Worker,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Listener => write!(f, "Listener"),
            TaskKind::Worker => write!(f, "Worker"),
        }
    }
}

struct RegisteredTask {
    name: &'static str,
    kind: TaskKind,
    handle: JoinHandle<()>,
}

/// Background task manager
///
/// ```ignore
/// let mut tasks = BackgroundTasks::new();
/// let token = tasks.shutdown_token();
/// tasks.spawn("intake_worker", TaskKind::Worker, worker.run(rx, token));
///
/// tasks.shutdown().await;
/// ```
pub struct BackgroundTasks {
    tasks: Vec<RegisteredTask>,
    shutdown: CancellationToken,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::with_token(CancellationToken::new())
    }

    /// Share an existing cancellation token (e.g. the server's)
    pub fn with_token(shutdown: CancellationToken) -> Self {
        Self {
            tasks: Vec::new(),
            shutdown,
        }
    }

    /// Token the spawned futures should watch
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Spawn a task
    ///
    /// Panics inside the task are caught and logged. A task that returns
    /// before shutdown was requested is reported as unexpected.
    pub fn spawn<F>(&mut self, name: &'static str, kind: TaskKind, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let shutdown = self.shutdown.clone();
        let wrapped = async move {
            match AssertUnwindSafe(future).catch_unwind().await {
                Ok(()) if shutdown.is_cancelled() => {
                    tracing::debug!(task = %name, kind = %kind, "Background task stopped");
                }
                Ok(()) => {
                    tracing::warn!(task = %name, kind = %kind, "Background task completed unexpectedly");
                }
                Err(panic_info) => {
                    let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                        (*s).to_string()
                    } else if let Some(s) = panic_info.downcast_ref::<String>() {
                        s.clone()
                    } else {
                        "Unknown panic".to_string()
                    };
                    tracing::error!(task = %name, kind = %kind, panic = %panic_msg, "Background task panicked");
                }
            }
        };

        let handle = tokio::spawn(wrapped);
        tracing::debug!(task = %name, kind = %kind, "Registered background task");
        self.tasks.push(RegisteredTask { name, kind, handle });
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Number of tasks that already finished
    pub fn finished_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.handle.is_finished()).count()
    }

    pub fn log_summary(&self) {
        let listeners = self
            .tasks
            .iter()
            .filter(|t| t.kind == TaskKind::Listener)
            .count();
        tracing::info!(
            total = self.tasks.len(),
            listeners,
            workers = self.tasks.len() - listeners,
            "Background tasks registered"
        );
    }

    /// Cancel every task and wait for all of them
    pub async fn shutdown(self) {
        tracing::info!("Shutting down {} background tasks...", self.tasks.len());
        self.shutdown.cancel();

        for task in self.tasks {
            match task.handle.await {
                Ok(()) => tracing::debug!(task = %task.name, "Task completed"),
                Err(e) if e.is_cancelled() => tracing::debug!(task = %task.name, "Task cancelled"),
                Err(e) => tracing::error!(task = %task.name, error = ?e, "Task failed"),
            }
        }

        tracing::info!("All background tasks stopped");
    }
}

impl Default for BackgroundTasks {
    fn default() -> Self {
        Self::new()
    }
}
