//! Completed session archive
//!
//! The engine hands each completed [`MixingSession`] off over an unbounded
//! channel. [`SessionArchiveWorker`] passes them to a [`SessionStore`]. Store
//! failures are logged and the session is dropped; they never reach the
//! engine.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use shared::models::MixingSession;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence collaborator for completed sessions
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn save(&self, session: &MixingSession) -> StoreResult<()>;
}

/// One line of `sessions.jsonl`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedSession {
    /// RFC 3339 archive time
    pub archived_at: String,
    pub session: MixingSession,
}

/// Append-only JSON-lines file store
#[derive(Debug, Clone)]
pub struct JsonlSessionStore {
    path: PathBuf,
}

impl JsonlSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every archived session back, skipping unreadable lines
    pub async fn load_all(&self) -> StoreResult<Vec<ArchivedSession>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        Ok(content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|l| match serde_json::from_str(l) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable archive line");
                    None
                }
            })
            .collect())
    }
}

#[async_trait]
impl SessionStore for JsonlSessionStore {
    async fn save(&self, session: &MixingSession) -> StoreResult<()> {
        let entry = ArchivedSession {
            archived_at: chrono::Utc::now().to_rfc3339(),
            session: session.clone(),
        };
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

/// In-memory store (tests, kiosks without disk)
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: Mutex<Vec<MixingSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sessions(&self) -> Vec<MixingSession> {
        self.sessions.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn save(&self, session: &MixingSession) -> StoreResult<()> {
        self.sessions.lock().push(session.clone());
        Ok(())
    }
}

/// Drains the engine's hand-off channel into a store
pub struct SessionArchiveWorker {
    store: Arc<dyn SessionStore>,
}

impl SessionArchiveWorker {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    pub async fn run(
        self,
        mut rx: mpsc::UnboundedReceiver<MixingSession>,
        shutdown: CancellationToken,
    ) {
        tracing::info!("Session archive worker started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    // Completed sessions already handed off are still written
                    while let Ok(session) = rx.try_recv() {
                        self.archive(session).await;
                    }
                    tracing::info!("Session archive worker received shutdown signal");
                    break;
                }
                session = rx.recv() => {
                    let Some(session) = session else {
                        tracing::info!("Archive channel closed, archive worker stopping");
                        break;
                    };
                    self.archive(session).await;
                }
            }
        }
    }

    async fn archive(&self, session: MixingSession) {
        match self.store.save(&session).await {
            Ok(()) => tracing::info!(
                recipe = %session.recipe_id,
                session_id = %session.session_id,
                "Session archived"
            ),
            Err(e) => tracing::error!(
                recipe = %session.recipe_id,
                session_id = %session.session_id,
                error = %e,
                "Failed to archive session"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::models::{IngredientTarget, Layer, Recipe, RecipeMeta};

    fn completed_session(number: &str) -> MixingSession {
        let recipe = Recipe {
            number: number.into(),
            history: None,
            meta: RecipeMeta::default(),
            tolerance: None,
            mix_type: None,
            layers: vec![Layer {
                name: "Base".into(),
                ingredients: vec![IngredientTarget {
                    order: 1,
                    sku: "kt-1400".into(),
                    target_weight: Decimal::from(100),
                }],
            }],
        };
        MixingSession::from_recipe(&recipe, Decimal::new(5, 1))
    }

    #[tokio::test]
    async fn test_jsonl_store_appends() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlSessionStore::new(dir.path().join("nested").join("sessions.jsonl"));

        store.save(&completed_session("1")).await.unwrap();
        store.save(&completed_session("2")).await.unwrap();

        let entries = store.load_all().await.unwrap();
        let ids: Vec<_> = entries.iter().map(|e| e.session.recipe_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert!(!entries[0].archived_at.is_empty());
    }

    #[tokio::test]
    async fn test_jsonl_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlSessionStore::new(dir.path().join("absent.jsonl"));
        assert!(store.load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_worker_drains_into_store() {
        let store = Arc::new(MemorySessionStore::new());
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(completed_session("7")).unwrap();
        tx.send(completed_session("8")).unwrap();
        drop(tx);

        SessionArchiveWorker::new(store.clone())
            .run(rx, CancellationToken::new())
            .await;

        let ids: Vec<_> = store.sessions().into_iter().map(|s| s.recipe_id).collect();
        assert_eq!(ids, vec!["7", "8"]);
    }

    #[tokio::test]
    async fn test_worker_flushes_pending_on_shutdown() {
        let store = Arc::new(MemorySessionStore::new());
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(completed_session("9")).unwrap();
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        SessionArchiveWorker::new(store.clone()).run(rx, shutdown).await;

        assert_eq!(store.len(), 1);
        drop(tx);
    }

    #[tokio::test]
    async fn test_store_failure_is_contained() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be makes every append fail
        let path = dir.path().join("sessions.jsonl");
        std::fs::create_dir(&path).unwrap();
        let store = Arc::new(JsonlSessionStore::new(path));

        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(completed_session("1")).unwrap();
        drop(tx);

        SessionArchiveWorker::new(store.clone())
            .run(rx, CancellationToken::new())
            .await;

        assert!(store.save(&completed_session("2")).await.is_err());
    }
}
