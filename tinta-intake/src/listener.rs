//! Print Stream Listener
//!
//! Accepts raw-printer connections (TCP port 9100). Everything received on a
//! connection until the peer closes or goes idle is one job. Jobs and
//! per-connection status are forwarded to the consumer as [`IntakeEvent`]s
//! over a bounded channel.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{IntakeError, IntakeResult};

/// Conventional raw-printer port
pub const DEFAULT_PORT: u16 = 9100;

const READ_CHUNK: usize = 8 * 1024;

/// Listener configuration
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// e.g. "127.0.0.1:9100"
    pub bind_addr: String,
    /// A connection with no bytes for this long is considered finished
    pub idle_timeout: Duration,
    /// Reading stops once a job reaches this size
    pub max_job_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_addr: format!("127.0.0.1:{}", DEFAULT_PORT),
            idle_timeout: Duration::from_secs(2),
            max_job_bytes: 4 * 1024 * 1024,
        }
    }
}

/// One fully buffered print job
#[derive(Debug, Clone)]
pub struct RawJob {
    pub peer: SocketAddr,
    pub bytes: Vec<u8>,
    /// Reading stopped at `max_job_bytes`
    pub truncated: bool,
}

/// Listener → consumer notifications
#[derive(Debug)]
pub enum IntakeEvent {
    /// First bytes of a job arrived
    Receiving { peer: SocketAddr },
    /// Bytes stopped arriving, job is ready for parsing
    Job(RawJob),
    /// Connection closed without sending anything (status probe)
    Empty { peer: SocketAddr },
    /// Connection failed mid-job; partial bytes are discarded
    ConnectionFailed { peer: SocketAddr, error: String },
}

/// Bound raw-printer listener
#[derive(Debug)]
pub struct PrintListener {
    listener: TcpListener,
    config: ListenerConfig,
}

impl PrintListener {
    /// Bind the listening socket
    ///
    /// Failure here is fatal for the service (port conflict, bad address).
    pub async fn bind(config: ListenerConfig) -> IntakeResult<Self> {
        let addr: SocketAddr = config.bind_addr.parse().map_err(|_| {
            IntakeError::InvalidConfig(format!("Invalid address: {}", config.bind_addr))
        })?;

        if config.max_job_bytes == 0 {
            return Err(IntakeError::InvalidConfig(
                "max_job_bytes must be greater than zero".to_string(),
            ));
        }

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| IntakeError::Bind {
                addr: config.bind_addr.clone(),
                source,
            })?;

        info!(addr = %config.bind_addr, "Print listener bound");
        Ok(Self { listener, config })
    }

    /// Actual bound address (useful with port 0)
    pub fn local_addr(&self) -> IntakeResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn config(&self) -> &ListenerConfig {
        &self.config
    }

    /// Accept loop
    ///
    /// Runs until `shutdown` is cancelled. A failing connection is logged and
    /// closed, it never stops the loop.
    pub async fn run(self, events: mpsc::Sender<IntakeEvent>, shutdown: CancellationToken) {
        info!("Print listener accepting connections");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Print listener shutting down");
                    break;
                }

                result = self.listener.accept() => {
                    match result {
                        Ok((stream, peer)) => {
                            debug!(%peer, "Printer client connected");
                            self.spawn_connection(stream, peer, events.clone());
                        }
                        Err(e) => {
                            error!(error = %e, "Failed to accept connection");
                        }
                    }
                }
            }
        }
    }

    fn spawn_connection(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
        events: mpsc::Sender<IntakeEvent>,
    ) {
        let config = self.config.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer, &config, &events).await {
                warn!(%peer, error = %e, "Print connection failed");
                let _ = events
                    .send(IntakeEvent::ConnectionFailed {
                        peer,
                        error: e.to_string(),
                    })
                    .await;
            }
        });
    }
}

/// Buffer one connection into a job
#[instrument(skip_all, fields(%peer))]
async fn handle_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    config: &ListenerConfig,
    events: &mpsc::Sender<IntakeEvent>,
) -> IntakeResult<()> {
    let mut bytes = Vec::new();
    let mut chunk = vec![0u8; READ_CHUNK];
    let mut truncated = false;

    loop {
        let n = match tokio::time::timeout(config.idle_timeout, stream.read(&mut chunk)).await {
            Err(_) => {
                debug!(received = bytes.len(), "Idle timeout, closing job");
                break;
            }
            Ok(read) => read?,
        };
        if n == 0 {
            break;
        }

        if bytes.is_empty() {
            events
                .send(IntakeEvent::Receiving { peer })
                .await
                .map_err(|_| IntakeError::ChannelClosed(peer))?;
        }

        let room = config.max_job_bytes - bytes.len();
        if n > room {
            bytes.extend_from_slice(&chunk[..room]);
            truncated = true;
            warn!(limit = config.max_job_bytes, "Job exceeds size limit, truncating");
            break;
        }
        bytes.extend_from_slice(&chunk[..n]);
    }

    if bytes.is_empty() {
        // Connect-and-close status probes
        debug!("Connection closed without data");
        return events
            .send(IntakeEvent::Empty { peer })
            .await
            .map_err(|_| IntakeError::ChannelClosed(peer));
    }

    info!(bytes = bytes.len(), truncated, "Print job received");
    events
        .send(IntakeEvent::Job(RawJob {
            peer,
            bytes,
            truncated,
        }))
        .await
        .map_err(|_| IntakeError::ChannelClosed(peer))
}
