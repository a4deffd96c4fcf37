//! End-to-end: raw print over TCP → recipe → weighed session → archive

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use shared::message::StationEvent;
use shared::mix::MixCommand;
use shared::models::{Classification, JobStatus, PrinterStatus, SessionState, WeightReading};
use tinta_station::{Config, MemorySessionStore, RunningServer, Server};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::broadcast;

const TICKET: &[u8] = b"\x1B@\x1Ba\x01Receta: 42\n\x1BE\x01Capa: Base\x1BE\x00\n01 : kt-1400 50,0 g\n02 : kt-1100 50,0 g\n\x1Bd\x03\x1DV\x42\x00";

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

async fn start_station() -> (RunningServer, Arc<MemorySessionStore>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::with_overrides(dir.path().to_string_lossy(), "127.0.0.1:0");
    config.printer_idle_timeout_ms = 300;
    config.default_tolerance = dec("0.5");
    config.job_history_limit = 10;

    let store = Arc::new(MemorySessionStore::new());
    let running = Server::with_store(config, store.clone())
        .start()
        .await
        .unwrap();
    (running, store, dir)
}

async fn print(running: &RunningServer, bytes: &[u8]) {
    let mut client = TcpStream::connect(running.local_addr()).await.unwrap();
    client.write_all(bytes).await.unwrap();
    client.shutdown().await.unwrap();
}

/// Wait for the first event matching `pred`
async fn wait_for<F>(rx: &mut broadcast::Receiver<StationEvent>, pred: F) -> StationEvent
where
    F: Fn(&StationEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = rx.recv().await.unwrap();
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("event in time")
}

async fn eventually<F: Fn() -> bool>(cond: F) {
    for _ in 0..100 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn test_print_then_weigh_to_completion() {
    let (running, store, _dir) = start_station().await;
    let state = running.state().clone();
    let mut events = state.bus.subscribe();

    print(&running, TICKET).await;

    let detected = wait_for(&mut events, |e| matches!(e, StationEvent::RecipeDetected(_))).await;
    match detected {
        StationEvent::RecipeDetected(recipe) => {
            assert_eq!(recipe.number, "42");
            assert_eq!(recipe.layers.len(), 1);
            assert_eq!(recipe.layers[0].name, "Base");
            assert_eq!(recipe.total_weight(), dec("100.0"));
        }
        other => panic!("unexpected event: {:?}", other),
    }
    wait_for(&mut events, |e| {
        matches!(
            e,
            StationEvent::PrinterStatusChanged {
                status: PrinterStatus::Idle,
                ..
            }
        )
    })
    .await;

    assert_eq!(state.engine.state(), SessionState::Ready);
    let history = state.tracker.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, JobStatus::Success);
    assert_eq!(history[0].size, TICKET.len());

    // Operator walks the recipe, readings come from the scale driver
    assert!(state.engine.execute(MixCommand::start("42")).success);

    assert!(state.scale.push(WeightReading::new(dec("50.0"))));
    wait_for(&mut events, |e| matches!(e, StationEvent::WeightUpdated(_))).await;
    assert!(state.engine.execute(MixCommand::next_ingredient()).success);

    assert!(state.scale.push(WeightReading::new(dec("50.2"))));
    wait_for(&mut events, |e| matches!(e, StationEvent::WeightUpdated(_))).await;
    let resp = state.engine.execute(MixCommand::next_ingredient());

    assert!(resp.success);
    assert_eq!(resp.state, SessionState::Completed);
    let session = resp.session.unwrap();
    assert_eq!(session.final_weight, Some(dec("100.2")));
    assert_eq!(session.difference, Some(dec("0.2")));
    assert_eq!(session.classification, Some(Classification::Perfect));

    eventually(|| store.len() == 1).await;
    assert_eq!(store.sessions()[0].recipe_id, "42");

    running.shutdown().await;
}

#[tokio::test]
async fn test_garbage_job_is_recorded_as_parse_error() {
    let (running, _store, _dir) = start_station().await;
    let state = running.state().clone();
    let mut events = state.bus.subscribe();

    print(&running, b"\x1B@just a test page\n\x1DV\x00").await;

    wait_for(&mut events, |e| {
        matches!(
            e,
            StationEvent::PrinterStatusChanged {
                status: PrinterStatus::Error,
                ..
            }
        )
    })
    .await;

    let history = state.tracker.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, JobStatus::ErrorParse);
    assert!(history[0].preview.contains("just a test page"));
    assert_eq!(state.engine.state(), SessionState::Idle);

    // The listener keeps serving after a bad job
    print(&running, TICKET).await;
    wait_for(&mut events, |e| matches!(e, StationEvent::RecipeDetected(_))).await;
    eventually(|| state.tracker.len() == 2).await;
    assert_eq!(state.engine.state(), SessionState::Ready);

    running.shutdown().await;
}

#[tokio::test]
async fn test_status_probe_creates_no_job() {
    let (running, _store, _dir) = start_station().await;
    let state = running.state().clone();

    let probe = TcpStream::connect(running.local_addr()).await.unwrap();
    drop(probe);
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(state.tracker.is_empty());
    assert_eq!(state.tracker.status(), PrinterStatus::Idle);

    running.shutdown().await;
}

#[tokio::test]
async fn test_status_probe_clears_error() {
    let (running, _store, _dir) = start_station().await;
    let state = running.state().clone();
    let mut events = state.bus.subscribe();

    print(&running, b"not a recipe\n").await;
    wait_for(&mut events, |e| {
        matches!(
            e,
            StationEvent::PrinterStatusChanged {
                status: PrinterStatus::Error,
                ..
            }
        )
    })
    .await;

    let probe = TcpStream::connect(running.local_addr()).await.unwrap();
    drop(probe);
    wait_for(&mut events, |e| {
        matches!(
            e,
            StationEvent::PrinterStatusChanged {
                status: PrinterStatus::Idle,
                ..
            }
        )
    })
    .await;

    assert_eq!(state.tracker.len(), 1);
    running.shutdown().await;
}

#[tokio::test]
async fn test_bind_conflict_is_fatal() {
    let (running, _store, dir) = start_station().await;
    let taken = running.local_addr().to_string();

    let config = Config::with_overrides(dir.path().to_string_lossy(), taken);
    let result = Server::with_store(config, Arc::new(MemorySessionStore::new()))
        .start()
        .await;

    assert!(matches!(
        result,
        Err(tinta_station::StationError::Intake(_))
    ));
    running.shutdown().await;
}
