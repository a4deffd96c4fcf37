//! Print job history and virtual printer status
//!
//! The history is bounded: once `limit` jobs are stored, the oldest one is
//! evicted for each new job. Every change is published on the [`EventBus`].

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use shared::message::StationEvent;
use shared::models::{PrintJob, PrinterStatus};

use crate::message::EventBus;

struct TrackerInner {
    history: VecDeque<PrintJob>,
    status: PrinterStatus,
}

pub struct JobTracker {
    inner: Mutex<TrackerInner>,
    bus: Arc<EventBus>,
    limit: usize,
}

impl std::fmt::Debug for JobTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("JobTracker")
            .field("status", &inner.status)
            .field("jobs", &inner.history.len())
            .field("limit", &self.limit)
            .finish()
    }
}

impl JobTracker {
    /// `limit` is clamped to at least one job
    pub fn new(bus: Arc<EventBus>, limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            inner: Mutex::new(TrackerInner {
                history: VecDeque::with_capacity(limit),
                status: PrinterStatus::Idle,
            }),
            bus,
            limit,
        }
    }

    pub fn status(&self) -> PrinterStatus {
        self.inner.lock().status
    }

    /// Job history, oldest first
    pub fn history(&self) -> Vec<PrintJob> {
        self.inner.lock().history.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().history.is_empty()
    }

    /// Change the printer status
    ///
    /// Publishes `PrinterStatusChanged` when the status actually changes.
    pub fn set_status(&self, status: PrinterStatus) {
        let mut inner = self.inner.lock();
        if inner.status == status {
            return;
        }
        tracing::debug!(from = %inner.status, to = %status, "Printer status");
        inner.status = status;
        self.bus.publish(StationEvent::PrinterStatusChanged {
            status,
            queue_len: inner.history.len(),
        });
    }

    /// Append a finished job, evicting the oldest past the limit
    pub fn record(&self, job: PrintJob) {
        let mut inner = self.inner.lock();
        tracing::info!(
            job_id = %job.id,
            status = ?job.status,
            bytes = job.size,
            recipe = ?job.recipe_number,
            "Print job recorded"
        );
        inner.history.push_back(job);
        while inner.history.len() > self.limit {
            inner.history.pop_front();
        }
        let snapshot = inner.history.iter().cloned().collect();
        self.bus.publish(StationEvent::PrinterQueueChanged(snapshot));
    }

    /// Drop every stored job
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        if inner.history.is_empty() {
            return;
        }
        inner.history.clear();
        self.bus.publish(StationEvent::PrinterQueueChanged(Vec::new()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker_with_log(limit: usize) -> (JobTracker, Arc<Mutex<Vec<StationEvent>>>) {
        let bus = Arc::new(EventBus::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        bus.add_subscriber(Arc::new(move |e: &StationEvent| sink.lock().push(e.clone())));
        (JobTracker::new(bus, limit), log)
    }

    fn job(n: usize) -> PrintJob {
        PrintJob::success(format!("Receta: {}", n), 10, n.to_string())
    }

    #[test]
    fn test_history_is_bounded_oldest_first() {
        let (tracker, _) = tracker_with_log(3);
        for n in 1..=5 {
            tracker.record(job(n));
        }

        let numbers: Vec<_> = tracker
            .history()
            .into_iter()
            .filter_map(|j| j.recipe_number)
            .collect();
        assert_eq!(numbers, vec!["3", "4", "5"]);
        assert_eq!(tracker.len(), 3);
    }

    #[test]
    fn test_record_publishes_full_history() {
        let (tracker, log) = tracker_with_log(10);
        tracker.record(job(1));
        tracker.record(job(2));

        match log.lock().last() {
            Some(StationEvent::PrinterQueueChanged(jobs)) => assert_eq!(jobs.len(), 2),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_status_change_published_once() {
        let (tracker, log) = tracker_with_log(10);
        tracker.record(job(1));
        log.lock().clear();

        tracker.set_status(PrinterStatus::Receiving);
        tracker.set_status(PrinterStatus::Receiving);
        tracker.set_status(PrinterStatus::Idle);

        let events = log.lock().clone();
        assert_eq!(
            events,
            vec![
                StationEvent::PrinterStatusChanged {
                    status: PrinterStatus::Receiving,
                    queue_len: 1
                },
                StationEvent::PrinterStatusChanged {
                    status: PrinterStatus::Idle,
                    queue_len: 1
                },
            ]
        );
        assert_eq!(tracker.status(), PrinterStatus::Idle);
    }

    #[test]
    fn test_initial_status_idle_without_event() {
        let (tracker, log) = tracker_with_log(10);
        tracker.set_status(PrinterStatus::Idle);
        assert!(log.lock().is_empty());
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_clear() {
        let (tracker, log) = tracker_with_log(10);
        tracker.record(job(1));
        tracker.clear();
        tracker.clear();

        assert!(tracker.is_empty());
        let queue_events = log
            .lock()
            .iter()
            .filter(|e| matches!(e, StationEvent::PrinterQueueChanged(_)))
            .count();
        assert_eq!(queue_events, 2);
    }
}
