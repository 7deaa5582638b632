//! Job telemetry collector.
//!
//! The collector fans lifecycle events out over a broadcast channel and keeps
//! a bounded history for CLI reporting. It is passed explicitly to whoever
//! publishes; there is no process-wide hub.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::broadcast;

pub mod events;

pub use events::{JobEvent, TimedEvent};

/// Snapshot of collector state for CLI reporting.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TelemetrySnapshot {
    pub recent: Vec<TimedEvent>,
    pub total_events: u64,
    pub dropped_events: u64,
}

struct CollectorInner {
    tx: broadcast::Sender<TimedEvent>,
    history: Mutex<VecDeque<TimedEvent>>,
    history_capacity: usize,
    total_events: AtomicU64,
    dropped_history: AtomicU64,
}

/// Broadcast-based collector retaining a bounded history of job events.
///
/// Cloning is cheap; clones share the same channel and history.
#[derive(Clone)]
pub struct TelemetryCollector {
    inner: Arc<CollectorInner>,
}

impl TelemetryCollector {
    pub fn new(buffer: usize, history_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer.max(1));
        Self {
            inner: Arc::new(CollectorInner {
                tx,
                history: Mutex::new(VecDeque::with_capacity(history_capacity)),
                history_capacity,
                total_events: AtomicU64::new(0),
                dropped_history: AtomicU64::new(0),
            }),
        }
    }

    /// Publish an event. Never blocks; safe to call from engine callbacks.
    pub fn publish(&self, event: JobEvent) {
        let timed = TimedEvent {
            timestamp_ms: now_timestamp_ms(),
            event,
        };
        self.inner.total_events.fetch_add(1, Ordering::Relaxed);

        if self.inner.history_capacity > 0 {
            if let Ok(mut history) = self.inner.history.lock() {
                if history.len() == self.inner.history_capacity {
                    history.pop_front();
                    self.inner.dropped_history.fetch_add(1, Ordering::Relaxed);
                }
                history.push_back(timed.clone());
            }
        }

        let _ = self.inner.tx.send(timed);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TimedEvent> {
        self.inner.tx.subscribe()
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let recent = self
            .inner
            .history
            .lock()
            .map(|history| history.iter().cloned().collect())
            .unwrap_or_default();
        TelemetrySnapshot {
            recent,
            total_events: self.inner.total_events.load(Ordering::Relaxed),
            dropped_events: self.inner.dropped_history.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new(256, 64)
    }
}

fn now_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
