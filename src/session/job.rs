//! JobSession: the state tying one outstanding engine job to its output
//! buffer and completion latch.

use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::engine::{Engine, JobId, JobKind};
use crate::error::AdapterError;
use crate::session::accumulator::Accumulator;
use crate::session::drain::{drain, Chunk, ChunkReason, DrainStats};
use crate::session::latch::CompletionLatch;
use crate::session::registry::{CorrelationToken, JobListener};
use crate::telemetry::{JobEvent, TelemetryCollector};

const NO_REASON: i32 = i32::MIN;

/// Per-request session, shared between the blocked request thread and the
/// engine's callback thread.
///
/// Only the drain routine appends to the accumulator, and it does so while
/// holding the accumulator lock for a whole pass; the latch fires after that
/// pass releases the lock. The request thread reads the accumulator only
/// after the latch fires, at which point it detaches it.
pub struct JobSession<T: Chunk> {
    token: CorrelationToken,
    engine: Arc<dyn Engine>,
    scratch_capacity: usize,
    accumulator: Mutex<Option<Accumulator<T>>>,
    latch: CompletionLatch,
    unexpected_count: AtomicUsize,
    last_unexpected: AtomicI32,
    telemetry: TelemetryCollector,
}

impl<T: Chunk> JobSession<T> {
    pub fn new(
        token: CorrelationToken,
        engine: Arc<dyn Engine>,
        scratch_capacity: usize,
        telemetry: TelemetryCollector,
    ) -> Self {
        Self {
            token,
            engine,
            scratch_capacity: scratch_capacity.max(1),
            accumulator: Mutex::new(Some(Accumulator::new())),
            latch: CompletionLatch::new(),
            unexpected_count: AtomicUsize::new(0),
            last_unexpected: AtomicI32::new(NO_REASON),
            telemetry,
        }
    }

    pub fn token(&self) -> CorrelationToken {
        self.token
    }

    pub fn latch(&self) -> &CompletionLatch {
        &self.latch
    }

    pub fn unexpected_count(&self) -> usize {
        self.unexpected_count.load(Ordering::Acquire)
    }

    /// Most recent unrecognized reason code, if any arrived.
    pub fn last_unexpected_reason(&self) -> Option<i32> {
        match self.last_unexpected.load(Ordering::Acquire) {
            NO_REASON => None,
            reason => Some(reason),
        }
    }

    /// Detach the accumulated output. Later chunks for this session are
    /// discarded.
    pub fn take_output(&self) -> Result<Vec<T>, AdapterError> {
        let mut slot = self
            .accumulator
            .lock()
            .map_err(|_| AdapterError::LockPoisoned {
                component: "job_accumulator".to_string(),
            })?;
        slot.take()
            .map(Accumulator::into_inner)
            .ok_or(AdapterError::OutputUnavailable { kind: T::KIND })
    }

    fn drain_available(&self, job: JobId) -> Option<DrainStats> {
        let mut slot = match self.accumulator.lock() {
            Ok(slot) => slot,
            Err(_) => {
                tracing::error!(
                    "[JobSession] Accumulator poisoned for {} (job {}); skipping drain",
                    self.token,
                    job
                );
                return None;
            }
        };
        let Some(accumulator) = slot.as_mut() else {
            tracing::warn!(
                "[JobSession] Notification for {} (job {}) after output was detached",
                self.token,
                job
            );
            return None;
        };

        let mut scratch = vec![T::default(); self.scratch_capacity];
        let engine = self.engine.as_ref();
        let stats = drain(
            &mut scratch,
            |buf| T::fetch(engine, job, buf),
            |chunk| accumulator.append(chunk),
        );
        drop(slot);

        tracing::debug!(
            "[JobSession] {} job {} drained {} chunks / {} units ({:?})",
            self.token,
            job,
            stats.chunks,
            stats.units,
            stats.stop
        );
        self.telemetry.publish(JobEvent::ChunksDrained {
            token: self.token.raw(),
            job_id: job.0,
            chunks: stats.chunks,
            units: stats.units,
        });
        Some(stats)
    }
}

impl<T: Chunk> JobListener for JobSession<T> {
    fn kind(&self) -> JobKind {
        T::KIND
    }

    fn on_chunk(&self, job: JobId, _reason: ChunkReason) {
        self.drain_available(job);
    }

    fn on_closed(&self, job: JobId) {
        self.drain_available(job);
        if !self.latch.signal() {
            tracing::error!(
                "[JobSession] Stream closed twice for {} (job {})",
                self.token,
                job
            );
        }
    }

    fn on_unexpected(&self, job: JobId, raw_reason: i32) {
        self.unexpected_count.fetch_add(1, Ordering::AcqRel);
        self.last_unexpected.store(raw_reason, Ordering::Release);
        tracing::warn!(
            "[JobSession] Unexpected callback reason 0x{:X} for {} {} job {}; not draining",
            raw_reason,
            T::KIND,
            self.token,
            job
        );
        self.telemetry.publish(JobEvent::UnexpectedReason {
            token: self.token.raw(),
            job_id: job.0,
            reason: raw_reason,
        });
    }
}
