use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use crate::engine::{abi, EngineConfig, JobId, JobKind, Status, TtsParams};
use crate::session::{ChunkReason, CorrelationToken, SessionRegistry};

use super::Engine;

/// Entry points whose status can be overridden with [`SimulatedEngine::fail_on`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Call {
    Init,
    End,
    LangLoad,
    VoiceLoad,
    VoiceClear,
    ProbeParamSize,
    GetParam,
    SetParam,
    BeginText,
    BeginAudio,
    CloseText,
    CloseAudio,
}

/// Thread on which job notifications are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Synchronously inside `begin_job`, before it returns the job id
    Inline,
    /// On a freshly spawned engine thread
    Threaded,
}

/// Output a scripted job streams back.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(Vec<u8>),
    Audio(Vec<i16>),
}

impl Payload {
    pub fn kind(&self) -> JobKind {
        match self {
            Payload::Text(_) => JobKind::TextToIntermediate,
            Payload::Audio(_) => JobKind::IntermediateToAudio,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Payload::Text(bytes) => bytes.len(),
            Payload::Audio(samples) => samples.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Output the simulated engine produces when no script is queued: text
    /// jobs echo their input, audio jobs widen each byte into one sample.
    pub fn from_input(kind: JobKind, input: &[u8]) -> Self {
        match kind {
            JobKind::TextToIntermediate => Payload::Text(input.to_vec()),
            JobKind::IntermediateToAudio => Payload::Audio(
                input
                    .iter()
                    .map(|byte| (i16::from(*byte) - 128) << 8)
                    .collect(),
            ),
        }
    }
}

/// Scripted behaviour for the next submitted job.
#[derive(Debug, Clone)]
pub struct JobScript {
    payload: Payload,
    notifications: Vec<usize>,
    unexpected_reasons: Vec<i32>,
    close: bool,
    notification_delay: Duration,
    fetch_delay: Duration,
}

impl JobScript {
    pub fn new(payload: Payload) -> Self {
        let len = payload.len();
        Self {
            payload,
            notifications: if len == 0 { Vec::new() } else { vec![len] },
            unexpected_reasons: Vec::new(),
            close: true,
            notification_delay: Duration::ZERO,
            fetch_delay: Duration::ZERO,
        }
    }

    pub fn text(bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(Payload::Text(bytes.into()))
    }

    pub fn audio(samples: impl Into<Vec<i16>>) -> Self {
        Self::new(Payload::Audio(samples.into()))
    }

    /// Units made available per data notification, in order. Units left over
    /// are released with the closing notification.
    pub fn notify(mut self, sizes: impl Into<Vec<usize>>) -> Self {
        self.notifications = sizes.into();
        self
    }

    /// Send `reason` before any data notification.
    pub fn with_unexpected(mut self, reason: i32) -> Self {
        self.unexpected_reasons.push(reason);
        self
    }

    /// Never send the stream-closed notification.
    pub fn without_close(mut self) -> Self {
        self.close = false;
        self
    }

    pub fn notification_delay(mut self, delay: Duration) -> Self {
        self.notification_delay = delay;
        self
    }

    /// Stall every fetch, stretching each drain pass.
    pub fn fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }
}

struct SimJob {
    payload: Payload,
    released: usize,
    cursor: usize,
    fetch_delay: Duration,
}

impl SimJob {
    fn available(&self) -> usize {
        self.released - self.cursor
    }
}

type JobTable = Arc<Mutex<HashMap<JobId, SimJob>>>;

struct Step {
    release: usize,
    reason: i32,
}

/// In-process engine used for deterministic testing and CLI tooling.
///
/// Jobs stream their payload through the same callback protocol as the native
/// library: each notification makes more units available and then invokes
/// the session through the registry; sessions pull with `fetch_*`.
pub struct SimulatedEngine {
    registry: Arc<SessionRegistry>,
    jobs: JobTable,
    next_job: AtomicI32,
    scripts: Mutex<VecDeque<JobScript>>,
    failures: Mutex<HashMap<Call, Status>>,
    calls: Mutex<Vec<Call>>,
    params: Mutex<Option<TtsParams>>,
    closed_jobs: AtomicUsize,
    peak_open_jobs: AtomicUsize,
    delivery: Delivery,
    default_notification_units: usize,
}

impl SimulatedEngine {
    pub fn new() -> Self {
        Self::with_delivery(Delivery::Threaded)
    }

    pub fn with_delivery(delivery: Delivery) -> Self {
        Self {
            registry: Arc::new(SessionRegistry::new()),
            jobs: Arc::new(Mutex::new(HashMap::new())),
            next_job: AtomicI32::new(1),
            scripts: Mutex::new(VecDeque::new()),
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            params: Mutex::new(None),
            closed_jobs: AtomicUsize::new(0),
            peak_open_jobs: AtomicUsize::new(0),
            delivery,
            default_notification_units: 4096,
        }
    }

    /// Units per notification for jobs without a queued script.
    pub fn with_default_notification_units(mut self, units: usize) -> Self {
        self.default_notification_units = units.max(1);
        self
    }

    /// Queue the behaviour of the next submitted job.
    pub fn push_script(&self, script: JobScript) {
        lock(&self.scripts).push_back(script);
    }

    /// Make every later `call` answer `status`.
    pub fn fail_on(&self, call: Call, status: Status) {
        lock(&self.failures).insert(call, status);
    }

    pub fn clear_failures(&self) {
        lock(&self.failures).clear();
    }

    pub fn calls(&self) -> Vec<Call> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self, call: Call) -> usize {
        lock(&self.calls).iter().filter(|c| **c == call).count()
    }

    pub fn open_jobs(&self) -> usize {
        lock(&self.jobs).len()
    }

    pub fn closed_jobs(&self) -> usize {
        self.closed_jobs.load(Ordering::SeqCst)
    }

    /// Largest number of jobs that were open at the same time.
    pub fn peak_open_jobs(&self) -> usize {
        self.peak_open_jobs.load(Ordering::SeqCst)
    }

    /// Parameter block last written with `set_param`.
    pub fn applied_params(&self) -> Option<TtsParams> {
        lock(&self.params).clone()
    }

    /// Open a job that never notifies on its own; drive it with
    /// [`SimulatedEngine::release_units`] and direct listener calls.
    pub fn open_manual_job(&self, kind: JobKind, payload: Payload) -> JobId {
        debug_assert_eq!(kind, payload.kind());
        let job = self.allocate_job_id();
        self.insert_job(
            job,
            SimJob {
                payload,
                released: 0,
                cursor: 0,
                fetch_delay: Duration::ZERO,
            },
        );
        job
    }

    /// Make `units` more output units fetchable for `job`.
    pub fn release_units(&self, job: JobId, units: usize) {
        release(&self.jobs, job, units);
    }

    fn allocate_job_id(&self) -> JobId {
        JobId(self.next_job.fetch_add(1, Ordering::SeqCst))
    }

    fn insert_job(&self, job: JobId, sim: SimJob) {
        let mut jobs = lock(&self.jobs);
        jobs.insert(job, sim);
        self.peak_open_jobs.fetch_max(jobs.len(), Ordering::SeqCst);
    }

    fn record(&self, call: Call) -> Option<Status> {
        lock(&self.calls).push(call);
        lock(&self.failures).get(&call).copied()
    }

    fn plan(&self, script: &JobScript, kind: JobKind) -> Vec<Step> {
        let mut steps: Vec<Step> = script
            .unexpected_reasons
            .iter()
            .map(|reason| Step {
                release: 0,
                reason: *reason,
            })
            .collect();

        let last = script.notifications.len().saturating_sub(1);
        for (index, units) in script.notifications.iter().enumerate() {
            let reason = if index == last {
                ChunkReason::BufferFlushed
            } else {
                ChunkReason::MoreDataPending
            };
            steps.push(Step {
                release: *units,
                reason: reason.raw_code(kind),
            });
        }

        if script.close {
            steps.push(Step {
                release: script.payload.len(),
                reason: ChunkReason::StreamClosed.raw_code(kind),
            });
        }
        steps
    }

    fn default_script(&self, kind: JobKind, input: &[u8]) -> JobScript {
        let payload = Payload::from_input(kind, input);
        let mut sizes = Vec::new();
        let mut remaining = payload.len();
        while remaining > 0 {
            let units = remaining.min(self.default_notification_units);
            sizes.push(units);
            remaining -= units;
        }
        JobScript::new(payload).notify(sizes)
    }
}

impl Default for SimulatedEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for SimulatedEngine {
    fn init(&self, _config: &EngineConfig) -> Status {
        self.record(Call::Init).unwrap_or(Status::SUCCESS)
    }

    fn end(&self) -> Status {
        self.record(Call::End).unwrap_or(Status::SUCCESS)
    }

    fn lang_load(&self, _language_dir: &Path) -> Status {
        self.record(Call::LangLoad).unwrap_or(Status::SUCCESS)
    }

    fn voice_load(&self, _voice_name: &str) -> Status {
        self.record(Call::VoiceLoad).unwrap_or(Status::SUCCESS)
    }

    fn voice_clear(&self) -> Status {
        self.record(Call::VoiceClear).unwrap_or(Status::SUCCESS)
    }

    fn probe_param_size(&self) -> (Status, u32) {
        let size = std::mem::size_of::<abi::TTtsParam>() as u32;
        (
            self.record(Call::ProbeParamSize)
                .unwrap_or(Status::INSUFFICIENT),
            size,
        )
    }

    fn get_param(&self, size: u32) -> Result<TtsParams, Status> {
        if let Some(status) = self.record(Call::GetParam) {
            status.check()?;
        }
        let current = lock(&self.params).clone();
        Ok(current.unwrap_or(TtsParams {
            size,
            ..TtsParams::default()
        }))
    }

    fn set_param(&self, params: &TtsParams) -> Status {
        if let Some(status) = self.record(Call::SetParam) {
            return status;
        }
        *lock(&self.params) = Some(params.clone());
        Status::SUCCESS
    }

    fn begin_job(
        &self,
        kind: JobKind,
        token: CorrelationToken,
        input: &[u8],
    ) -> Result<JobId, Status> {
        let call = match kind {
            JobKind::TextToIntermediate => Call::BeginText,
            JobKind::IntermediateToAudio => Call::BeginAudio,
        };
        if let Some(status) = self.record(call) {
            status.check()?;
        }

        let script = lock(&self.scripts)
            .pop_front()
            .unwrap_or_else(|| self.default_script(kind, input));
        if script.payload.kind() != kind {
            return Err(Status::INVALID_ARGUMENT);
        }

        let steps = self.plan(&script, kind);
        let job = self.allocate_job_id();
        self.insert_job(
            job,
            SimJob {
                payload: script.payload,
                released: 0,
                cursor: 0,
                fetch_delay: script.fetch_delay,
            },
        );

        let registry = Arc::clone(&self.registry);
        let jobs = Arc::clone(&self.jobs);
        let delay = script.notification_delay;
        match self.delivery {
            Delivery::Inline => deliver(&registry, &jobs, token, job, steps, delay),
            Delivery::Threaded => {
                thread::spawn(move || deliver(&registry, &jobs, token, job, steps, delay));
            }
        }

        Ok(job)
    }

    fn fetch_text(&self, job: JobId, buf: &mut [u8]) -> Result<usize, Status> {
        let capacity = buf.len();
        fetch(&self.jobs, job, |payload, start, n| match payload {
            Payload::Text(bytes) => {
                buf[..n].copy_from_slice(&bytes[start..start + n]);
                Ok(())
            }
            Payload::Audio(_) => Err(Status::INVALID_ARGUMENT),
        }, capacity)
    }

    fn fetch_audio(&self, job: JobId, buf: &mut [i16]) -> Result<usize, Status> {
        let capacity = buf.len();
        fetch(&self.jobs, job, |payload, start, n| match payload {
            Payload::Audio(samples) => {
                buf[..n].copy_from_slice(&samples[start..start + n]);
                Ok(())
            }
            Payload::Text(_) => Err(Status::INVALID_ARGUMENT),
        }, capacity)
    }

    fn close_job(&self, kind: JobKind, job: JobId) -> Status {
        let call = match kind {
            JobKind::TextToIntermediate => Call::CloseText,
            JobKind::IntermediateToAudio => Call::CloseAudio,
        };
        let injected = self.record(call);
        if lock(&self.jobs).remove(&job).is_none() {
            return Status::INVALID_JOBID;
        }
        self.closed_jobs.fetch_add(1, Ordering::SeqCst);
        injected.unwrap_or(Status::SUCCESS)
    }

    fn sessions(&self) -> Arc<SessionRegistry> {
        Arc::clone(&self.registry)
    }
}

fn deliver(
    registry: &SessionRegistry,
    jobs: &JobTable,
    token: CorrelationToken,
    job: JobId,
    steps: Vec<Step>,
    delay: Duration,
) {
    for step in steps {
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        release(jobs, job, step.release);
        registry.dispatch(token, step.reason, job);
    }
}

fn release(jobs: &JobTable, job: JobId, units: usize) {
    if let Some(sim) = lock(jobs).get_mut(&job) {
        sim.released = (sim.released + units).min(sim.payload.len());
    }
}

fn fetch<F>(jobs: &JobTable, job: JobId, copy: F, capacity: usize) -> Result<usize, Status>
where
    F: FnOnce(&Payload, usize, usize) -> Result<(), Status>,
{
    let delay = lock(jobs)
        .get(&job)
        .map(|sim| sim.fetch_delay)
        .ok_or(Status::INVALID_JOBID)?;
    if !delay.is_zero() {
        thread::sleep(delay);
    }

    let mut table = lock(jobs);
    let sim = table.get_mut(&job).ok_or(Status::INVALID_JOBID)?;
    let n = sim.available().min(capacity);
    if n == 0 {
        return Err(Status::NOMORE_DATA);
    }
    copy(&sim.payload, sim.cursor, n)?;
    sim.cursor += n;
    Ok(n)
}

// Simulator bookkeeping stays usable after a panicking test thread.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
