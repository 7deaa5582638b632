//! Synchronous request adapter over the callback-driven engine.
//!
//! Each call registers a fresh [`JobSession`] under a new correlation token,
//! begins the engine job, blocks on the session latch, closes the job and
//! hands back the complete buffer. A failed request never yields a partial
//! buffer.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::{DrainConfig, RequestConfig};
use crate::engine::{Engine, JobId, JobKind};
use crate::error::{log_adapter_error, AdapterError};
use crate::session::{Chunk, CorrelationToken, JobSession};
use crate::telemetry::{JobEvent, TelemetryCollector};

/// Output of one completed request.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutput {
    Text(Vec<u8>),
    Audio(Vec<i16>),
}

impl JobOutput {
    pub fn kind(&self) -> JobKind {
        match self {
            JobOutput::Text(_) => JobKind::TextToIntermediate,
            JobOutput::Audio(_) => JobKind::IntermediateToAudio,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            JobOutput::Text(bytes) => bytes.len(),
            JobOutput::Audio(samples) => samples.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct RequestAdapter {
    engine: Arc<dyn Engine>,
    request: RequestConfig,
    drain: DrainConfig,
    telemetry: TelemetryCollector,
    job_gate: Mutex<()>,
}

impl RequestAdapter {
    pub fn new(
        engine: Arc<dyn Engine>,
        request: RequestConfig,
        drain: DrainConfig,
        telemetry: TelemetryCollector,
    ) -> Self {
        Self {
            engine,
            request,
            drain,
            telemetry,
            job_gate: Mutex::new(()),
        }
    }

    pub fn engine(&self) -> &Arc<dyn Engine> {
        &self.engine
    }

    pub fn telemetry(&self) -> &TelemetryCollector {
        &self.telemetry
    }

    pub fn process(&self, kind: JobKind, input: &[u8]) -> Result<JobOutput, AdapterError> {
        match kind {
            JobKind::TextToIntermediate => self.text_to_intermediate(input).map(JobOutput::Text),
            JobKind::IntermediateToAudio => {
                self.intermediate_to_audio(input).map(JobOutput::Audio)
            }
        }
    }

    /// Convert plain text to intermediate phonetic notation.
    pub fn text_to_intermediate(&self, input: &[u8]) -> Result<Vec<u8>, AdapterError> {
        self.run::<u8>(input)
    }

    /// Synthesize 16-bit PCM samples from intermediate notation.
    pub fn intermediate_to_audio(&self, input: &[u8]) -> Result<Vec<i16>, AdapterError> {
        self.run::<i16>(input)
    }

    fn run<T: Chunk>(&self, input: &[u8]) -> Result<Vec<T>, AdapterError> {
        let result = self.run_job::<T>(input);
        if let Err(err) = &result {
            log_adapter_error(err, "RequestAdapter::process");
        }
        result
    }

    fn run_job<T: Chunk>(&self, input: &[u8]) -> Result<Vec<T>, AdapterError> {
        let kind = T::KIND;
        let _gate = if self.request.serialize_jobs {
            Some(self.job_gate.lock().map_err(|_| AdapterError::LockPoisoned {
                component: "request_gate".to_string(),
            })?)
        } else {
            None
        };

        let token = CorrelationToken::next();
        let session = Arc::new(JobSession::<T>::new(
            token,
            Arc::clone(&self.engine),
            T::scratch_capacity(&self.drain),
            self.telemetry.clone(),
        ));
        let registration = self.engine.sessions().register(token, session.clone())?;

        let job = match self.engine.begin_job(kind, token, input) {
            Ok(job) => job,
            Err(code) => {
                drop(registration);
                self.telemetry.publish(JobEvent::SubmissionRejected {
                    token: token.raw(),
                    kind,
                    code,
                });
                return Err(AdapterError::SubmissionFailed { kind, code });
            }
        };
        tracing::debug!(
            "[RequestAdapter] {} submitted as {} job {} ({} input bytes)",
            token,
            kind,
            job,
            input.len()
        );
        self.telemetry.publish(JobEvent::Submitted {
            token: token.raw(),
            kind,
            job_id: job.0,
            input_len: input.len(),
        });

        match self.request.wait_timeout() {
            None => session.latch().wait()?,
            Some(timeout) => {
                if !session.latch().wait_timeout(timeout)? {
                    drop(registration);
                    return Err(self.abandon(&session, job, timeout));
                }
            }
        }
        drop(registration);

        let status = self.engine.close_job(kind, job);
        if let Err(code) = status.check() {
            self.telemetry.publish(JobEvent::FinalizationFailed {
                token: token.raw(),
                kind,
                code,
            });
            return Err(AdapterError::FinalizationFailed { kind, code });
        }

        let output = session.take_output()?;
        self.telemetry.publish(JobEvent::Closed {
            token: token.raw(),
            kind,
            total_units: output.len(),
        });
        Ok(output)
    }

    // Registration is already gone, so nothing the engine sends from here on
    // can reach the session.
    fn abandon<T: Chunk>(
        &self,
        session: &JobSession<T>,
        job: JobId,
        timeout: Duration,
    ) -> AdapterError {
        let kind = T::KIND;
        let timeout_ms = timeout.as_millis() as u64;
        let status = self.engine.close_job(kind, job);
        if !status.is_success() {
            tracing::warn!(
                "[RequestAdapter] Best-effort close of abandoned {} job {} failed: {}",
                kind,
                job,
                status
            );
        }
        self.telemetry.publish(JobEvent::WaitTimedOut {
            token: session.token().raw(),
            kind,
            timeout_ms,
        });

        match session.last_unexpected_reason() {
            Some(reason) => AdapterError::UnexpectedCallbackReason { kind, reason },
            None => AdapterError::WaitTimedOut { kind, timeout_ms },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::backend::{Call, Delivery, JobScript};
    use crate::engine::{SimulatedEngine, Status};

    fn adapter(engine: Arc<SimulatedEngine>, request: RequestConfig) -> RequestAdapter {
        RequestAdapter::new(
            engine,
            request,
            DrainConfig::default(),
            TelemetryCollector::new(64, 64),
        )
    }

    #[test]
    fn test_default_transform_round_trip() {
        let engine = Arc::new(SimulatedEngine::new());
        let adapter = adapter(engine.clone(), RequestConfig::default());

        let kana = adapter.text_to_intermediate(b"konnichiwa").unwrap();
        assert_eq!(kana, b"konnichiwa".to_vec());

        let audio = adapter.intermediate_to_audio(&[128, 129]).unwrap();
        assert_eq!(audio, vec![0, 256]);
        assert_eq!(engine.closed_jobs(), 2);
        assert_eq!(engine.open_jobs(), 0);
    }

    #[test]
    fn test_process_dispatches_on_kind() {
        let engine = Arc::new(SimulatedEngine::with_delivery(Delivery::Inline));
        let adapter = adapter(engine, RequestConfig::default());

        let out = adapter.process(JobKind::IntermediateToAudio, &[0]).unwrap();
        assert_eq!(out.kind(), JobKind::IntermediateToAudio);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_submission_failure_skips_wait_and_close() {
        let engine = Arc::new(SimulatedEngine::new());
        engine.fail_on(Call::BeginText, Status::JOB_BUSY);
        let adapter = adapter(engine.clone(), RequestConfig::default());

        let err = adapter.text_to_intermediate(b"x").unwrap_err();
        assert_eq!(
            err,
            AdapterError::SubmissionFailed {
                kind: JobKind::TextToIntermediate,
                code: Status::JOB_BUSY
            }
        );
        assert!(engine.sessions().is_empty());
        assert_eq!(engine.call_count(Call::CloseText), 0);
    }

    #[test]
    fn test_timeout_reports_unexpected_reason_when_seen() {
        let engine = Arc::new(SimulatedEngine::new());
        engine.push_script(
            JobScript::text(b"ab".to_vec())
                .with_unexpected(0x12D)
                .without_close(),
        );
        let adapter = adapter(
            engine.clone(),
            RequestConfig {
                wait_timeout_ms: Some(50),
                serialize_jobs: false,
            },
        );

        let err = adapter.text_to_intermediate(b"ab").unwrap_err();
        assert_eq!(
            err,
            AdapterError::UnexpectedCallbackReason {
                kind: JobKind::TextToIntermediate,
                reason: 0x12D
            }
        );
        assert!(engine.sessions().is_empty());
        assert_eq!(engine.open_jobs(), 0);
    }
}
