//! Backend abstractions for the external engine.

use std::path::Path;
use std::sync::Arc;

use crate::engine::{EngineConfig, JobId, JobKind, Status, TtsParams};
use crate::session::{CorrelationToken, SessionRegistry};

/// Capability set of the external engine.
///
/// Every call returns the engine's raw status; callers decide which codes are
/// acceptable at each call site. Implementations deliver partial-result
/// notifications by calling [`SessionRegistry::dispatch`] on the registry
/// returned from [`Engine::sessions`], from any thread, with the token passed
/// to [`Engine::begin_job`].
pub trait Engine: Send + Sync {
    fn init(&self, config: &EngineConfig) -> Status;
    fn end(&self) -> Status;
    fn lang_load(&self, language_dir: &Path) -> Status;
    fn voice_load(&self, voice_name: &str) -> Status;
    fn voice_clear(&self) -> Status;

    /// Zero-length parameter query. Answers INSUFFICIENT with the required size.
    fn probe_param_size(&self) -> (Status, u32);
    fn get_param(&self, size: u32) -> Result<TtsParams, Status>;
    fn set_param(&self, params: &TtsParams) -> Status;

    fn begin_job(
        &self,
        kind: JobKind,
        token: CorrelationToken,
        input: &[u8],
    ) -> Result<JobId, Status>;

    /// Copy currently available intermediate-notation bytes into `buf`.
    fn fetch_text(&self, job: JobId, buf: &mut [u8]) -> Result<usize, Status>;

    /// Copy currently available samples into `buf`.
    fn fetch_audio(&self, job: JobId, buf: &mut [i16]) -> Result<usize, Status>;

    fn close_job(&self, kind: JobKind, job: JobId) -> Status;

    /// Registry this engine routes its callbacks through.
    fn sessions(&self) -> Arc<SessionRegistry>;
}

mod native;
pub use native::NativeEngine;

mod simulated;
pub use simulated::{Call, Delivery, JobScript, Payload, SimulatedEngine};
