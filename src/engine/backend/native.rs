//! Engine backed by the vendor library's resolved entry points.
//!
//! Callbacks arrive on engine-owned threads through the `extern "system"`
//! trampolines below. The engine only ever hands back the integer user data
//! we gave it, which is decoded into a [`CorrelationToken`] and looked up in
//! the process-wide registry. No pointer is ever dereferenced from it.

use std::ffi::CString;
use std::os::raw::{c_char, c_void};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::engine::abi::{self, EngineSymbols, TConfig, TJobParam, TTtsParam};
use crate::engine::{EngineConfig, JobId, JobKind, Status, TtsParams};
use crate::session::{CorrelationToken, SessionRegistry};

use super::Engine;

// The engine allows a single callback table per process, so every native
// engine shares one registry.
static NATIVE_SESSIONS: Lazy<Arc<SessionRegistry>> =
    Lazy::new(|| Arc::new(SessionRegistry::new()));

/// Engine whose calls go straight to vendor entry points.
pub struct NativeEngine {
    symbols: EngineSymbols,
}

impl NativeEngine {
    /// Wrap already-resolved entry points.
    ///
    /// # Safety
    ///
    /// Every pointer in `symbols` must be a live function of the matching
    /// vendor signature for as long as the returned engine exists.
    pub unsafe fn from_symbols(symbols: EngineSymbols) -> Self {
        Self { symbols }
    }
}

fn c_string(value: &str) -> Result<CString, Status> {
    CString::new(value).map_err(|_| Status::INVALID_ARGUMENT)
}

fn c_path(path: &Path) -> Result<CString, Status> {
    path.to_str().ok_or(Status::INVALID_ARGUMENT).and_then(c_string)
}

fn param_block_len(size: u32) -> usize {
    (size as usize).max(std::mem::size_of::<TTtsParam>())
}

impl Engine for NativeEngine {
    fn init(&self, config: &EngineConfig) -> Status {
        let (voice_dir, license, seed) = match (
            c_path(&config.voice_dir),
            c_path(&config.license_path),
            c_string(&config.auth_seed),
        ) {
            (Ok(voice_dir), Ok(license), Ok(seed)) => (voice_dir, license, seed),
            _ => return Status::INVALID_ARGUMENT,
        };
        let mut raw = TConfig {
            hzVoiceDB: config.frequency,
            dirVoiceDBS: voice_dir.as_ptr(),
            msecTimeout: config.msec_timeout,
            pathLicense: license.as_ptr(),
            codeAuthSeed: seed.as_ptr(),
            lenAuthSeed: 0,
        };
        // SAFETY: every string outlives the call; the engine copies them.
        Status(unsafe { (self.symbols.init)(&mut raw) })
    }

    fn end(&self) -> Status {
        // SAFETY: no arguments.
        Status(unsafe { (self.symbols.end)() })
    }

    fn lang_load(&self, language_dir: &Path) -> Status {
        match c_path(language_dir) {
            // SAFETY: NUL-terminated and alive for the call.
            Ok(dir) => Status(unsafe { (self.symbols.lang_load)(dir.as_ptr()) }),
            Err(status) => status,
        }
    }

    fn voice_load(&self, voice_name: &str) -> Status {
        match c_string(voice_name) {
            // SAFETY: NUL-terminated and alive for the call.
            Ok(name) => Status(unsafe { (self.symbols.voice_load)(name.as_ptr()) }),
            Err(status) => status,
        }
    }

    fn voice_clear(&self) -> Status {
        // SAFETY: no arguments.
        Status(unsafe { (self.symbols.voice_clear)() })
    }

    fn probe_param_size(&self) -> (Status, u32) {
        let mut size = 0u32;
        // SAFETY: a null block asks only for the required size.
        let status = unsafe { (self.symbols.get_param)(std::ptr::null_mut(), &mut size) };
        (Status(status), size)
    }

    fn get_param(&self, size: u32) -> Result<TtsParams, Status> {
        let mut block = vec![0u8; param_block_len(size)];
        let mut reported = size;
        // SAFETY: `block` is at least `size` bytes and at least one
        // TTtsParam long; unaligned access is used throughout.
        unsafe {
            std::ptr::write_unaligned(block.as_mut_ptr() as *mut u32, size);
            Status((self.symbols.get_param)(
                block.as_mut_ptr() as *mut c_void,
                &mut reported,
            ))
            .check()?;
        }
        // SAFETY: see above.
        let param = unsafe { std::ptr::read_unaligned(block.as_ptr() as *const TTtsParam) };
        let speakers = param.speaker;

        Ok(TtsParams {
            size,
            volume: param.volume,
            len_text_buf_bytes: param.lenTextBufBytes,
            len_raw_buf_bytes: param.lenRawBufBytes,
            extend_format: param.extendFormat,
            speaker_volume: speakers[0].volume,
            raw: block,
        })
    }

    fn set_param(&self, params: &TtsParams) -> Status {
        let mut block = params.raw.clone();
        block.resize(param_block_len(params.size), 0);

        // SAFETY: `block` holds at least one TTtsParam.
        let mut param = unsafe { std::ptr::read_unaligned(block.as_ptr() as *const TTtsParam) };
        param.size = params.size;
        param.procTextBuf = Some(text_trampoline);
        param.procRawBuf = Some(raw_trampoline);
        param.procEventTts = Some(event_trampoline);
        param.volume = params.volume;
        param.lenTextBufBytes = params.len_text_buf_bytes;
        param.lenRawBufBytes = params.len_raw_buf_bytes;
        param.extendFormat = params.extend_format;
        let mut speakers = param.speaker;
        speakers[0].volume = params.speaker_volume;
        param.speaker = speakers;

        // SAFETY: same block as above; the engine copies it during the call.
        unsafe {
            std::ptr::write_unaligned(block.as_mut_ptr() as *mut TTtsParam, param);
            Status((self.symbols.set_param)(block.as_mut_ptr() as *mut c_void))
        }
    }

    fn begin_job(
        &self,
        kind: JobKind,
        token: CorrelationToken,
        input: &[u8],
    ) -> Result<JobId, Status> {
        let text = CString::new(input).map_err(|_| Status::INVALID_ARGUMENT)?;
        let mut param = TJobParam {
            modeInOut: match kind {
                JobKind::TextToIntermediate => abi::IOMODE_PLAIN_TO_AIKANA,
                JobKind::IntermediateToAudio => abi::IOMODE_AIKANA_TO_WAVE,
            },
            userData: token.as_user_data(),
        };
        let mut job = 0i32;
        // SAFETY: `text` is NUL-terminated and outlives the call; the user
        // data is an opaque integer the trampolines decode without
        // dereferencing.
        let status = unsafe {
            match kind {
                JobKind::TextToIntermediate => {
                    (self.symbols.text_to_kana)(&mut job, &mut param, text.as_ptr())
                }
                JobKind::IntermediateToAudio => {
                    (self.symbols.text_to_speech)(&mut job, &mut param, text.as_ptr())
                }
            }
        };
        Status(status).check()?;
        Ok(JobId(job))
    }

    fn fetch_text(&self, job: JobId, buf: &mut [u8]) -> Result<usize, Status> {
        let (mut size, mut pos) = (0u32, 0u32);
        // SAFETY: the engine writes at most `buf.len()` bytes.
        let status = unsafe {
            (self.symbols.get_kana)(
                job.0,
                buf.as_mut_ptr() as *mut c_char,
                buf.len() as u32,
                &mut size,
                &mut pos,
            )
        };
        Status(status).check()?;
        Ok(size as usize)
    }

    fn fetch_audio(&self, job: JobId, buf: &mut [i16]) -> Result<usize, Status> {
        let mut size = 0u32;
        // SAFETY: the engine writes at most `buf.len()` samples.
        let status = unsafe {
            (self.symbols.get_data)(job.0, buf.as_mut_ptr(), buf.len() as u32, &mut size)
        };
        Status(status).check()?;
        Ok(size as usize)
    }

    fn close_job(&self, kind: JobKind, job: JobId) -> Status {
        // SAFETY: plain integers.
        let status = unsafe {
            match kind {
                JobKind::TextToIntermediate => (self.symbols.close_kana)(job.0, 0),
                JobKind::IntermediateToAudio => (self.symbols.close_speech)(job.0, 0),
            }
        };
        Status(status)
    }

    fn sessions(&self) -> Arc<SessionRegistry> {
        Arc::clone(&NATIVE_SESSIONS)
    }
}

fn route(reason: i32, job_id: i32, user_data: *mut c_void) {
    let token = CorrelationToken::from_user_data(user_data);
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        NATIVE_SESSIONS.dispatch(token, reason, JobId(job_id));
    }));
    if outcome.is_err() {
        // unwinding across the engine's frames is undefined behaviour
        tracing::error!(
            "[NativeEngine] Callback for {} (job {}, reason 0x{:X}) panicked",
            token,
            job_id,
            reason
        );
    }
}

extern "system" fn text_trampoline(reason_code: i32, job_id: i32, user_data: *mut c_void) -> i32 {
    route(reason_code, job_id, user_data);
    0
}

extern "system" fn raw_trampoline(
    reason_code: i32,
    job_id: i32,
    _tick: u64,
    user_data: *mut c_void,
) -> i32 {
    route(reason_code, job_id, user_data);
    0
}

extern "system" fn event_trampoline(
    _reason_code: i32,
    _job_id: i32,
    _tick: u64,
    _name: *const c_char,
    _user_data: *mut c_void,
) -> i32 {
    0
}
