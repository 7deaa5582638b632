//! Engine module housing the capability boundary to the external engine.
//!
//! This module exposes the trait-based engine backends (`backend`), the raw
//! native ABI declarations (`abi`), and result-code translation (`status`).

pub mod abi;
pub mod backend;
pub mod status;

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use backend::{Engine, NativeEngine, SimulatedEngine};
pub use status::Status;

/// Which conversion a job performs.
///
/// The kind selects the begin/fetch/close entry points, the callback reason
/// family, and the element width of the streamed output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Plain text to the engine's intermediate phonetic notation (bytes)
    TextToIntermediate,
    /// Intermediate notation to 16-bit PCM samples
    IntermediateToAudio,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::TextToIntermediate => write!(f, "text-to-intermediate"),
            JobKind::IntermediateToAudio => write!(f, "intermediate-to-audio"),
        }
    }
}

/// Engine-assigned job identifier, valid from submission until close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub i32);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One-time initialization block handed to [`Engine::init`].
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Voice database sample rate in Hz
    pub frequency: u32,
    pub voice_dir: PathBuf,
    pub msec_timeout: u32,
    pub license_path: PathBuf,
    pub auth_seed: String,
}

/// Global synthesis parameters read with `get_param` and written back with
/// `set_param`.
///
/// `raw` carries the engine's own parameter block for native round-trips;
/// in-process engines leave it empty.
#[derive(Debug, Clone, PartialEq)]
pub struct TtsParams {
    pub size: u32,
    pub volume: f32,
    pub len_text_buf_bytes: u32,
    pub len_raw_buf_bytes: u32,
    pub extend_format: u32,
    pub speaker_volume: f32,
    pub raw: Vec<u8>,
}

impl Default for TtsParams {
    fn default() -> Self {
        Self {
            size: 0,
            volume: 1.0,
            len_text_buf_bytes: 0,
            len_raw_buf_bytes: abi::CONFIG_RAWBUF_SIZE,
            extend_format: abi::EXTEND_FORMAT_NONE,
            speaker_volume: 1.0,
            raw: Vec::new(),
        }
    }
}
