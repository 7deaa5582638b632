// Engine setup error types and constants

use crate::engine::Status;
use crate::error::ErrorCode;
use std::fmt;
use tracing::error;

/// Setup error code constants
///
/// Error code range: 4001-4011
pub struct SetupErrorCodes {}

impl SetupErrorCodes {
    pub const INIT_FAILED: i32 = 4001;
    pub const LANGUAGE_LOAD_FAILED: i32 = 4002;
    pub const VOICE_LOAD_FAILED: i32 = 4003;
    pub const PROBE_SIZE_MISMATCH: i32 = 4004;
    pub const PARAM_SET_FAILED: i32 = 4005;
    pub const UNSUPPORTED_VOICE: i32 = 4006;
    pub const UNKNOWN_VERSION: i32 = 4007;
    pub const NON_ASCII_PATH: i32 = 4008;
    pub const VOLUME_OUT_OF_RANGE: i32 = 4009;
    pub const DIRECTORY_CHANGE: i32 = 4010;
    pub const MISSING_AUTH_SEED: i32 = 4011;
}

/// Step of the two-call parameter retrieval that observed the wrong status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStage {
    /// Zero-length probe, which must answer INSUFFICIENT
    SizeQuery,
    /// Real fetch with the discovered size, which must answer SUCCESS
    Fetch,
}

impl fmt::Display for ProbeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeStage::SizeQuery => write!(f, "size query"),
            ProbeStage::Fetch => write!(f, "fetch"),
        }
    }
}

/// Log a setup error with structured context
pub fn log_setup_error(err: &SetupError, context: &str) {
    error!(
        "Setup error in {}: code={}, component=Synthesizer, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised while building settings or bringing the engine up
///
/// Error code ranges: 4001-4011
#[derive(Debug, Clone, PartialEq)]
pub enum SetupError {
    /// Engine initialization returned a non-success code
    InitFailed { code: Status },

    /// Language dictionary could not be loaded
    LanguageLoadFailed { code: Status },

    /// Voice database could not be loaded
    VoiceLoadFailed { code: Status },

    /// Parameter size probe or fetch answered with an unexpected status
    ProbeSizeMismatch { stage: ProbeStage, code: Status },

    /// Writing the patched parameter block failed
    ParamSetFailed { code: Status },

    /// VOICEROID+ voice without a known auth seed slot
    UnsupportedVoice { voice: String },

    /// Voice directory name does not reveal the library version
    UnknownVersion { voice: String },

    /// Install path contains non-ASCII characters
    NonAsciiPath { path: String },

    /// Volume outside 0.0..=5.0
    VolumeOutOfRange { volume: f32 },

    /// Working directory could not be switched or restored
    DirectoryChange { path: String, details: String },

    /// No seed configured for the required auth slot
    MissingAuthSeed { slot: String },
}

impl ErrorCode for SetupError {
    fn code(&self) -> i32 {
        match self {
            SetupError::InitFailed { .. } => SetupErrorCodes::INIT_FAILED,
            SetupError::LanguageLoadFailed { .. } => SetupErrorCodes::LANGUAGE_LOAD_FAILED,
            SetupError::VoiceLoadFailed { .. } => SetupErrorCodes::VOICE_LOAD_FAILED,
            SetupError::ProbeSizeMismatch { .. } => SetupErrorCodes::PROBE_SIZE_MISMATCH,
            SetupError::ParamSetFailed { .. } => SetupErrorCodes::PARAM_SET_FAILED,
            SetupError::UnsupportedVoice { .. } => SetupErrorCodes::UNSUPPORTED_VOICE,
            SetupError::UnknownVersion { .. } => SetupErrorCodes::UNKNOWN_VERSION,
            SetupError::NonAsciiPath { .. } => SetupErrorCodes::NON_ASCII_PATH,
            SetupError::VolumeOutOfRange { .. } => SetupErrorCodes::VOLUME_OUT_OF_RANGE,
            SetupError::DirectoryChange { .. } => SetupErrorCodes::DIRECTORY_CHANGE,
            SetupError::MissingAuthSeed { .. } => SetupErrorCodes::MISSING_AUTH_SEED,
        }
    }

    fn message(&self) -> String {
        match self {
            SetupError::InitFailed { code } => {
                format!("API initialization failed with {}", code)
            }
            SetupError::LanguageLoadFailed { code } => {
                format!("Could not load language with {}", code)
            }
            SetupError::VoiceLoadFailed { code } => {
                format!("Could not load voice data with {}", code)
            }
            SetupError::ProbeSizeMismatch { stage, code } => {
                format!("Parameter {} answered unexpected {}", stage, code)
            }
            SetupError::ParamSetFailed { code } => {
                format!("Could not apply parameters with {}", code)
            }
            SetupError::UnsupportedVoice { voice } => {
                format!("Unsupported VOICEROID+ library '{}'", voice)
            }
            SetupError::UnknownVersion { voice } => {
                format!(
                    "Could not infer library version from '{}' (expected a _22 or _44 suffix)",
                    voice
                )
            }
            SetupError::NonAsciiPath { path } => {
                format!("Install path may not contain non-ASCII characters: {}", path)
            }
            SetupError::VolumeOutOfRange { volume } => {
                format!("Volume should range from 0.0 to 5.0 (got {})", volume)
            }
            SetupError::DirectoryChange { path, details } => {
                format!("Could not change directory to {}: {}", path, details)
            }
            SetupError::MissingAuthSeed { slot } => {
                format!("No auth seed configured for slot {}", slot)
            }
        }
    }
}

impl fmt::Display for SetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SetupError (code {}): {}", self.code(), self.message())
    }
}

impl std::error::Error for SetupError {}
