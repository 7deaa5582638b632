//! Engine initialization and the caller-facing conversion operations.
//!
//! A [`Synthesizer`] owns one fully configured engine for its lifetime and
//! is the explicit context every request goes through.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::adapter::RequestAdapter;
use crate::config::AppConfig;
use crate::engine::{abi, Engine, EngineConfig, Status};
use crate::error::{log_setup_error, AdapterError, ProbeStage, SetupError};
use crate::settings::{sanitize_volume, Settings, SettingsBuilder};
use crate::telemetry::TelemetryCollector;
use crate::wave::WaveObject;

// The working directory is process-wide.
static CWD_LOCK: Mutex<()> = Mutex::new(());

// Puts the previous working directory back if `f` unwinds.
struct RestoreDir {
    previous: Option<PathBuf>,
}

impl Drop for RestoreDir {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            if let Err(err) = env::set_current_dir(&previous) {
                tracing::error!(
                    "[Synthesizer] Failed to restore working directory {}: {}",
                    previous.display(),
                    err
                );
            }
        }
    }
}

/// Run `f` with the process working directory switched to `dir`, restoring
/// the previous directory afterwards, also when `f` panics.
pub fn with_directory<R, F>(dir: &Path, f: F) -> Result<R, SetupError>
where
    F: FnOnce() -> R,
{
    let _guard = CWD_LOCK
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let directory_error = |path: &Path, err: std::io::Error| SetupError::DirectoryChange {
        path: path.display().to_string(),
        details: err.to_string(),
    };

    let previous = env::current_dir().map_err(|err| directory_error(dir, err))?;
    env::set_current_dir(dir).map_err(|err| directory_error(dir, err))?;
    let mut restore = RestoreDir {
        previous: Some(previous),
    };
    let result = f();
    if let Some(previous) = restore.previous.take() {
        env::set_current_dir(&previous).map_err(|err| directory_error(&previous, err))?;
    }
    Ok(result)
}

/// Arguments of [`Synthesizer::create`].
#[derive(Debug, Clone, PartialEq)]
pub struct InitRequest {
    /// Install directory of the voice product
    pub base_dir: String,
    /// Voice library directory name, e.g. `yukari_44`
    pub voice: String,
    /// Output volume, 0.0 to 5.0; defaults to 2.2
    pub volume: Option<f32>,
}

pub struct Synthesizer {
    adapter: RequestAdapter,
    settings: Settings,
}

impl Synthesizer {
    pub fn create(
        engine: Arc<dyn Engine>,
        request: InitRequest,
        config: &AppConfig,
    ) -> Result<Self, SetupError> {
        Self::create_with_telemetry(engine, request, config, TelemetryCollector::default())
    }

    pub fn create_with_telemetry(
        engine: Arc<dyn Engine>,
        request: InitRequest,
        config: &AppConfig,
        telemetry: TelemetryCollector,
    ) -> Result<Self, SetupError> {
        let result = Self::initialize(engine.as_ref(), &request, config);
        let settings = match result {
            Ok(settings) => settings,
            Err(err) => {
                log_setup_error(&err, "Synthesizer::create");
                return Err(err);
            }
        };
        tracing::info!(
            "[Synthesizer] {} voice {} ready at {} Hz",
            settings.library,
            settings.voice_name,
            settings.frequency
        );

        Ok(Self {
            adapter: RequestAdapter::new(
                engine,
                config.request.clone(),
                config.drain.clone(),
                telemetry,
            ),
            settings,
        })
    }

    fn initialize(
        engine: &dyn Engine,
        request: &InitRequest,
        config: &AppConfig,
    ) -> Result<Settings, SetupError> {
        let volume = sanitize_volume(request.volume)?;
        let settings = SettingsBuilder::new(request.base_dir.clone(), request.voice.clone())
            .build()?;
        let auth_seed = settings.seed_slot.resolve(&config.auth_seeds)?;

        let engine_config = EngineConfig {
            frequency: settings.frequency,
            voice_dir: settings.voice_dir.clone(),
            msec_timeout: config.engine.msec_timeout,
            license_path: settings.license_path.clone(),
            auth_seed,
        };
        engine
            .init(&engine_config)
            .check()
            .map_err(|code| SetupError::InitFailed { code })?;

        if let Err(err) = Self::configure(engine, &settings, volume, config) {
            let status = engine.end();
            if !status.is_success() {
                tracing::warn!(
                    "[Synthesizer] Engine shutdown after failed setup returned {}",
                    status
                );
            }
            return Err(err);
        }
        Ok(settings)
    }

    fn configure(
        engine: &dyn Engine,
        settings: &Settings,
        volume: f32,
        config: &AppConfig,
    ) -> Result<(), SetupError> {
        let load_language = || engine.lang_load(&settings.language_dir);
        let status = if config.engine.enter_base_dir_for_language {
            with_directory(&settings.base_dir, load_language)?
        } else {
            load_language()
        };
        status
            .check()
            .map_err(|code| SetupError::LanguageLoadFailed { code })?;

        engine
            .voice_load(&settings.voice_name)
            .check()
            .map_err(|code| SetupError::VoiceLoadFailed { code })?;

        let (status, size) = engine.probe_param_size();
        status
            .expect(Status::INSUFFICIENT)
            .map_err(|code| SetupError::ProbeSizeMismatch {
                stage: ProbeStage::SizeQuery,
                code,
            })?;
        let mut params = engine
            .get_param(size)
            .map_err(|code| SetupError::ProbeSizeMismatch {
                stage: ProbeStage::Fetch,
                code,
            })?;

        params.volume = volume;
        params.len_raw_buf_bytes = config.engine.raw_buf_bytes;
        params.extend_format = abi::EXTEND_FORMAT_JEITA_RUBY;
        params.speaker_volume = 1.0;
        engine
            .set_param(&params)
            .check()
            .map_err(|code| SetupError::ParamSetFailed { code })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn adapter(&self) -> &RequestAdapter {
        &self.adapter
    }

    pub fn telemetry(&self) -> &TelemetryCollector {
        self.adapter.telemetry()
    }

    /// Plain text to intermediate phonetic notation.
    pub fn hiragana(&self, input: &[u8]) -> Result<Vec<u8>, AdapterError> {
        self.adapter.text_to_intermediate(input)
    }

    /// Intermediate notation to PCM at the voice's native rate.
    pub fn speech(&self, input: &[u8]) -> Result<WaveObject, AdapterError> {
        let samples = self.adapter.intermediate_to_audio(input)?;
        Ok(WaveObject::new(samples, self.settings.frequency))
    }

    /// Plain text straight to PCM, as two jobs in sequence.
    pub fn convert(&self, text: &[u8]) -> Result<WaveObject, AdapterError> {
        let kana = self.hiragana(text)?;
        self.speech(&kana)
    }
}

impl Drop for Synthesizer {
    fn drop(&mut self) {
        let engine = self.adapter.engine();
        let status = engine.voice_clear();
        if !status.is_success() {
            tracing::warn!("[Synthesizer] voice_clear returned {}", status);
        }
        let status = engine.end();
        if !status.is_success() {
            tracing::warn!("[Synthesizer] end returned {}", status);
        }
    }
}
