//! Install-path and voice settings for one engine instance.
//!
//! The engine is a Windows library, so every derived path is joined with a
//! backslash regardless of the host platform.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::SetupError;

const WIN_DELIMITER: char = '\\';
const DLL_FILENAME: &str = "aitalked.dll";
const LICENSE_FILENAME: &str = "aitalk.lic";

pub const DEFAULT_VOLUME: f32 = 2.2;
pub const MIN_VOLUME: f32 = 0.0;
pub const MAX_VOLUME: f32 = 5.0;

/// Engine generation, inferred from the voice directory suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoiceLibrary {
    /// VOICEROID+ (`*_22`, 22.05 kHz)
    Plus,
    /// VOICEROID2 (`*_44`, 44.1 kHz)
    Two,
}

impl VoiceLibrary {
    pub fn detect(voice: &str) -> Result<Self, SetupError> {
        if voice.ends_with("_22") {
            Ok(VoiceLibrary::Plus)
        } else if voice.ends_with("_44") {
            Ok(VoiceLibrary::Two)
        } else {
            Err(SetupError::UnknownVersion {
                voice: voice.to_string(),
            })
        }
    }

    pub fn sample_rate(self) -> u32 {
        match self {
            VoiceLibrary::Plus => 22050,
            VoiceLibrary::Two => 44100,
        }
    }
}

impl fmt::Display for VoiceLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoiceLibrary::Plus => write!(f, "VOICEROID+"),
            VoiceLibrary::Two => write!(f, "VOICEROID2"),
        }
    }
}

/// Which auth seed the engine expects for a voice.
///
/// Seeds themselves are supplied through [`crate::config::AppConfig::auth_seeds`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeedSlot {
    A,
    B,
    C,
    D,
    E,
}

impl SeedSlot {
    pub fn name(self) -> &'static str {
        match self {
            SeedSlot::A => "a",
            SeedSlot::B => "b",
            SeedSlot::C => "c",
            SeedSlot::D => "d",
            SeedSlot::E => "e",
        }
    }

    pub fn resolve(self, seeds: &HashMap<String, String>) -> Result<String, SetupError> {
        seeds
            .get(self.name())
            .cloned()
            .ok_or_else(|| SetupError::MissingAuthSeed {
                slot: self.name().to_string(),
            })
    }
}

// VOICEROID+ voices the engine bundles a seed for.
const PLUS_VOICES: [(&str, SeedSlot); 4] = [
    ("kiritan", SeedSlot::B),
    ("zunko", SeedSlot::C),
    ("akane", SeedSlot::D),
    ("aoi", SeedSlot::E),
];

/// Fully derived settings for one engine instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub library: VoiceLibrary,
    pub base_dir: PathBuf,
    pub voice_name: String,
    pub dll_path: PathBuf,
    pub license_path: PathBuf,
    pub voice_dir: PathBuf,
    pub language_dir: PathBuf,
    pub frequency: u32,
    pub seed_slot: SeedSlot,
}

pub struct SettingsBuilder {
    base_dir: String,
    voice: String,
}

impl SettingsBuilder {
    pub fn new(base_dir: impl Into<String>, voice: impl Into<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            voice: voice.into(),
        }
    }

    pub fn build(self) -> Result<Settings, SetupError> {
        let base = sanitize_base_dir(&self.base_dir)?;
        let library = VoiceLibrary::detect(&self.voice)?;
        let join = |parts: &[&str]| {
            let mut path = base.clone();
            for part in parts {
                path.push(WIN_DELIMITER);
                path.push_str(part);
            }
            PathBuf::from(path)
        };

        let (voice_dir, language_dir, seed_slot) = match library {
            VoiceLibrary::Plus => {
                let slot = PLUS_VOICES
                    .iter()
                    .find(|(prefix, _)| self.voice.starts_with(prefix))
                    .map(|(_, slot)| *slot)
                    .ok_or_else(|| SetupError::UnsupportedVoice {
                        voice: self.voice.clone(),
                    })?;
                (join(&["voice"]), join(&["lang"]), slot)
            }
            VoiceLibrary::Two => (join(&["Voice"]), join(&["Lang", "standard"]), SeedSlot::A),
        };

        let settings = Settings {
            library,
            dll_path: join(&[DLL_FILENAME]),
            license_path: join(&[LICENSE_FILENAME]),
            base_dir: PathBuf::from(base),
            voice_name: self.voice,
            voice_dir,
            language_dir,
            frequency: library.sample_rate(),
            seed_slot,
        };
        tracing::debug!(
            "[Settings] {} voice {} at {:?} ({} Hz, seed slot {})",
            settings.library,
            settings.voice_name,
            settings.base_dir,
            settings.frequency,
            settings.seed_slot.name()
        );
        Ok(settings)
    }
}

/// Reject non-ASCII install paths and strip one trailing backslash.
pub fn sanitize_base_dir(path: &str) -> Result<String, SetupError> {
    if !path.is_ascii() {
        return Err(SetupError::NonAsciiPath {
            path: path.to_string(),
        });
    }
    Ok(path.strip_suffix(WIN_DELIMITER).unwrap_or(path).to_string())
}

/// Default-or-validate the output volume.
pub fn sanitize_volume(volume: Option<f32>) -> Result<f32, SetupError> {
    match volume {
        None => Ok(DEFAULT_VOLUME),
        Some(v) if (MIN_VOLUME..=MAX_VOLUME).contains(&v) => Ok(v),
        Some(v) => Err(SetupError::VolumeOutOfRange { volume: v }),
    }
}
