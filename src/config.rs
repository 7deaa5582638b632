//! Configuration management for the engine bridge
//!
//! This module provides runtime configuration loading from JSON files so the
//! drain chunk sizes, wait policy, and engine tuning can be adjusted without
//! recompilation. Every section falls back to defaults when absent.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineTuning,
    #[serde(default)]
    pub drain: DrainConfig,
    #[serde(default)]
    pub request: RequestConfig,
    /// Auth seed per slot name (`a`..`e`); see [`crate::settings::SeedSlot`]
    #[serde(default)]
    pub auth_seeds: HashMap<String, String>,
}

/// Parameters forwarded to the engine during setup
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineTuning {
    /// Engine-internal timeout passed at initialization, in milliseconds
    pub msec_timeout: u32,
    /// Raw audio buffer length requested from the engine, in bytes
    pub raw_buf_bytes: u32,
    /// Switch into the install directory while loading the language
    /// dictionary (the engine resolves some language files relative to cwd)
    pub enter_base_dir_for_language: bool,
}

impl Default for EngineTuning {
    fn default() -> Self {
        Self {
            msec_timeout: 1000,
            raw_buf_bytes: crate::engine::abi::CONFIG_RAWBUF_SIZE,
            enter_base_dir_for_language: true,
        }
    }
}

/// Scratch buffer capacity per job kind
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DrainConfig {
    /// Intermediate-notation scratch capacity in bytes
    pub text_chunk_capacity: usize,
    /// Audio scratch capacity in 16-bit samples
    pub audio_chunk_capacity: usize,
}

impl Default for DrainConfig {
    fn default() -> Self {
        Self {
            text_chunk_capacity: 0x1000,
            audio_chunk_capacity: 0xFFFF,
        }
    }
}

/// Request-level policy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    /// Upper bound on the completion wait; `None` waits forever
    pub wait_timeout_ms: Option<u64>,
    /// Keep at most one engine job open per adapter at a time
    pub serialize_jobs: bool,
}

impl RequestConfig {
    pub fn wait_timeout(&self) -> Option<Duration> {
        self.wait_timeout_ms.map(Duration::from_millis)
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The parsed configuration, or defaults if the file is missing or invalid
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    pub fn load() -> Self {
        Self::load_from_file("assets/aitalk_config.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.drain.text_chunk_capacity, 4096);
        assert_eq!(config.drain.audio_chunk_capacity, 65535);
        assert_eq!(config.engine.msec_timeout, 1000);
        assert!(config.request.wait_timeout_ms.is_none());
        assert!(!config.request.serialize_jobs);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{ "request": { "wait_timeout_ms": 250 }, "auth_seeds": { "a": "seed" } }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.request.wait_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.drain.text_chunk_capacity, 4096);
        assert_eq!(config.auth_seeds.get("a").map(String::as_str), Some("seed"));
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_from_file("does/not/exist.json");
        assert_eq!(config.drain.audio_chunk_capacity, 0xFFFF);
    }
}
