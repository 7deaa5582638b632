//! Synthesized PCM output and its WAV encoding.

use std::io::Cursor;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const BIT_DEPTH: u16 = 16;
pub const CHANNELS: u16 = 1;

/// 16-bit mono linear PCM at the voice library's native rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveObject {
    pub data: Vec<i16>,
    pub sample_rate: u32,
}

impl WaveObject {
    pub fn new(data: Vec<i16>, sample_rate: u32) -> Self {
        Self { data, sample_rate }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.data.len() as f64 / f64::from(self.sample_rate))
    }

    fn spec(&self) -> hound::WavSpec {
        hound::WavSpec {
            channels: CHANNELS,
            sample_rate: self.sample_rate,
            bits_per_sample: BIT_DEPTH,
            sample_format: hound::SampleFormat::Int,
        }
    }

    pub fn write_wav<P: AsRef<Path>>(&self, path: P) -> hound::Result<()> {
        let mut writer = hound::WavWriter::create(path, self.spec())?;
        for sample in &self.data {
            writer.write_sample(*sample)?;
        }
        writer.finalize()
    }

    /// Encode as an in-memory RIFF/WAVE file.
    pub fn to_wav_bytes(&self) -> hound::Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::with_capacity(44 + self.data.len() * 2));
        {
            let mut writer = hound::WavWriter::new(&mut cursor, self.spec())?;
            for sample in &self.data {
                writer.write_sample(*sample)?;
            }
            writer.finalize()?;
        }
        Ok(cursor.into_inner())
    }
}
