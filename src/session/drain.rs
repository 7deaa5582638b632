//! StreamDrain: pull-style chunk retrieval run on every engine notification.
//!
//! ```text
//! engine callback (reason, job, token)
//!   └─> SessionRegistry::dispatch
//!       └─> JobSession::on_chunk / on_closed
//!           └─> drain() ── fetch ─> engine, append ─> Accumulator
//!               └─> [StreamClosed only] CompletionLatch::signal
//! ```

use crate::config::DrainConfig;
use crate::engine::{abi, Engine, JobId, JobKind, Status};

/// Classification of a recognized callback reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkReason {
    MoreDataPending,
    BufferFlushed,
    StreamClosed,
}

impl ChunkReason {
    /// Map a raw reason code for a job of `kind`. Codes from the other job
    /// family, or outside both, are unrecognized.
    pub fn classify(kind: JobKind, raw: i32) -> Option<Self> {
        match (kind, raw) {
            (JobKind::TextToIntermediate, abi::TEXTBUF_FULL) => Some(Self::MoreDataPending),
            (JobKind::TextToIntermediate, abi::TEXTBUF_FLUSH) => Some(Self::BufferFlushed),
            (JobKind::TextToIntermediate, abi::TEXTBUF_CLOSE) => Some(Self::StreamClosed),
            (JobKind::IntermediateToAudio, abi::RAWBUF_FULL) => Some(Self::MoreDataPending),
            (JobKind::IntermediateToAudio, abi::RAWBUF_FLUSH) => Some(Self::BufferFlushed),
            (JobKind::IntermediateToAudio, abi::RAWBUF_CLOSE) => Some(Self::StreamClosed),
            _ => None,
        }
    }

    /// The raw code the engine sends for this reason on a `kind` job.
    pub fn raw_code(self, kind: JobKind) -> i32 {
        match (kind, self) {
            (JobKind::TextToIntermediate, Self::MoreDataPending) => abi::TEXTBUF_FULL,
            (JobKind::TextToIntermediate, Self::BufferFlushed) => abi::TEXTBUF_FLUSH,
            (JobKind::TextToIntermediate, Self::StreamClosed) => abi::TEXTBUF_CLOSE,
            (JobKind::IntermediateToAudio, Self::MoreDataPending) => abi::RAWBUF_FULL,
            (JobKind::IntermediateToAudio, Self::BufferFlushed) => abi::RAWBUF_FLUSH,
            (JobKind::IntermediateToAudio, Self::StreamClosed) => abi::RAWBUF_CLOSE,
        }
    }
}

/// Element type streamed by one job kind.
///
/// Binds the element width to its kind, fetch entry point, and configured
/// scratch capacity.
pub trait Chunk: Copy + Default + Send + Sync + 'static {
    const KIND: JobKind;

    fn fetch(engine: &dyn Engine, job: JobId, scratch: &mut [Self]) -> Result<usize, Status>;

    fn scratch_capacity(config: &DrainConfig) -> usize;
}

impl Chunk for u8 {
    const KIND: JobKind = JobKind::TextToIntermediate;

    fn fetch(engine: &dyn Engine, job: JobId, scratch: &mut [Self]) -> Result<usize, Status> {
        engine.fetch_text(job, scratch)
    }

    fn scratch_capacity(config: &DrainConfig) -> usize {
        config.text_chunk_capacity
    }
}

impl Chunk for i16 {
    const KIND: JobKind = JobKind::IntermediateToAudio;

    fn fetch(engine: &dyn Engine, job: JobId, scratch: &mut [Self]) -> Result<usize, Status> {
        engine.fetch_audio(job, scratch)
    }

    fn scratch_capacity(config: &DrainConfig) -> usize {
        config.audio_chunk_capacity
    }
}

/// Why a drain pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainStop {
    /// A fetch returned fewer units than the scratch capacity
    ShortRead,
    /// A fetch failed; normally NOMORE_DATA after an exactly-full chunk
    Exhausted(Status),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainStats {
    pub chunks: usize,
    pub units: usize,
    pub stop: DrainStop,
}

/// Pull chunks with `fetch` until the engine has nothing more for this
/// notification, handing each chunk to `sink` in order.
///
/// A full read keeps pulling; the engine signals the end of an exactly-full
/// batch through the following failed fetch.
pub fn drain<T, F, S>(scratch: &mut [T], mut fetch: F, mut sink: S) -> DrainStats
where
    T: Copy,
    F: FnMut(&mut [T]) -> Result<usize, Status>,
    S: FnMut(&[T]),
{
    let capacity = scratch.len();
    let mut stats = DrainStats {
        chunks: 0,
        units: 0,
        stop: DrainStop::ShortRead,
    };

    loop {
        match fetch(scratch) {
            Err(status) => {
                stats.stop = DrainStop::Exhausted(status);
                break;
            }
            Ok(written) => {
                let written = written.min(capacity);
                if written > 0 {
                    sink(&scratch[..written]);
                    stats.chunks += 1;
                    stats.units += written;
                }
                if written < capacity || written == 0 {
                    stats.stop = DrainStop::ShortRead;
                    break;
                }
            }
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    fn scripted(mut available: VecDeque<u8>) -> impl FnMut(&mut [u8]) -> Result<usize, Status> {
        move |buf: &mut [u8]| {
            if available.is_empty() {
                return Err(Status::NOMORE_DATA);
            }
            let n = buf.len().min(available.len());
            for slot in buf.iter_mut().take(n) {
                *slot = available.pop_front().unwrap();
            }
            Ok(n)
        }
    }

    #[test]
    fn test_classify_is_kind_specific() {
        assert_eq!(
            ChunkReason::classify(JobKind::TextToIntermediate, abi::TEXTBUF_FLUSH),
            Some(ChunkReason::BufferFlushed)
        );
        assert_eq!(
            ChunkReason::classify(JobKind::IntermediateToAudio, abi::TEXTBUF_CLOSE),
            None
        );
        assert_eq!(
            ChunkReason::classify(JobKind::IntermediateToAudio, abi::PH_LABEL),
            None
        );
        for kind in [JobKind::TextToIntermediate, JobKind::IntermediateToAudio] {
            for reason in [
                ChunkReason::MoreDataPending,
                ChunkReason::BufferFlushed,
                ChunkReason::StreamClosed,
            ] {
                assert_eq!(ChunkReason::classify(kind, reason.raw_code(kind)), Some(reason));
            }
        }
    }

    #[test]
    fn test_short_read_ends_pass() {
        let mut scratch = [0u8; 4];
        let mut out = Vec::new();
        let stats = drain(
            &mut scratch,
            scripted((0..10).collect()),
            |chunk| out.extend_from_slice(chunk),
        );
        assert_eq!(out, (0..10).collect::<Vec<u8>>());
        assert_eq!(stats.chunks, 3);
        assert_eq!(stats.units, 10);
        assert_eq!(stats.stop, DrainStop::ShortRead);
    }

    #[test]
    fn test_exactly_full_batch_ends_on_failed_fetch() {
        let mut scratch = [0u8; 4];
        let mut out = Vec::new();
        let stats = drain(
            &mut scratch,
            scripted((0..8).collect()),
            |chunk| out.extend_from_slice(chunk),
        );
        assert_eq!(out.len(), 8);
        assert_eq!(stats.chunks, 2);
        assert_eq!(stats.stop, DrainStop::Exhausted(Status::NOMORE_DATA));
    }

    #[test]
    fn test_nothing_available() {
        let mut scratch = [0u8; 4];
        let stats = drain(&mut scratch, scripted(VecDeque::new()), |_| {
            panic!("sink must not be called")
        });
        assert_eq!(stats.chunks, 0);
        assert_eq!(stats.units, 0);
    }

    #[test]
    fn test_overreported_length_is_clamped() {
        let mut scratch = [7i16; 2];
        let mut calls = 0;
        let mut out = Vec::new();
        let stats = drain(
            &mut scratch,
            |_buf: &mut [i16]| {
                calls += 1;
                if calls == 1 {
                    Ok(5)
                } else {
                    Err(Status::NOMORE_DATA)
                }
            },
            |chunk| out.extend_from_slice(chunk),
        );
        assert_eq!(out, vec![7, 7]);
        assert_eq!(stats.units, 2);
    }
}
