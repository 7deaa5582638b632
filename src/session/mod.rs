// Session module - per-request state shared between the blocked caller and
// engine-invoked callbacks

pub mod accumulator;
pub mod drain;
pub mod job;
pub mod latch;
pub mod registry;

pub use accumulator::Accumulator;
pub use drain::{drain, Chunk, ChunkReason, DrainStats, DrainStop};
pub use job::JobSession;
pub use latch::CompletionLatch;
pub use registry::{CorrelationToken, Dispatch, JobListener, Registration, SessionRegistry};
