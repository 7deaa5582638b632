// AITalk Bridge - synchronous request adapter over the AITalk speech engine
// Callback-driven engine jobs drained into complete buffers

// Module declarations
pub mod adapter;
pub mod config;
pub mod engine;
pub mod error;
pub mod session;
pub mod settings;
pub mod synthesizer;
pub mod telemetry;
pub mod wave;

// Re-exports for convenience
pub use adapter::{JobOutput, RequestAdapter};
pub use config::AppConfig;
pub use engine::{Engine, JobKind, NativeEngine, SimulatedEngine, Status};
pub use error::{AdapterError, ErrorCode, SetupError};
pub use synthesizer::{InitRequest, Synthesizer};
pub use wave::WaveObject;

/// Install the process-wide `tracing` subscriber at debug level, writing to
/// stderr.
///
/// Safe to call more than once; later calls leave the first subscriber in
/// place.
pub fn init_logging() {
    init_logging_with_level(tracing::Level::DEBUG);
}

pub fn init_logging_with_level(level: tracing::Level) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
