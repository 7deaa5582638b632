// Error types for the engine bridge
//
// This module defines the error types for request adaptation and engine setup,
// providing structured error handling with numeric codes that stay stable
// across the FFI boundary.

mod adapter;
mod setup;

pub use adapter::{log_adapter_error, AdapterError, AdapterErrorCodes};
pub use setup::{log_setup_error, ProbeStage, SetupError, SetupErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the FFI boundary.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
