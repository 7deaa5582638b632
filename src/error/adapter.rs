// Request adapter error types and constants

use crate::engine::{JobKind, Status};
use crate::error::ErrorCode;
use std::fmt;
use tracing::error;

/// Adapter error code constants
///
/// Single source of truth for the numeric codes reported by
/// [`AdapterError::code`].
///
/// Error code range: 3001-3008
pub struct AdapterErrorCodes {}

impl AdapterErrorCodes {
    /// The engine refused to begin the job
    pub const SUBMISSION_FAILED: i32 = 3001;

    /// The job ran but the engine's close call failed
    pub const FINALIZATION_FAILED: i32 = 3002;

    /// The engine delivered a callback reason this layer does not recognize
    pub const UNEXPECTED_CALLBACK_REASON: i32 = 3003;

    /// No stream-closed notification arrived within the configured timeout
    pub const WAIT_TIMED_OUT: i32 = 3004;

    /// A correlation token was already registered for another job
    pub const TOKEN_COLLISION: i32 = 3005;

    /// Mutex/Condvar state was poisoned
    pub const LOCK_POISONED: i32 = 3006;

    /// The accumulated output was already detached from the session
    pub const OUTPUT_UNAVAILABLE: i32 = 3007;

    /// A correlation token does not fit the engine's pointer-sized user data
    pub const TOKEN_OUT_OF_RANGE: i32 = 3008;
}

/// Log an adapter error with structured context
///
/// Fields logged:
/// - error_code: Numeric error code for programmatic handling
/// - component: Always `RequestAdapter`
/// - message: Human-readable error message
/// - context: Caller-supplied location
pub fn log_adapter_error(err: &AdapterError, context: &str) {
    error!(
        "Adapter error in {}: code={}, component=RequestAdapter, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors surfaced by a synchronous request
///
/// A failed request never carries a partial buffer: every variant replaces
/// the output entirely.
///
/// Error code ranges: 3001-3008
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterError {
    /// The begin-job entry point returned a non-success code
    SubmissionFailed { kind: JobKind, code: Status },

    /// The close-job entry point returned a non-success code
    FinalizationFailed { kind: JobKind, code: Status },

    /// The engine kept the job open after sending a reason code outside the
    /// recognized set for this job kind
    UnexpectedCallbackReason { kind: JobKind, reason: i32 },

    /// The completion wait expired before the stream closed
    WaitTimedOut { kind: JobKind, timeout_ms: u64 },

    /// Correlation token already in use by an outstanding job
    TokenCollision { token: u64 },

    /// Correlation token wider than the platform's user-data value
    TokenOutOfRange { token: u64 },

    /// Mutex/Condvar was poisoned
    LockPoisoned { component: String },

    /// Output already taken from the session
    OutputUnavailable { kind: JobKind },
}

impl ErrorCode for AdapterError {
    fn code(&self) -> i32 {
        match self {
            AdapterError::SubmissionFailed { .. } => AdapterErrorCodes::SUBMISSION_FAILED,
            AdapterError::FinalizationFailed { .. } => AdapterErrorCodes::FINALIZATION_FAILED,
            AdapterError::UnexpectedCallbackReason { .. } => {
                AdapterErrorCodes::UNEXPECTED_CALLBACK_REASON
            }
            AdapterError::WaitTimedOut { .. } => AdapterErrorCodes::WAIT_TIMED_OUT,
            AdapterError::TokenCollision { .. } => AdapterErrorCodes::TOKEN_COLLISION,
            AdapterError::TokenOutOfRange { .. } => AdapterErrorCodes::TOKEN_OUT_OF_RANGE,
            AdapterError::LockPoisoned { .. } => AdapterErrorCodes::LOCK_POISONED,
            AdapterError::OutputUnavailable { .. } => AdapterErrorCodes::OUTPUT_UNAVAILABLE,
        }
    }

    fn message(&self) -> String {
        match self {
            AdapterError::SubmissionFailed { kind, code } => {
                format!("{} job could not be started: {}", kind, code)
            }
            AdapterError::FinalizationFailed { kind, code } => {
                format!("{} job could not be closed: {}", kind, code)
            }
            AdapterError::UnexpectedCallbackReason { kind, reason } => {
                format!(
                    "{} job received unrecognized callback reason 0x{:X} and never closed",
                    kind, reason
                )
            }
            AdapterError::WaitTimedOut { kind, timeout_ms } => {
                format!("{} job did not close within {} ms", kind, timeout_ms)
            }
            AdapterError::TokenCollision { token } => {
                format!("Correlation token {} is already registered", token)
            }
            AdapterError::TokenOutOfRange { token } => {
                format!(
                    "Correlation token {} does not fit in {}-bit user data",
                    token,
                    usize::BITS
                )
            }
            AdapterError::LockPoisoned { component } => {
                format!("Lock poisoned on {}", component)
            }
            AdapterError::OutputUnavailable { kind } => {
                format!("{} job output was already consumed", kind)
            }
        }
    }
}

impl fmt::Display for AdapterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let variant = match self {
            AdapterError::SubmissionFailed { .. } => "SubmissionFailed",
            AdapterError::FinalizationFailed { .. } => "FinalizationFailed",
            AdapterError::UnexpectedCallbackReason { .. } => "UnexpectedCallbackReason",
            AdapterError::WaitTimedOut { .. } => "WaitTimedOut",
            AdapterError::TokenCollision { .. } => "TokenCollision",
            AdapterError::TokenOutOfRange { .. } => "TokenOutOfRange",
            AdapterError::LockPoisoned { .. } => "LockPoisoned",
            AdapterError::OutputUnavailable { .. } => "OutputUnavailable",
        };
        write!(
            f,
            "AdapterError::{} (code {}): {}",
            variant,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for AdapterError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapter_error_codes() {
        assert_eq!(
            AdapterError::SubmissionFailed {
                kind: JobKind::TextToIntermediate,
                code: Status::INVALID_ARGUMENT
            }
            .code(),
            AdapterErrorCodes::SUBMISSION_FAILED
        );
        assert_eq!(
            AdapterError::FinalizationFailed {
                kind: JobKind::IntermediateToAudio,
                code: Status::INVALID_JOBID
            }
            .code(),
            AdapterErrorCodes::FINALIZATION_FAILED
        );
        assert_eq!(
            AdapterError::UnexpectedCallbackReason {
                kind: JobKind::TextToIntermediate,
                reason: 0x12D
            }
            .code(),
            AdapterErrorCodes::UNEXPECTED_CALLBACK_REASON
        );
        assert_eq!(
            AdapterError::WaitTimedOut {
                kind: JobKind::TextToIntermediate,
                timeout_ms: 10
            }
            .code(),
            AdapterErrorCodes::WAIT_TIMED_OUT
        );
        assert_eq!(
            AdapterError::TokenCollision { token: 7 }.code(),
            AdapterErrorCodes::TOKEN_COLLISION
        );
        assert_eq!(
            AdapterError::TokenOutOfRange { token: u64::MAX }.code(),
            AdapterErrorCodes::TOKEN_OUT_OF_RANGE
        );
        assert_eq!(
            AdapterError::LockPoisoned {
                component: "latch".to_string()
            }
            .code(),
            AdapterErrorCodes::LOCK_POISONED
        );
        assert_eq!(
            AdapterError::OutputUnavailable {
                kind: JobKind::IntermediateToAudio
            }
            .code(),
            AdapterErrorCodes::OUTPUT_UNAVAILABLE
        );
    }

    #[test]
    fn test_adapter_error_messages_carry_raw_code() {
        let err = AdapterError::SubmissionFailed {
            kind: JobKind::TextToIntermediate,
            code: Status::INVALID_ARGUMENT,
        };
        assert!(err.message().contains("-3"));

        let err = AdapterError::UnexpectedCallbackReason {
            kind: JobKind::IntermediateToAudio,
            reason: 0x12D,
        };
        assert!(err.message().contains("0x12D"));
    }

    #[test]
    fn test_adapter_error_display() {
        let err = AdapterError::FinalizationFailed {
            kind: JobKind::TextToIntermediate,
            code: Status::INTERNAL_ERROR,
        };
        let display = format!("{}", err);
        assert!(display.starts_with("AdapterError::FinalizationFailed"));
        assert!(display.contains(&err.code().to_string()));
    }
}
