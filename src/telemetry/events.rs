//! Job lifecycle events published by the request adapter and its sessions.

use serde::{Deserialize, Serialize};

use crate::engine::{JobKind, Status};

/// Lifecycle events for one request, keyed by correlation token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum JobEvent {
    Submitted {
        token: u64,
        kind: JobKind,
        job_id: i32,
        input_len: usize,
    },
    SubmissionRejected {
        token: u64,
        kind: JobKind,
        code: Status,
    },
    ChunksDrained {
        token: u64,
        job_id: i32,
        chunks: usize,
        units: usize,
    },
    UnexpectedReason {
        token: u64,
        job_id: i32,
        reason: i32,
    },
    Closed {
        token: u64,
        kind: JobKind,
        total_units: usize,
    },
    FinalizationFailed {
        token: u64,
        kind: JobKind,
        code: Status,
    },
    WaitTimedOut {
        token: u64,
        kind: JobKind,
        timeout_ms: u64,
    },
}

/// Event with the wall-clock time it was published.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimedEvent {
    pub timestamp_ms: u64,
    pub event: JobEvent,
}
