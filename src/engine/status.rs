//! Engine result codes and their partition into success, expected-alternate
//! success, and failure.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Signed status code returned by every engine entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Status(pub i32);

impl Status {
    pub const USERDIC_NOENTRY: Status = Status(-1012);
    pub const USERDIC_LOCKED: Status = Status(-1011);
    pub const COUNT_LIMIT: Status = Status(-1004);
    pub const READ_FAULT: Status = Status(-1003);
    pub const PATH_NOT_FOUND: Status = Status(-1002);
    pub const FILE_NOT_FOUND: Status = Status(-1001);
    pub const OUT_OF_MEMORY: Status = Status(-206);
    pub const JOB_BUSY: Status = Status(-203);
    pub const INVALID_JOBID: Status = Status(-202);
    pub const TOO_MANY_JOBS: Status = Status(-201);
    pub const LICENSE_REJECTED: Status = Status(-102);
    pub const LICENSE_EXPIRED: Status = Status(-101);
    pub const LICENSE_ABSENT: Status = Status(-100);
    pub const INSUFFICIENT: Status = Status(-20);
    pub const NOT_LOADED: Status = Status(-11);
    pub const NOT_INITIALIZED: Status = Status(-10);
    pub const WAIT_TIMEOUT: Status = Status(-4);
    pub const INVALID_ARGUMENT: Status = Status(-3);
    pub const UNSUPPORTED: Status = Status(-2);
    pub const INTERNAL_ERROR: Status = Status(-1);
    pub const SUCCESS: Status = Status(0);
    pub const ALREADY_INITIALIZED: Status = Status(10);
    pub const ALREADY_LOADED: Status = Status(11);
    pub const PARTIALLY_REGISTERED: Status = Status(21);
    pub const NOMORE_DATA: Status = Status(204);

    pub fn raw(self) -> i32 {
        self.0
    }

    pub fn is_success(self) -> bool {
        self == Status::SUCCESS
    }

    /// `Ok` only on SUCCESS; every other code is a failure carrying itself.
    pub fn check(self) -> Result<(), Status> {
        if self.is_success() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// `Ok` only on the named alternate code expected at this call site.
    ///
    /// SUCCESS is a failure here: a zero-length probe that "succeeds" means the
    /// engine ignored the probe.
    pub fn expect(self, expected: Status) -> Result<(), Status> {
        if self == expected {
            Ok(())
        } else {
            Err(self)
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Status::USERDIC_NOENTRY => "ERR_USERDIC_NOENTRY",
            Status::USERDIC_LOCKED => "ERR_USERDIC_LOCKED",
            Status::COUNT_LIMIT => "ERR_COUNT_LIMIT",
            Status::READ_FAULT => "ERR_READ_FAULT",
            Status::PATH_NOT_FOUND => "ERR_PATH_NOT_FOUND",
            Status::FILE_NOT_FOUND => "ERR_FILE_NOT_FOUND",
            Status::OUT_OF_MEMORY => "ERR_OUT_OF_MEMORY",
            Status::JOB_BUSY => "ERR_JOB_BUSY",
            Status::INVALID_JOBID => "ERR_INVALID_JOBID",
            Status::TOO_MANY_JOBS => "ERR_TOO_MANY_JOBS",
            Status::LICENSE_REJECTED => "ERR_LICENSE_REJECTED",
            Status::LICENSE_EXPIRED => "ERR_LICENSE_EXPIRED",
            Status::LICENSE_ABSENT => "ERR_LICENSE_ABSENT",
            Status::INSUFFICIENT => "ERR_INSUFFICIENT",
            Status::NOT_LOADED => "ERR_NOT_LOADED",
            Status::NOT_INITIALIZED => "ERR_NOT_INITIALIZED",
            Status::WAIT_TIMEOUT => "ERR_WAIT_TIMEOUT",
            Status::INVALID_ARGUMENT => "ERR_INVALID_ARGUMENT",
            Status::UNSUPPORTED => "ERR_UNSUPPORTED",
            Status::INTERNAL_ERROR => "ERR_INTERNAL_ERROR",
            Status::SUCCESS => "ERR_SUCCESS",
            Status::ALREADY_INITIALIZED => "ERR_ALREADY_INITIALIZED",
            Status::ALREADY_LOADED => "ERR_ALREADY_LOADED",
            Status::PARTIALLY_REGISTERED => "ERR_PARTIALLY_REGISTERED",
            Status::NOMORE_DATA => "ERR_NOMORE_DATA",
            _ => "ERR_UNKNOWN",
        }
    }
}

impl From<i32> for Status {
    fn from(raw: i32) -> Self {
        Status(raw)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.0)
    }
}
