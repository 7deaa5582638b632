//! One-shot completion signal between an engine callback and the blocked
//! request thread.

use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::error::AdapterError;

/// Single-producer/single-consumer one-shot latch.
///
/// A `signal` that happens before `wait` is not lost: the flag stays set and
/// `wait` returns immediately.
#[derive(Debug, Default)]
pub struct CompletionLatch {
    signaled: Mutex<bool>,
    cond: Condvar,
}

impl CompletionLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Release the waiter. Returns `false` if the latch had already fired,
    /// which indicates a protocol defect upstream.
    pub fn signal(&self) -> bool {
        let mut signaled = self
            .signaled
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if *signaled {
            tracing::warn!("[CompletionLatch] Signaled twice; ignoring second signal");
            return false;
        }
        *signaled = true;
        self.cond.notify_one();
        true
    }

    pub fn is_signaled(&self) -> bool {
        self.signaled
            .lock()
            .map(|signaled| *signaled)
            .unwrap_or(false)
    }

    /// Block until signaled.
    pub fn wait(&self) -> Result<(), AdapterError> {
        let mut signaled = self.signaled.lock().map_err(|_| poisoned())?;
        while !*signaled {
            signaled = self.cond.wait(signaled).map_err(|_| poisoned())?;
        }
        Ok(())
    }

    /// Block until signaled or `timeout` elapses. Returns whether the latch fired.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<bool, AdapterError> {
        let deadline = Instant::now() + timeout;
        let mut signaled = self.signaled.lock().map_err(|_| poisoned())?;
        while !*signaled {
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            let (guard, _) = self
                .cond
                .wait_timeout(signaled, deadline - now)
                .map_err(|_| poisoned())?;
            signaled = guard;
        }
        Ok(true)
    }
}

fn poisoned() -> AdapterError {
    AdapterError::LockPoisoned {
        component: "completion_latch".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_signal_before_wait_is_not_lost() {
        let latch = CompletionLatch::new();
        assert!(latch.signal());
        assert!(latch.wait().is_ok());
        assert!(latch.is_signaled());
    }

    #[test]
    fn test_wait_released_from_other_thread() {
        let latch = Arc::new(CompletionLatch::new());
        let signaler = Arc::clone(&latch);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            signaler.signal()
        });

        latch.wait().unwrap();
        assert!(handle.join().unwrap());
    }

    #[test]
    fn test_second_signal_reports_defect() {
        let latch = CompletionLatch::new();
        assert!(latch.signal());
        assert!(!latch.signal());
    }

    #[test]
    fn test_wait_timeout_expires_without_signal() {
        let latch = CompletionLatch::new();
        assert!(!latch.wait_timeout(Duration::from_millis(10)).unwrap());
        latch.signal();
        assert!(latch.wait_timeout(Duration::from_millis(10)).unwrap());
    }
}
