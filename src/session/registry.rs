//! Correlation of engine callbacks back to the session that started the job.
//!
//! The engine hands every callback an opaque user-data value and nothing
//! else. That value is a [`CorrelationToken`] integer, never a pointer; the
//! registry maps it to the session's [`JobListener`].

use std::collections::HashMap;
use std::fmt;
use std::os::raw::c_void;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::engine::{JobId, JobKind};
use crate::error::AdapterError;
use crate::session::drain::ChunkReason;

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier routing callbacks to one outstanding job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationToken(u64);

impl CorrelationToken {
    /// Allocate a fresh token. Tokens are never zero and never reused within
    /// a process.
    pub fn next() -> Self {
        Self(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed))
    }

    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    /// Whether the token survives the trip through pointer-sized user data.
    pub fn fits_user_data(self) -> bool {
        usize::try_from(self.0).is_ok()
    }

    /// Encode as the engine's opaque user-data value. Only lossless for
    /// tokens accepted by [`SessionRegistry::register`].
    pub fn as_user_data(self) -> *mut c_void {
        self.0 as usize as *mut c_void
    }

    /// Decode a user-data value produced by [`CorrelationToken::as_user_data`].
    pub fn from_user_data(user_data: *mut c_void) -> Self {
        Self(user_data as usize as u64)
    }
}

impl fmt::Display for CorrelationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Per-session capability invoked for each engine notification.
///
/// Called on whatever thread the engine chooses. Implementations must return
/// promptly and never block on the request thread.
pub trait JobListener: Send + Sync {
    fn kind(&self) -> JobKind;

    /// More data is available (buffer full or flushed); drain it.
    fn on_chunk(&self, job: JobId, reason: ChunkReason);

    /// Terminal notification; drain what remains, then release the waiter.
    fn on_closed(&self, job: JobId);

    /// Reason code outside the recognized set for [`JobListener::kind`].
    fn on_unexpected(&self, job: JobId, raw_reason: i32);
}

/// Outcome of routing one callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Delivered(ChunkReason),
    Unexpected(i32),
    UnknownToken,
}

/// Token-keyed table of outstanding sessions.
#[derive(Default)]
pub struct SessionRegistry {
    listeners: Mutex<HashMap<CorrelationToken, Arc<dyn JobListener>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` under `token` until the returned guard drops.
    ///
    /// Tokens wider than the platform's user data are refused: two of them
    /// could decode to the same key.
    pub fn register(
        self: &Arc<Self>,
        token: CorrelationToken,
        listener: Arc<dyn JobListener>,
    ) -> Result<Registration, AdapterError> {
        if !token.fits_user_data() {
            return Err(AdapterError::TokenOutOfRange { token: token.raw() });
        }
        let mut listeners = self.listeners.lock().map_err(|_| AdapterError::LockPoisoned {
            component: "session_registry".to_string(),
        })?;
        if listeners.contains_key(&token) {
            return Err(AdapterError::TokenCollision { token: token.raw() });
        }
        listeners.insert(token, listener);
        Ok(Registration {
            registry: Arc::clone(self),
            token,
        })
    }

    /// Route one engine callback.
    ///
    /// The listener is cloned out of the table before it runs, so no registry
    /// lock is held while a session drains and concurrent jobs never wait on
    /// each other here.
    pub fn dispatch(&self, token: CorrelationToken, raw_reason: i32, job: JobId) -> Dispatch {
        let listener = self.lock_listeners().get(&token).cloned();
        let Some(listener) = listener else {
            tracing::warn!(
                "[SessionRegistry] Callback for unknown token {} (job {}, reason 0x{:X}) dropped",
                token,
                job,
                raw_reason
            );
            return Dispatch::UnknownToken;
        };

        match ChunkReason::classify(listener.kind(), raw_reason) {
            Some(ChunkReason::StreamClosed) => {
                listener.on_closed(job);
                Dispatch::Delivered(ChunkReason::StreamClosed)
            }
            Some(reason) => {
                listener.on_chunk(job, reason);
                Dispatch::Delivered(reason)
            }
            None => {
                listener.on_unexpected(job, raw_reason);
                Dispatch::Unexpected(raw_reason)
            }
        }
    }

    pub fn is_registered(&self, token: CorrelationToken) -> bool {
        self.lock_listeners().contains_key(&token)
    }

    pub fn len(&self) -> usize {
        self.lock_listeners().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn unregister(&self, token: CorrelationToken) {
        self.lock_listeners().remove(&token);
    }

    // The table holds no invariant a panicking holder could break, so a
    // poisoned lock is still usable. Drop paths must always be able to remove.
    fn lock_listeners(&self) -> MutexGuard<'_, HashMap<CorrelationToken, Arc<dyn JobListener>>> {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Keeps a listener registered; unregisters on drop.
pub struct Registration {
    registry: Arc<SessionRegistry>,
    token: CorrelationToken,
}

impl Registration {
    pub fn token(&self) -> CorrelationToken {
        self.token
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.unregister(self.token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::abi;

    #[derive(Default)]
    struct RecordingListener {
        calls: Mutex<Vec<String>>,
    }

    impl JobListener for RecordingListener {
        fn kind(&self) -> JobKind {
            JobKind::TextToIntermediate
        }

        fn on_chunk(&self, job: JobId, reason: ChunkReason) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("chunk:{}:{:?}", job, reason));
        }

        fn on_closed(&self, job: JobId) {
            self.calls.lock().unwrap().push(format!("closed:{}", job));
        }

        fn on_unexpected(&self, job: JobId, raw_reason: i32) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("unexpected:{}:{}", job, raw_reason));
        }
    }

    #[test]
    fn test_tokens_are_unique_and_nonzero() {
        let a = CorrelationToken::next();
        let b = CorrelationToken::next();
        assert_ne!(a, b);
        assert_ne!(a.raw(), 0);
    }

    #[test]
    fn test_user_data_roundtrip() {
        let token = CorrelationToken::next();
        assert_eq!(CorrelationToken::from_user_data(token.as_user_data()), token);
    }

    #[test]
    fn test_dispatch_routes_by_reason() {
        let registry = Arc::new(SessionRegistry::new());
        let listener = Arc::new(RecordingListener::default());
        let token = CorrelationToken::next();
        let _registration = registry.register(token, listener.clone()).unwrap();

        assert_eq!(
            registry.dispatch(token, abi::TEXTBUF_FULL, JobId(1)),
            Dispatch::Delivered(ChunkReason::MoreDataPending)
        );
        assert_eq!(
            registry.dispatch(token, abi::RAWBUF_CLOSE, JobId(1)),
            Dispatch::Unexpected(abi::RAWBUF_CLOSE)
        );
        assert_eq!(
            registry.dispatch(token, abi::TEXTBUF_CLOSE, JobId(1)),
            Dispatch::Delivered(ChunkReason::StreamClosed)
        );

        let calls = listener.calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![
                "chunk:1:MoreDataPending".to_string(),
                format!("unexpected:1:{}", abi::RAWBUF_CLOSE),
                "closed:1".to_string(),
            ]
        );
    }

    #[test]
    fn test_registration_drop_unregisters() {
        let registry = Arc::new(SessionRegistry::new());
        let token = CorrelationToken::next();
        {
            let _registration = registry
                .register(token, Arc::new(RecordingListener::default()))
                .unwrap();
            assert!(registry.is_registered(token));
        }
        assert!(registry.is_empty());
        assert_eq!(
            registry.dispatch(token, abi::TEXTBUF_CLOSE, JobId(3)),
            Dispatch::UnknownToken
        );
    }

    #[test]
    fn test_duplicate_token_is_rejected() {
        let registry = Arc::new(SessionRegistry::new());
        let token = CorrelationToken::from_raw(usize::MAX as u64);
        let _first = registry
            .register(token, Arc::new(RecordingListener::default()))
            .unwrap();
        let second = registry.register(token, Arc::new(RecordingListener::default()));
        assert!(matches!(
            second,
            Err(AdapterError::TokenCollision { token: t }) if t == usize::MAX as u64
        ));
    }

    #[test]
    fn test_token_wider_than_user_data_is_rejected() {
        let registry = Arc::new(SessionRegistry::new());
        let widest = CorrelationToken::from_raw(usize::MAX as u64);
        assert!(widest.fits_user_data());
        assert_eq!(CorrelationToken::from_user_data(widest.as_user_data()), widest);

        // Only reachable where usize is narrower than u64.
        let Some(raw) = (usize::MAX as u64).checked_add(1) else {
            return;
        };
        let token = CorrelationToken::from_raw(raw);
        assert!(!token.fits_user_data());
        let result = registry.register(token, Arc::new(RecordingListener::default()));
        assert!(matches!(
            result,
            Err(AdapterError::TokenOutOfRange { token: t }) if t == raw
        ));
        assert!(registry.is_empty());
    }
}
