//! Server session handles.
//!
//! A server session is a server-tracked context identified by a random
//! 16-byte value. Handles are owned by the pool while idle and exclusively
//! by one caller while acquired; the counters and flags inside a handle are
//! atomic so that state written by one thread before release is visible to
//! the thread that acquires the handle next.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

use bson::spec::BinarySubtype;
use bson::{doc, Binary, Bson, Document};
use uuid::Uuid;

/// A millisecond clock, injectable for tests.
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> u64;
}

/// The wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// A server-tracked session handle.
///
/// The identifier is generated lazily on first read and reused for the life
/// of the handle. The transaction counter is per-handle, post-increment,
/// and never resets, even across release/reacquire cycles.
pub struct ServerSession {
    clock: Arc<dyn Clock>,
    identifier: OnceLock<Document>,
    transaction_number: AtomicI64,
    last_used_at_millis: AtomicU64,
    closed: AtomicBool,
}

impl ServerSession {
    pub(crate) fn new(clock: Arc<dyn Clock>) -> Self {
        let now = clock.now_millis();
        Self {
            clock,
            identifier: OnceLock::new(),
            transaction_number: AtomicI64::new(0),
            last_used_at_millis: AtomicU64::new(now),
            closed: AtomicBool::new(false),
        }
    }

    /// The session identifier document `{id: <16-byte binary>}`.
    ///
    /// Reading the identifier refreshes the session's last-used time, so
    /// every command that carries this session also keeps it alive.
    pub fn identifier(&self) -> Document {
        self.last_used_at_millis
            .store(self.clock.now_millis(), Ordering::Release);
        self.identifier_document()
    }

    /// The identifier without the keep-alive side effect. Used by the pool
    /// when collecting identifiers of retired sessions.
    pub(crate) fn identifier_document(&self) -> Document {
        self.identifier
            .get_or_init(|| {
                let id = Binary {
                    subtype: BinarySubtype::Uuid,
                    bytes: Uuid::new_v4().as_bytes().to_vec(),
                };
                doc! { "id": Bson::Binary(id) }
            })
            .clone()
    }

    /// Return the current transaction number and increment the counter.
    /// The first call on a fresh handle returns 0.
    pub fn advance_transaction_number(&self) -> i64 {
        self.transaction_number.fetch_add(1, Ordering::SeqCst)
    }

    /// The current transaction counter value, without advancing it.
    pub fn transaction_number(&self) -> i64 {
        self.transaction_number.load(Ordering::SeqCst)
    }

    /// When the session was last used, in milliseconds since the epoch.
    pub fn last_used_at_millis(&self) -> u64 {
        self.last_used_at_millis.load(Ordering::Acquire)
    }

    /// Whether the session has been closed. Closed sessions are never
    /// reused.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn mark_closed(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

impl fmt::Debug for ServerSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerSession")
            .field("identifier", &self.identifier.get())
            .field("transaction_number", &self.transaction_number())
            .field("last_used_at_millis", &self.last_used_at_millis())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_session() -> ServerSession {
        ServerSession::new(Arc::new(SystemClock))
    }

    #[test]
    fn test_identifier_is_sixteen_byte_uuid() {
        let session = new_session();
        let identifier = session.identifier();

        match identifier.get("id") {
            Some(Bson::Binary(binary)) => {
                assert_eq!(binary.subtype, BinarySubtype::Uuid);
                assert_eq!(binary.bytes.len(), 16);
            }
            other => panic!("expected binary identifier, got {:?}", other),
        }
    }

    #[test]
    fn test_identifier_is_stable_across_reads() {
        let session = new_session();
        assert_eq!(session.identifier(), session.identifier());
    }

    #[test]
    fn test_identifiers_are_unique_per_session() {
        assert_ne!(new_session().identifier(), new_session().identifier());
    }

    #[test]
    fn test_transaction_number_post_increments() {
        let session = new_session();
        assert_eq!(session.advance_transaction_number(), 0);
        assert_eq!(session.advance_transaction_number(), 1);
        assert_eq!(session.advance_transaction_number(), 2);
        assert_eq!(session.transaction_number(), 3);
    }

    #[test]
    fn test_transaction_numbers_are_per_handle() {
        let first = new_session();
        let second = new_session();
        first.advance_transaction_number();
        first.advance_transaction_number();
        assert_eq!(second.advance_transaction_number(), 0);
    }

    #[test]
    fn test_identifier_read_refreshes_last_used() {
        struct ManualClock(AtomicU64);
        impl Clock for ManualClock {
            fn now_millis(&self) -> u64 {
                self.0.load(Ordering::SeqCst)
            }
        }

        let clock = Arc::new(ManualClock(AtomicU64::new(1_000)));
        let session = ServerSession::new(clock.clone());
        assert_eq!(session.last_used_at_millis(), 1_000);

        clock.0.store(5_000, Ordering::SeqCst);
        session.identifier();
        assert_eq!(session.last_used_at_millis(), 5_000);
    }

    #[test]
    fn test_close_flag() {
        let session = new_session();
        assert!(!session.is_closed());
        session.mark_closed();
        assert!(session.is_closed());
    }
}
