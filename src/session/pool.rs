//! Server session pool.
//!
//! The pool hands out exclusive session handles, reuses released handles,
//! discards handles the server is about to expire, and batch-releases
//! server-side session state on shutdown via the `endSessions`
//! administrative command. Acquire and release never touch the network; the
//! only network call is the advisory cleanup issued while closing, and its
//! failure is logged and swallowed.

use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bson::{doc, Bson, Document};
use crossbeam_queue::SegQueue;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::SessionError;
use crate::read_preference::ReadPreference;
use crate::session::server_session::{Clock, ServerSession, SystemClock};
use crate::topology::ServerSelector;

/// Identifiers per `endSessions` cleanup command.
const END_SESSIONS_BATCH_SIZE: usize = 10_000;

/// Database the cleanup command is issued against.
const ADMIN_DATABASE: &str = "admin";

/// A concurrent, size-unbounded pool of server session handles.
///
/// Lifecycle is monotonic: open, then closing, then closed. Once closed,
/// [`ServerSessionPool::acquire`] fails fast and never succeeds again.
pub struct ServerSessionPool {
    idle: SegQueue<ServerSession>,
    selector: Arc<dyn ServerSelector>,
    clock: Arc<dyn Clock>,
    closing: AtomicBool,
    closed: AtomicBool,
    retired_identifiers: Mutex<Vec<Document>>,
}

impl ServerSessionPool {
    /// Create a pool over the given topology view.
    pub fn new(selector: Arc<dyn ServerSelector>) -> Self {
        Self::with_clock(selector, Arc::new(SystemClock))
    }

    /// Create a pool with an injected clock. Staleness checks use the
    /// clock, so tests can age sessions without sleeping.
    pub fn with_clock(selector: Arc<dyn ServerSelector>, clock: Arc<dyn Clock>) -> Self {
        Self {
            idle: SegQueue::new(),
            selector,
            clock,
            closing: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            retired_identifiers: Mutex::new(Vec::new()),
        }
    }

    /// Acquire an exclusive session handle.
    ///
    /// Reuses an idle handle when one is available and not stale, otherwise
    /// creates a fresh one. Stale idle handles encountered along the way are
    /// discarded. Fails with [`SessionError::PoolClosed`] once the pool has
    /// shut down.
    pub fn acquire(&self) -> Result<ServerSession, SessionError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SessionError::PoolClosed);
        }
        loop {
            let session = match self.idle.pop() {
                Some(session) => session,
                None => return Ok(ServerSession::new(self.clock.clone())),
            };
            if self.is_stale(&session) {
                self.retire(session);
                continue;
            }
            return Ok(session);
        }
    }

    /// Return a handle to the pool, then prune stale idle handles.
    ///
    /// Handles released while the pool is shutting down are retired
    /// immediately instead of being requeued.
    pub fn release(&self, session: ServerSession) {
        if self.closing.load(Ordering::Acquire) {
            self.retire(session);
            return;
        }
        self.idle.push(session);
        self.prune();
    }

    /// Number of idle handles currently pooled.
    pub fn idle_count(&self) -> usize {
        self.idle.len()
    }

    /// Whether shutdown has started.
    pub fn is_closing(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }

    /// Whether shutdown has completed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Shut the pool down.
    ///
    /// Every idle handle is closed and its identifier queued for
    /// server-side cleanup; the queued identifiers are then sent in
    /// `endSessions` commands of at most 10 000 identifiers each. Cleanup
    /// is advisory: failures are logged and swallowed, and sessions the
    /// command missed expire server-side on their own timeout. Calling
    /// `close` again is a no-op.
    pub async fn close(&self) {
        if self.closing.swap(true, Ordering::SeqCst) {
            return;
        }

        while let Some(session) = self.idle.pop() {
            self.retire(session);
        }

        let retired = mem::take(&mut *self.retired_identifiers.lock());
        debug!(sessions = retired.len(), "ending pooled server sessions");
        for batch in retired.chunks(END_SESSIONS_BATCH_SIZE) {
            self.end_sessions(batch).await;
        }

        self.closed.store(true, Ordering::SeqCst);
    }

    /// Close a handle. Identifiers are only collected for server-side
    /// cleanup once shutdown has started; stale handles discarded before
    /// that expire server-side on their own.
    fn retire(&self, session: ServerSession) {
        session.mark_closed();
        if !self.closing.load(Ordering::Acquire) {
            return;
        }
        self.retired_identifiers
            .lock()
            .push(session.identifier_document());
    }

    /// Discard stale handles from the idle pool, stopping at the first
    /// fresh one.
    fn prune(&self) {
        while let Some(session) = self.idle.pop() {
            if self.is_stale(&session) {
                self.retire(session);
            } else {
                self.idle.push(session);
                break;
            }
        }
    }

    /// A handle is stale when its idle time exceeds the server's logical
    /// session timeout less one minute of safety margin. Servers that
    /// advertise no timeout never expire sessions, so nothing is stale.
    fn is_stale(&self, session: &ServerSession) -> bool {
        let Some(timeout_minutes) = self.selector.logical_session_timeout_minutes() else {
            return false;
        };
        let idle_millis = self
            .clock
            .now_millis()
            .saturating_sub(session.last_used_at_millis()) as i64;
        idle_millis > (timeout_minutes - 1) * 60_000
    }

    async fn end_sessions(&self, identifiers: &[Document]) {
        if identifiers.is_empty() {
            return;
        }
        let ids: Vec<Bson> = identifiers.iter().cloned().map(Bson::Document).collect();
        let command = doc! { "endSessions": ids };

        let read_preference = ReadPreference::primary_preferred();
        match self.selector.select_server(&read_preference).await {
            Ok(mut connection) => {
                if let Err(err) = connection.run_command(ADMIN_DATABASE, command).await {
                    warn!(error = %err, "endSessions cleanup command failed");
                }
            }
            Err(err) => {
                warn!(error = %err, "server selection for endSessions cleanup failed");
            }
        }
    }
}

impl std::fmt::Debug for ServerSessionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerSessionPool")
            .field("idle_count", &self.idle_count())
            .field("closing", &self.is_closing())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::topology::AdminConnection;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicU64;

    struct ManualClock(AtomicU64);

    impl ManualClock {
        fn new(millis: u64) -> Arc<Self> {
            Arc::new(Self(AtomicU64::new(millis)))
        }

        fn advance(&self, millis: u64) {
            self.0.fetch_add(millis, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now_millis(&self) -> u64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    #[derive(Default)]
    struct SelectorState {
        fail_selection: bool,
        commands: Mutex<Vec<(String, Document)>>,
    }

    struct StubSelector {
        timeout_minutes: Option<i64>,
        state: Arc<SelectorState>,
    }

    impl StubSelector {
        fn new(timeout_minutes: Option<i64>) -> Arc<Self> {
            Arc::new(Self {
                timeout_minutes,
                state: Arc::new(SelectorState::default()),
            })
        }

        fn failing(timeout_minutes: Option<i64>) -> Arc<Self> {
            Arc::new(Self {
                timeout_minutes,
                state: Arc::new(SelectorState {
                    fail_selection: true,
                    commands: Mutex::new(Vec::new()),
                }),
            })
        }
    }

    struct StubConnection {
        state: Arc<SelectorState>,
    }

    #[async_trait]
    impl ServerSelector for StubSelector {
        fn logical_session_timeout_minutes(&self) -> Option<i64> {
            self.timeout_minutes
        }

        async fn select_server(
            &self,
            _read_preference: &ReadPreference,
        ) -> Result<Box<dyn AdminConnection>, TransportError> {
            if self.state.fail_selection {
                return Err(TransportError::SelectionFailed("no servers".to_string()));
            }
            Ok(Box::new(StubConnection {
                state: self.state.clone(),
            }))
        }
    }

    #[async_trait]
    impl AdminConnection for StubConnection {
        async fn run_command(
            &mut self,
            database: &str,
            command: Document,
        ) -> Result<(), TransportError> {
            self.state
                .commands
                .lock()
                .push((database.to_string(), command));
            Ok(())
        }
    }

    #[test]
    fn test_acquire_creates_fresh_session() {
        let pool = ServerSessionPool::new(StubSelector::new(Some(30)));
        let session = pool.acquire().unwrap();
        assert!(session.identifier().contains_key("id"));
        assert!(!session.is_closed());
    }

    #[test]
    fn test_sequential_acquires_yield_distinct_identifiers() {
        let pool = ServerSessionPool::new(StubSelector::new(Some(30)));
        let first = pool.acquire().unwrap();
        let second = pool.acquire().unwrap();
        assert_ne!(first.identifier(), second.identifier());
    }

    #[test]
    fn test_release_then_acquire_reuses_handle() {
        let pool = ServerSessionPool::new(StubSelector::new(Some(30)));
        let session = pool.acquire().unwrap();
        let identifier = session.identifier();
        session.advance_transaction_number();

        pool.release(session);
        assert_eq!(pool.idle_count(), 1);

        let reacquired = pool.acquire().unwrap();
        assert_eq!(reacquired.identifier(), identifier);
        // the counter survives the release/reacquire cycle
        assert_eq!(reacquired.advance_transaction_number(), 1);
    }

    #[test]
    fn test_stale_session_discarded_on_acquire() {
        let clock = ManualClock::new(0);
        let pool = ServerSessionPool::with_clock(StubSelector::new(Some(30)), clock.clone());

        let session = pool.acquire().unwrap();
        let stale_identifier = session.identifier();
        pool.release(session);

        // 29m30s exceeds the 29-minute staleness threshold
        clock.advance(29 * 60_000 + 30_000);

        let replacement = pool.acquire().unwrap();
        assert_ne!(replacement.identifier(), stale_identifier);
        assert_eq!(pool.idle_count(), 0);
    }

    #[test]
    fn test_session_within_threshold_is_reused() {
        let clock = ManualClock::new(0);
        let pool = ServerSessionPool::with_clock(StubSelector::new(Some(30)), clock.clone());

        let session = pool.acquire().unwrap();
        let identifier = session.identifier();
        pool.release(session);

        clock.advance(28 * 60_000);

        let reacquired = pool.acquire().unwrap();
        assert_eq!(reacquired.identifier(), identifier);
    }

    #[test]
    fn test_no_advertised_timeout_means_never_stale() {
        let clock = ManualClock::new(0);
        let pool = ServerSessionPool::with_clock(StubSelector::new(None), clock.clone());

        let session = pool.acquire().unwrap();
        let identifier = session.identifier();
        pool.release(session);

        clock.advance(365 * 24 * 60 * 60_000);

        let reacquired = pool.acquire().unwrap();
        assert_eq!(reacquired.identifier(), identifier);
    }

    #[test]
    fn test_release_prunes_stale_idle_sessions() {
        let clock = ManualClock::new(0);
        let pool = ServerSessionPool::with_clock(StubSelector::new(Some(30)), clock.clone());

        let old = pool.acquire().unwrap();
        old.identifier();
        let active = pool.acquire().unwrap();
        pool.release(old);

        clock.advance(29 * 60_000 + 30_000);

        // releasing the active session triggers a prune of the stale one
        active.identifier();
        pool.release(active);
        assert_eq!(pool.idle_count(), 1);
    }

    #[tokio::test]
    async fn test_acquire_after_close_fails_fast() {
        let pool = ServerSessionPool::new(StubSelector::new(Some(30)));
        pool.close().await;

        assert!(pool.is_closed());
        assert!(matches!(pool.acquire(), Err(SessionError::PoolClosed)));
    }

    #[tokio::test]
    async fn test_double_close_is_idempotent() {
        let selector = StubSelector::new(Some(30));
        let pool = ServerSessionPool::new(selector.clone());
        let session = pool.acquire().unwrap();
        pool.release(session);

        pool.close().await;
        pool.close().await;
        assert!(pool.is_closed());

        // already-flushed identifiers are not sent a second time
        assert_eq!(selector.state.commands.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_close_sends_end_sessions_batch() {
        let selector = StubSelector::new(Some(30));
        let pool = ServerSessionPool::new(selector.clone());

        let sessions: Vec<_> = (0..3).map(|_| pool.acquire().unwrap()).collect();
        for session in sessions {
            pool.release(session);
        }

        pool.close().await;

        let commands = selector.state.commands.lock().clone();
        assert_eq!(commands.len(), 1);
        let (database, command) = &commands[0];
        assert_eq!(database, "admin");
        assert_eq!(command.get_array("endSessions").unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_close_with_empty_pool_sends_nothing() {
        let selector = StubSelector::new(Some(30));
        let pool = ServerSessionPool::new(selector.clone());

        pool.close().await;
        assert!(selector.state.commands.lock().is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_failure_is_swallowed() {
        let selector = StubSelector::failing(Some(30));
        let pool = ServerSessionPool::new(selector.clone());
        let session = pool.acquire().unwrap();
        pool.release(session);

        pool.close().await;

        assert!(pool.is_closed());
        assert!(matches!(pool.acquire(), Err(SessionError::PoolClosed)));
    }
}
