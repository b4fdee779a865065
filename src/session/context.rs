//! Read-only session view consumed by the message encoder.
//!
//! The encoder does not care where session state comes from; it only needs
//! to know whether a session is attached, its identifier, and the current
//! causal cluster time. [`NoOpSessionContext`] serves sessionless commands,
//! [`PooledSessionContext`] adapts a pooled server session.

use bson::Document;

use super::server_session::ServerSession;

/// A narrow read-only view of session state.
pub trait SessionContext {
    /// Whether a session is attached to the command being encoded.
    fn has_session(&self) -> bool;

    /// The session identifier document, if a session is attached.
    fn session_id(&self) -> Option<Document>;

    /// The current causal cluster time, if any has been observed.
    fn cluster_time(&self) -> Option<Document>;
}

/// The context used when no session is attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpSessionContext;

impl SessionContext for NoOpSessionContext {
    fn has_session(&self) -> bool {
        false
    }

    fn session_id(&self) -> Option<Document> {
        None
    }

    fn cluster_time(&self) -> Option<Document> {
        None
    }
}

/// A session context backed by a pooled server session.
///
/// Reading the identifier through this context refreshes the session's
/// last-used time, so encoding a command doubles as a keep-alive signal.
pub struct PooledSessionContext<'a> {
    session: &'a ServerSession,
    cluster_time: Option<Document>,
}

impl<'a> PooledSessionContext<'a> {
    /// Create a context over an acquired session, with no cluster time.
    pub fn new(session: &'a ServerSession) -> Self {
        Self {
            session,
            cluster_time: None,
        }
    }

    /// Attach the most recently observed cluster time.
    pub fn with_cluster_time(mut self, cluster_time: Document) -> Self {
        self.cluster_time = Some(cluster_time);
        self
    }
}

impl SessionContext for PooledSessionContext<'_> {
    fn has_session(&self) -> bool {
        true
    }

    fn session_id(&self) -> Option<Document> {
        Some(self.session.identifier())
    }

    fn cluster_time(&self) -> Option<Document> {
        self.cluster_time.clone()
    }
}
