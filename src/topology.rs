//! Topology collaborator traits.
//!
//! Server discovery, monitoring, and connection establishment live outside
//! this crate. The session pool only needs two things from the topology: the
//! server-advertised logical session timeout, and the ability to select one
//! server matching a read preference and issue a single administrative
//! command against it. These traits define that seam.

use async_trait::async_trait;
use bson::Document;

use crate::error::TransportError;
use crate::read_preference::ReadPreference;

/// A view of the cluster topology capable of selecting servers.
#[async_trait]
pub trait ServerSelector: Send + Sync {
    /// The logical session timeout advertised by the server, in minutes.
    ///
    /// `None` means the server does not support logical sessions or has not
    /// advertised a timeout; in that case pooled sessions are never
    /// considered stale client-side.
    fn logical_session_timeout_minutes(&self) -> Option<i64>;

    /// Select a server matching the read preference and return a connection
    /// to it.
    async fn select_server(
        &self,
        read_preference: &ReadPreference,
    ) -> Result<Box<dyn AdminConnection>, TransportError>;
}

/// A connection capable of issuing one administrative command.
#[async_trait]
pub trait AdminConnection: Send {
    /// Run a command against the given database, reporting success or
    /// failure.
    async fn run_command(
        &mut self,
        database: &str,
        command: Document,
    ) -> Result<(), TransportError>;
}
