//! Negotiated per-connection message settings.
//!
//! The connection handshake negotiates the limits and server version that
//! govern message encoding. Settings are immutable once built and supplied
//! per encode call.

use serde::{Deserialize, Serialize};

/// Default maximum size of a single BSON document (16 MiB).
pub const DEFAULT_MAX_DOCUMENT_SIZE: usize = 16 * 1024 * 1024;

/// Default maximum size of a wire message (48 MB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 48_000_000;

/// Default maximum number of documents in one write batch.
pub const DEFAULT_MAX_BATCH_COUNT: usize = 1000;

/// A server version, ordered lexicographically by component.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ServerVersion {
    major: u32,
    minor: u32,
    patch: u32,
}

impl ServerVersion {
    /// First version series that understands multi-section framing. The 3.5
    /// development series precedes the 3.6 release, so comparing against it
    /// selects sections for every capable server.
    const MIN_SECTIONED: ServerVersion = ServerVersion::new(3, 5, 0);

    /// Create a version from its components.
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Whether this server understands the modern multi-section message
    /// layout. Older servers only accept legacy query-style framing.
    pub fn supports_sections(&self) -> bool {
        *self >= Self::MIN_SECTIONED
    }
}

/// Immutable capability set negotiated for one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSettings {
    max_document_size: usize,
    max_message_size: usize,
    max_batch_count: usize,
    server_version: ServerVersion,
}

impl MessageSettings {
    /// Create settings with the given server version and default limits.
    pub fn new(server_version: ServerVersion) -> Self {
        Self {
            max_document_size: DEFAULT_MAX_DOCUMENT_SIZE,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            max_batch_count: DEFAULT_MAX_BATCH_COUNT,
            server_version,
        }
    }

    /// Override the maximum single-document size.
    pub fn with_max_document_size(mut self, max_document_size: usize) -> Self {
        self.max_document_size = max_document_size;
        self
    }

    /// Override the maximum wire-message size.
    pub fn with_max_message_size(mut self, max_message_size: usize) -> Self {
        self.max_message_size = max_message_size;
        self
    }

    /// Override the maximum write-batch document count.
    pub fn with_max_batch_count(mut self, max_batch_count: usize) -> Self {
        self.max_batch_count = max_batch_count;
        self
    }

    /// Maximum size of a single BSON document.
    pub fn max_document_size(&self) -> usize {
        self.max_document_size
    }

    /// Maximum size of one wire message.
    pub fn max_message_size(&self) -> usize {
        self.max_message_size
    }

    /// Maximum number of documents in one write batch.
    pub fn max_batch_count(&self) -> usize {
        self.max_batch_count
    }

    /// Negotiated server version.
    pub fn server_version(&self) -> ServerVersion {
        self.server_version
    }
}

impl Default for MessageSettings {
    fn default() -> Self {
        Self::new(ServerVersion::new(3, 6, 0))
    }
}
