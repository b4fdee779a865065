//! # docwire
//!
//! Transport-and-session core for drivers speaking a binary,
//! BSON-document-based wire protocol to a clustered database server.
//!
//! The crate covers two subsystems: encoding logical commands into the
//! exact bytes for the negotiated protocol version (including splitting
//! oversized bulk payloads across wire messages), and pooling
//! server-tracked session handles that give commands causal-consistency
//! and transaction-sequencing metadata.
//!
//! ## Example
//!
//! ```
//! use docwire::message::{CommandMessage, MessageSettings, NoOpFieldNameValidator, VecBuffer};
//! use docwire::session::{PooledSessionContext, ServerSessionPool};
//! use docwire::topology::{AdminConnection, ServerSelector};
//! use docwire::{Namespace, ReadPreference, TransportError};
//! use async_trait::async_trait;
//! use bson::doc;
//! use std::sync::Arc;
//!
//! struct SingleServerTopology;
//!
//! #[async_trait]
//! impl ServerSelector for SingleServerTopology {
//!     fn logical_session_timeout_minutes(&self) -> Option<i64> {
//!         Some(30)
//!     }
//!
//!     async fn select_server(
//!         &self,
//!         _read_preference: &ReadPreference,
//!     ) -> Result<Box<dyn AdminConnection>, TransportError> {
//!         Err(TransportError::SelectionFailed("example topology".to_string()))
//!     }
//! }
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = ServerSessionPool::new(Arc::new(SingleServerTopology));
//! let session = pool.acquire()?;
//!
//! let command = doc! { "find": "users", "filter": { "active": true } };
//! let mut message = CommandMessage::new(
//!     Namespace::new("app", "users"),
//!     &command,
//!     &NoOpFieldNameValidator,
//!     ReadPreference::primary(),
//!     MessageSettings::default(),
//! );
//!
//! let mut buffer = VecBuffer::new();
//! let context = PooledSessionContext::new(&session);
//! message.encode(&mut buffer, &context)?;
//! assert!(message.is_response_expected());
//!
//! pool.release(session);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

// Module declarations
pub mod error;
pub mod message;
pub mod namespace;
pub mod read_preference;
pub mod session;
pub mod topology;

// Re-export public API
pub use error::{DriverError, EncodeError, SessionError, TransportError};
pub use message::{CommandMessage, MessageSettings, ServerVersion, SplittablePayload};
pub use namespace::Namespace;
pub use read_preference::{ReadPreference, ReadPreferenceMode};
pub use session::{ServerSession, ServerSessionPool};
