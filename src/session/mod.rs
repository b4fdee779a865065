//! Server session layer.
//!
//! This module manages server-tracked session handles: the pool that owns
//! their lifecycle, the handles themselves, and the read-only context view
//! the message encoder consumes.
//!
//! # Architecture
//!
//! The layer is organized into:
//! - `server_session` - session handles and the clock abstraction
//! - `pool` - the concurrent session pool
//! - `context` - the session view consumed by the encoder

pub mod context;
pub mod pool;
pub mod server_session;

// Re-export commonly used types
pub use context::{NoOpSessionContext, PooledSessionContext, SessionContext};
pub use pool::ServerSessionPool;
pub use server_session::{Clock, ServerSession, SystemClock};
