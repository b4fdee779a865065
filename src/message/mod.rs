//! Wire-message layer.
//!
//! This module turns logical commands into on-wire bytes for the negotiated
//! protocol version.
//!
//! # Architecture
//!
//! The layer is organized into:
//! - `output` - positioned byte-sink abstraction with backpatching
//! - `settings` - negotiated per-connection limits and server version
//! - `header` - wire-message header framing and request ids
//! - `validator` - field-name validation
//! - `payload` - splittable document payloads
//! - `command` - the command message encoder
//!
//! # Example
//!
//! ```
//! use docwire::message::{CommandMessage, MessageSettings, NoOpFieldNameValidator, VecBuffer};
//! use docwire::session::NoOpSessionContext;
//! use docwire::{Namespace, ReadPreference};
//! use bson::doc;
//!
//! # fn example() -> Result<(), docwire::EncodeError> {
//! let command = doc! { "ping": 1 };
//! let mut message = CommandMessage::new(
//!     Namespace::command("admin"),
//!     &command,
//!     &NoOpFieldNameValidator,
//!     ReadPreference::primary(),
//!     MessageSettings::default(),
//! );
//!
//! let mut buffer = VecBuffer::new();
//! let metadata = message.encode(&mut buffer, &NoOpSessionContext)?;
//! assert!(metadata.body_start() > 0);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod command;
pub mod header;
pub mod output;
pub mod payload;
pub mod settings;
pub mod validator;

// Re-export commonly used types
pub use command::{CommandMessage, EncodingMetadata};
pub use header::{MessageHeader, OpCode};
pub use output::{MessageOutput, VecBuffer};
pub use payload::SplittablePayload;
pub use settings::{MessageSettings, ServerVersion};
pub use validator::{FieldNameValidator, MappedFieldNameValidator, NoOpFieldNameValidator};
