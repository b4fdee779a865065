//! Error types for docwire.
//!
//! This module defines domain-specific error types organized by functional area.

use thiserror::Error;

/// Top-level error type encompassing all possible errors.
#[derive(Error, Debug)]
pub enum DriverError {
    /// Message encoding errors
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// Session pool errors
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Transport collaborator errors
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Errors raised while encoding a wire message.
///
/// These are fatal for the operation being encoded and are never retried
/// by this crate.
#[derive(Error, Debug)]
pub enum EncodeError {
    /// A single document exceeds the negotiated document size limit
    #[error("Document of {size} bytes exceeds the maximum document size of {max_size} bytes")]
    DocumentTooLarge { size: usize, max_size: usize },

    /// A field name was rejected by the active field-name validator
    #[error("Invalid field name '{field_name}' in {scope}")]
    InvalidFieldName { field_name: String, scope: String },

    /// BSON serialization failure
    #[error("BSON serialization error: {0}")]
    Serialization(String),
}

/// Errors related to the server session pool.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The pool has been shut down; no further sessions can be acquired
    #[error("Server session pool is closed")]
    PoolClosed,
}

/// Errors reported by the transport/topology collaborators.
#[derive(Error, Debug)]
pub enum TransportError {
    /// No server matching the read preference could be selected
    #[error("Server selection failed: {0}")]
    SelectionFailed(String),

    /// An administrative command failed on the server
    #[error("Command failed: {0}")]
    CommandFailed(String),

    /// Network I/O error
    #[error("Network I/O error: {0}")]
    Io(String),
}

impl From<bson::ser::Error> for EncodeError {
    fn from(err: bson::ser::Error) -> Self {
        EncodeError::Serialization(err.to_string())
    }
}
