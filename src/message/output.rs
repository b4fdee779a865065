//! Byte-sink abstraction for wire-message encoding.
//!
//! Wire messages are length-prefixed and carry length/flag fields that are
//! only known after later content has been written, so the sink must support
//! overwriting fixed-width fields at earlier offsets in addition to
//! append-style writes. The transport collaborator provides the real sink;
//! [`VecBuffer`] is the in-memory implementation used by tests and by
//! callers that frame messages before handing bytes to a socket.

/// A positioned byte sink with support for backpatching fixed-width fields.
///
/// All multi-byte integers are written little-endian, matching the BSON wire
/// format.
pub trait MessageOutput {
    /// Current write position (number of bytes written so far).
    fn position(&self) -> usize;

    /// Append a single byte.
    fn write_u8(&mut self, value: u8);

    /// Append a little-endian i32.
    fn write_i32(&mut self, value: i32);

    /// Append raw bytes.
    fn write_bytes(&mut self, bytes: &[u8]);

    /// Append a null-terminated UTF-8 string.
    ///
    /// The value must not contain interior NUL bytes.
    fn write_cstring(&mut self, value: &str);

    /// Overwrite a previously written i32 at the given position.
    fn backpatch_i32(&mut self, position: usize, value: i32);
}

/// Growable in-memory [`MessageOutput`] implementation.
#[derive(Debug, Default)]
pub struct VecBuffer {
    buffer: Vec<u8>,
}

impl VecBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// View the written bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Consume the buffer, returning the written bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}

impl MessageOutput for VecBuffer {
    fn position(&self) -> usize {
        self.buffer.len()
    }

    fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    fn write_i32(&mut self, value: i32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    fn write_cstring(&mut self, value: &str) {
        debug_assert!(
            !value.as_bytes().contains(&0),
            "C-string value must not contain interior NUL bytes"
        );
        self.buffer.extend_from_slice(value.as_bytes());
        self.buffer.push(0);
    }

    fn backpatch_i32(&mut self, position: usize, value: i32) {
        self.buffer[position..position + 4].copy_from_slice(&value.to_le_bytes());
    }
}
