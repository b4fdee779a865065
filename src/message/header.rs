//! Wire-message header framing.
//!
//! Every message starts with a 16-byte header: total message length,
//! request id, the id of the request this message responds to (always 0 for
//! client-originated messages), and the opcode identifying the layout of the
//! remainder. The length is only known once the body is written, so it is
//! reserved up front and backpatched.

use std::sync::atomic::{AtomicI32, Ordering};

use super::output::MessageOutput;

/// Process-wide request id sequence.
static REQUEST_ID_SEQUENCE: AtomicI32 = AtomicI32::new(1);

/// Opcode identifying a wire-message layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    /// Legacy query-style framing
    Query = 2004,
    /// Modern multi-section framing
    Msg = 2013,
}

impl OpCode {
    /// Wire value of the opcode.
    pub fn value(self) -> i32 {
        self as i32
    }
}

/// Allocate the next request id.
pub fn next_request_id() -> i32 {
    REQUEST_ID_SEQUENCE.fetch_add(1, Ordering::SeqCst)
}

/// A wire-message header.
#[derive(Debug, Clone, Copy)]
pub struct MessageHeader {
    request_id: i32,
    response_to: i32,
    op_code: OpCode,
}

impl MessageHeader {
    /// Create a header for a new client-originated message.
    pub fn new(op_code: OpCode) -> Self {
        Self {
            request_id: next_request_id(),
            response_to: 0,
            op_code,
        }
    }

    /// The request id carried by this header.
    pub fn request_id(&self) -> i32 {
        self.request_id
    }

    /// The opcode carried by this header.
    pub fn op_code(&self) -> OpCode {
        self.op_code
    }

    /// Write the header, reserving the total-length slot. Returns the
    /// position of the slot for later backpatching.
    pub fn write(&self, out: &mut dyn MessageOutput) -> usize {
        let length_position = out.position();
        out.write_i32(0); // total message length, backpatched
        out.write_i32(self.request_id);
        out.write_i32(self.response_to);
        out.write_i32(self.op_code.value());
        length_position
    }

    /// Backpatch the total message length once the body is complete.
    pub fn finish(out: &mut dyn MessageOutput, length_position: usize) {
        let total_length = out.position() - length_position;
        out.backpatch_i32(length_position, total_length as i32);
    }
}
