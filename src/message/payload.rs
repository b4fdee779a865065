//! Splittable command payloads.
//!
//! A bulk operation carries a named, ordered sequence of documents (insert
//! documents, update statements, delete statements) that may not fit in one
//! wire message. The payload tracks a cursor over the sequence; each encode
//! call consumes as many documents as the message budget allows and advances
//! the cursor, and the caller keeps encoding messages until
//! [`SplittablePayload::has_another_split`] reports false.

use bson::Document;

use crate::error::EncodeError;
use crate::message::output::MessageOutput;
use crate::message::settings::MessageSettings;
use crate::message::validator::{validate_document, FieldNameValidator};

/// A named, ordered sequence of payload documents plus a cursor position.
///
/// The cursor is monotonically non-decreasing across encode calls for the
/// same logical operation.
#[derive(Debug, Clone)]
pub struct SplittablePayload {
    name: String,
    documents: Vec<Document>,
    position: usize,
}

impl SplittablePayload {
    /// Create a payload over the given documents, with the cursor at the
    /// start.
    pub fn new(name: impl Into<String>, documents: Vec<Document>) -> Self {
        Self {
            name: name.into(),
            documents,
            position: 0,
        }
    }

    /// The wire name of the payload (the document-sequence identifier, and
    /// the array field name in the legacy layout).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All documents in the payload, consumed and unconsumed.
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Current cursor position: the index of the first unconsumed document.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Whether unconsumed documents remain.
    pub fn has_another_split(&self) -> bool {
        self.position < self.documents.len()
    }

    /// The unconsumed suffix of the payload.
    pub fn remaining(&self) -> &[Document] {
        &self.documents[self.position..]
    }

    pub(crate) fn advance(&mut self, count: usize) {
        self.position = (self.position + count).min(self.documents.len());
    }
}

/// Serialize as many unconsumed payload documents as fit into a
/// document-sequence section, advancing the payload cursor.
///
/// The first document of a split is always committed once it passes the
/// single-document size check, so every call makes progress. Subsequent
/// documents are committed only while the message stays within the
/// negotiated message size and batch count.
pub(crate) fn write_document_sequence(
    payload: &mut SplittablePayload,
    out: &mut dyn MessageOutput,
    settings: &MessageSettings,
    message_start: usize,
    validator: &dyn FieldNameValidator,
) -> Result<usize, EncodeError> {
    let mut written = 0;
    while payload.has_another_split() {
        let document = &payload.documents[payload.position];
        validate_document(document, validator, "payload document")?;

        let bytes = bson::to_vec(document)?;
        if bytes.len() > settings.max_document_size() {
            return Err(EncodeError::DocumentTooLarge {
                size: bytes.len(),
                max_size: settings.max_document_size(),
            });
        }

        if written > 0 {
            let within_message = out.position() - message_start + bytes.len()
                <= settings.max_message_size();
            let within_batch = written < settings.max_batch_count();
            if !within_message || !within_batch {
                break;
            }
        }

        out.write_bytes(&bytes);
        payload.position += 1;
        written += 1;
    }
    Ok(written)
}

/// Select the unconsumed payload documents that fit as a BSON array field of
/// a legacy command document, advancing the payload cursor.
///
/// `base_size` is the serialized size of the command document without the
/// array field; `budget` is the total size the embedding document may reach.
/// The computation accounts for the exact BSON overhead of the array field:
/// the element header of the field itself plus one header per array index.
pub(crate) fn split_for_array(
    payload: &mut SplittablePayload,
    settings: &MessageSettings,
    base_size: usize,
    budget: usize,
    validator: &dyn FieldNameValidator,
) -> Result<Vec<Document>, EncodeError> {
    // type byte + field name + NUL, then the array document's own length
    // prefix and terminator.
    let field_overhead = 1 + payload.name.len() + 1 + 4 + 1;
    let mut total = base_size + field_overhead;
    let mut taken = 0;

    while payload.position + taken < payload.documents.len() {
        let index = payload.position + taken;
        let document = &payload.documents[index];
        validate_document(document, validator, "payload document")?;

        let bytes = bson::to_vec(document)?;
        if bytes.len() > settings.max_document_size() {
            return Err(EncodeError::DocumentTooLarge {
                size: bytes.len(),
                max_size: settings.max_document_size(),
            });
        }

        // type byte + decimal index + NUL + the document itself
        let entry_size = 1 + decimal_digits(taken) + 1 + bytes.len();
        if taken > 0 && (total + entry_size > budget || taken >= settings.max_batch_count()) {
            break;
        }
        total += entry_size;
        taken += 1;
    }

    let split = payload.documents[payload.position..payload.position + taken].to_vec();
    payload.advance(taken);
    Ok(split)
}

fn decimal_digits(mut value: usize) -> usize {
    let mut digits = 1;
    while value >= 10 {
        value /= 10;
        digits += 1;
    }
    digits
}
