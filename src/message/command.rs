//! Command message encoding.
//!
//! A [`CommandMessage`] turns a logical command into the exact on-wire bytes
//! for the negotiated protocol version. Servers that understand
//! multi-section framing get a flag-bits word, a body section carrying the
//! command document with injected metadata fields, and optionally a
//! document-sequence section carrying a split of the payload. Older servers
//! get legacy query-style framing, with payload documents embedded as an
//! array field of the command and non-default read preferences expressed by
//! wrapping the command in `$query`/`$readPreference`.

use bson::{doc, Bson, Document};
use std::collections::HashMap;

use crate::error::EncodeError;
use crate::message::header::{MessageHeader, OpCode};
use crate::message::output::MessageOutput;
use crate::message::payload::{split_for_array, write_document_sequence, SplittablePayload};
use crate::message::settings::MessageSettings;
use crate::message::validator::{
    validate_document, FieldNameValidator, MappedFieldNameValidator,
};
use crate::namespace::Namespace;
use crate::read_preference::ReadPreference;
use crate::session::context::SessionContext;

/// Section kind marker for the single command body document.
const SECTION_BODY: u8 = 0;

/// Section kind marker for a named document sequence.
const SECTION_DOCUMENT_SEQUENCE: u8 = 1;

/// Flag bit indicating the server must not send a response.
const MORE_TO_COME: i32 = 1 << 1;

/// Metadata recorded while encoding a message.
#[derive(Debug, Clone, Copy)]
pub struct EncodingMetadata {
    body_start: usize,
}

impl EncodingMetadata {
    /// Offset at which the command body document begins, needed by
    /// size-limit enforcement upstream.
    pub fn body_start(&self) -> usize {
        self.body_start
    }
}

struct PayloadState<'a> {
    payload: &'a mut SplittablePayload,
    validator: &'a dyn FieldNameValidator,
}

struct EncodingState {
    response_required: bool,
}

/// A command message bound to a namespace, read preference, and negotiated
/// settings, ready to encode into a byte sink.
///
/// The encoder never mutates the caller's command document; metadata fields
/// and legacy wrapping are applied to a derived copy.
pub struct CommandMessage<'a> {
    namespace: Namespace,
    command: &'a Document,
    command_validator: &'a dyn FieldNameValidator,
    read_preference: ReadPreference,
    settings: MessageSettings,
    response_expected: bool,
    payload: Option<PayloadState<'a>>,
    encoding: Option<EncodingState>,
}

impl<'a> CommandMessage<'a> {
    /// Create a command message expecting a response and carrying no
    /// payload.
    pub fn new(
        namespace: Namespace,
        command: &'a Document,
        command_validator: &'a dyn FieldNameValidator,
        read_preference: ReadPreference,
        settings: MessageSettings,
    ) -> Self {
        Self {
            namespace,
            command,
            command_validator,
            read_preference,
            settings,
            response_expected: true,
            payload: None,
            encoding: None,
        }
    }

    /// Attach a splittable payload validated by its own field-name
    /// validator.
    pub fn with_payload(
        mut self,
        payload: &'a mut SplittablePayload,
        validator: &'a dyn FieldNameValidator,
    ) -> Self {
        self.payload = Some(PayloadState { payload, validator });
        self
    }

    /// Set whether the caller wants a server response.
    ///
    /// A partially sent payload overrides a `false` hint in the sectioned
    /// layout: the split must be acknowledged to know how much was
    /// accepted.
    pub fn with_response_expected(mut self, response_expected: bool) -> Self {
        self.response_expected = response_expected;
        self
    }

    /// Whether a payload is attached.
    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }

    /// The read preference this message was built with.
    pub fn read_preference(&self) -> &ReadPreference {
        &self.read_preference
    }

    /// Whether the encoded message requires a server response.
    ///
    /// # Panics
    ///
    /// Panics if called before [`CommandMessage::encode`]; the answer
    /// depends on how much of the payload the encoded message consumed.
    pub fn is_response_expected(&self) -> bool {
        self.encoding
            .as_ref()
            .expect("message must be encoded before determining if a response is expected")
            .response_required
    }

    /// Encode one wire message into the sink, advancing the payload cursor
    /// past the documents this message consumed.
    ///
    /// Returns metadata recording where the command body begins. When a
    /// payload is attached the caller is expected to keep encoding fresh
    /// messages until the payload reports no further split.
    pub fn encode(
        &mut self,
        out: &mut dyn MessageOutput,
        session: &dyn SessionContext,
    ) -> Result<EncodingMetadata, EncodeError> {
        let sectioned = self.settings.server_version().supports_sections();
        let op_code = if sectioned { OpCode::Msg } else { OpCode::Query };

        let message_start = out.position();
        let length_position = MessageHeader::new(op_code).write(out);

        let (body_start, split_remaining) = if sectioned {
            self.encode_sectioned(out, session, message_start)?
        } else {
            self.encode_legacy(out, message_start)?
        };

        MessageHeader::finish(out, length_position);

        let response_required = self.response_expected || (sectioned && split_remaining);
        self.encoding = Some(EncodingState { response_required });
        Ok(EncodingMetadata { body_start })
    }

    fn encode_sectioned(
        &mut self,
        out: &mut dyn MessageOutput,
        session: &dyn SessionContext,
        message_start: usize,
    ) -> Result<(usize, bool), EncodeError> {
        let settings = self.settings;

        let flag_position = out.position();
        out.write_i32(0); // flag bits, backpatched below
        out.write_u8(SECTION_BODY);
        let body_start = out.position();

        validate_document(self.command, self.command_validator, "command document")?;
        let body = self.body_document(session);
        let bytes = bson::to_vec(&body)?;
        if bytes.len() > settings.max_document_size() {
            return Err(EncodeError::DocumentTooLarge {
                size: bytes.len(),
                max_size: settings.max_document_size(),
            });
        }
        out.write_bytes(&bytes);

        let mut split_remaining = false;
        if let Some(state) = self.payload.as_mut() {
            out.write_u8(SECTION_DOCUMENT_SEQUENCE);
            let size_position = out.position();
            out.write_i32(0); // section length, backpatched below
            out.write_cstring(state.payload.name());
            write_document_sequence(
                state.payload,
                out,
                &settings,
                message_start,
                state.validator,
            )?;
            let section_length = out.position() - size_position;
            out.backpatch_i32(size_position, section_length as i32);
            split_remaining = state.payload.has_another_split();
        }

        let flag_bits = if self.response_expected || split_remaining {
            0
        } else {
            MORE_TO_COME
        };
        out.backpatch_i32(flag_position, flag_bits);

        Ok((body_start, split_remaining))
    }

    fn encode_legacy(
        &mut self,
        out: &mut dyn MessageOutput,
        message_start: usize,
    ) -> Result<(usize, bool), EncodeError> {
        let settings = self.settings;

        out.write_i32(0); // reserved flags
        out.write_cstring(&self.namespace.full_name());
        out.write_i32(0); // number to skip
        out.write_i32(-1); // number to return
        let body_start = out.position();

        validate_document(self.command, self.command_validator, "command document")?;

        let mut body = self.command.clone();
        let mut split_remaining = false;
        if let Some(state) = self.payload.as_mut() {
            let payload_name = state.payload.name().to_string();
            let mut overrides: HashMap<String, &dyn FieldNameValidator> = HashMap::new();
            overrides.insert(payload_name.clone(), state.validator);
            let scoped = MappedFieldNameValidator::new(self.command_validator, overrides);

            let base_size = bson::to_vec(&body)?.len();
            let budget = settings
                .max_message_size()
                .saturating_sub(body_start - message_start)
                .min(settings.max_document_size());

            let split = split_for_array(
                state.payload,
                &settings,
                base_size,
                budget,
                scoped.validator_for(&payload_name),
            )?;
            let entries: Vec<Bson> = split.into_iter().map(Bson::Document).collect();
            body.insert(payload_name, Bson::Array(entries));
            split_remaining = state.payload.has_another_split();
        }

        if !self.read_preference.is_default() {
            body = doc! {
                "$query": body,
                "$readPreference": self.read_preference.to_document(),
            };
        }

        let bytes = bson::to_vec(&body)?;
        if bytes.len() > settings.max_document_size() {
            return Err(EncodeError::DocumentTooLarge {
                size: bytes.len(),
                max_size: settings.max_document_size(),
            });
        }
        out.write_bytes(&bytes);

        Ok((body_start, split_remaining))
    }

    /// Build the body document for the sectioned layout: the command plus
    /// the injected metadata fields, in fixed order.
    fn body_document(&self, session: &dyn SessionContext) -> Document {
        let mut body = self.command.clone();
        body.insert("$db", self.namespace.database());
        if let Some(cluster_time) = session.cluster_time() {
            body.insert("$clusterTime", cluster_time);
        }
        if session.has_session() {
            if let Some(session_id) = session.session_id() {
                body.insert("lsid", session_id);
            }
        }
        if !self.read_preference.is_default() {
            body.insert("$readPreference", self.read_preference.to_document());
        }
        body
    }
}
