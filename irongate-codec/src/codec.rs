//! Frame-level encoder and decoder.

use crate::config::{CodecConfig, ResyncPolicy};
use crate::error::{CodecError, Result};
use crate::field::{decode_field, encode_absent, encode_field};
use bytes::{Buf, Bytes, BytesMut};
use irongate_core::header::HEADER_MESSAGE_NAME;
use irongate_core::{FrameHeader, Message, ReadBuffer, Value};
use irongate_schema::{
    DictionaryProvider, MAX_PAYLOAD_LENGTH, MessageSchema, Presence, SchemaError,
    validate_type_codes,
};
use std::collections::HashMap;

/// Dictionary-driven binary codec.
///
/// A codec is immutable after construction and can be shared between tasks
/// behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Codec {
    config: CodecConfig,
    schemas: Vec<MessageSchema>,
    by_name: HashMap<String, usize>,
    by_type_code: HashMap<u8, usize>,
}

impl Codec {
    /// Creates a codec over the given schemas.
    ///
    /// # Errors
    /// Returns [`SchemaError::DuplicateTypeCode`] or
    /// [`SchemaError::DuplicateMessage`] when two schemas collide.
    pub fn new(schemas: Vec<MessageSchema>, config: CodecConfig) -> std::result::Result<Self, SchemaError> {
        validate_type_codes(&schemas)?;

        let mut by_name = HashMap::with_capacity(schemas.len());
        let mut by_type_code = HashMap::with_capacity(schemas.len());
        for (index, schema) in schemas.iter().enumerate() {
            if by_name.insert(schema.name().to_string(), index).is_some() {
                return Err(SchemaError::DuplicateMessage {
                    name: schema.name().to_string(),
                });
            }
            by_type_code.insert(schema.type_code(), index);
        }

        Ok(Self {
            config,
            schemas,
            by_name,
            by_type_code,
        })
    }

    /// Creates a codec over every message of a dictionary.
    ///
    /// # Errors
    /// Returns [`SchemaError`] if a lookup fails or the schemas collide.
    pub fn from_dictionary(
        dictionary: &dyn DictionaryProvider,
        config: CodecConfig,
    ) -> std::result::Result<Self, SchemaError> {
        let schemas = dictionary
            .message_names()
            .iter()
            .map(|name| dictionary.message_schema(name))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Self::new(schemas, config)
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Returns the schema of a message name.
    #[must_use]
    pub fn schema(&self, name: &str) -> Option<&MessageSchema> {
        self.by_name.get(name).map(|&i| &self.schemas[i])
    }

    /// Returns the schema of a type code.
    #[must_use]
    pub fn schema_by_type_code(&self, type_code: u8) -> Option<&MessageSchema> {
        self.by_type_code.get(&type_code).map(|&i| &self.schemas[i])
    }

    /// Encodes a message into a new frame, selecting the schema by message name.
    ///
    /// # Errors
    /// Returns [`CodecError::UnknownMessage`] or any field encoding error.
    pub fn encode(&self, message: &Message) -> Result<Bytes> {
        let mut dst = BytesMut::new();
        self.encode_into(message, &mut dst)?;
        Ok(dst.freeze())
    }

    /// Encodes a message and appends the frame to `dst`.
    ///
    /// # Errors
    /// See [`Codec::encode`]. Nothing is appended on error.
    pub fn encode_into(&self, message: &Message, dst: &mut BytesMut) -> Result<()> {
        let schema = self
            .schema(message.name())
            .ok_or_else(|| CodecError::UnknownMessage {
                name: message.name().to_string(),
            })?;
        self.encode_with_schema(message, schema, dst)
    }

    /// Encodes a message with an explicit schema and appends the frame to `dst`.
    ///
    /// The frame is staged in full before anything is appended, so `dst` is
    /// unchanged on error.
    ///
    /// # Errors
    /// Returns [`CodecError`] for missing, null or unrepresentable values.
    pub fn encode_with_schema(
        &self,
        message: &Message,
        schema: &MessageSchema,
        dst: &mut BytesMut,
    ) -> Result<()> {
        let payload_length = schema.payload_length();
        let message_length = u16::try_from(payload_length)
            .ok()
            .filter(|_| payload_length <= MAX_PAYLOAD_LENGTH)
            .ok_or_else(|| CodecError::FrameTooLarge {
                message: schema.name().to_string(),
                length: payload_length,
            })?;

        let mut frame = vec![0u8; FrameHeader::ENCODED_LENGTH + payload_length];
        FrameHeader::new(self.config.start_of_message, message_length, schema.type_code())
            .encode(&mut frame, 0);

        let payload = &mut frame[FrameHeader::ENCODED_LENGTH..];
        for field in schema.fields() {
            let window = &mut payload[field.offset()..field.end_offset()];
            match message.get(&field.name).or(field.default.as_ref()) {
                Some(value) => encode_field(field, value, window)?,
                None if field.presence == Presence::Optional => encode_absent(field, window),
                None => {
                    return Err(CodecError::MissingField {
                        message: schema.name().to_string(),
                        field: field.name.clone(),
                    });
                }
            }
        }

        dst.extend_from_slice(&frame);
        Ok(())
    }

    /// Returns true if a complete frame is buffered.
    ///
    /// Only the MessageLength field is peeked; nothing is consumed.
    #[must_use]
    pub fn decodable(&self, buffer: &[u8]) -> bool {
        Self::frame_length(buffer).is_some_and(|len| buffer.len() >= len)
    }

    /// Returns the size of the frame announced at the start of `buffer`.
    #[must_use]
    pub fn frame_length(buffer: &[u8]) -> Option<usize> {
        FrameHeader::peek_message_length(buffer)
            .map(|len| FrameHeader::ENCODED_LENGTH + usize::from(len))
    }

    /// Decodes one frame from the front of `buffer`.
    ///
    /// Returns `Ok(None)` when no complete frame is buffered yet. On success
    /// exactly one frame is consumed; on error nothing is.
    ///
    /// # Errors
    /// Returns a protocol error for a bad StartOfMessage or unknown type code,
    /// or a field error for a frame that does not match its schema.
    pub fn decode(&self, buffer: &mut BytesMut) -> Result<Option<Message>> {
        if buffer.is_empty() {
            return Ok(None);
        }
        self.check_start_of_message(buffer)?;
        if !self.decodable(buffer) {
            return Ok(None);
        }

        let message = self.decode_frame(buffer)?;
        let consumed = FrameHeader::wrap(&buffer[..], 0).frame_size();
        buffer.advance(consumed);
        Ok(Some(message))
    }

    /// Decodes one complete frame held at the start of `frame`.
    ///
    /// # Errors
    /// See [`Codec::decode`].
    ///
    /// # Panics
    /// Panics if `frame` is shorter than the frame its header announces; check
    /// with [`Codec::decodable`] first.
    pub fn decode_frame(&self, frame: &[u8]) -> Result<Message> {
        self.check_start_of_message(frame)?;
        let header = FrameHeader::wrap(frame, 0);
        let schema = self
            .schema_by_type_code(header.message_type)
            .ok_or(CodecError::UnknownMessageType {
                type_code: header.message_type,
            })?;

        let length = usize::from(header.message_length);
        if length < schema.payload_length() {
            return Err(CodecError::FrameTooShort {
                message: schema.name().to_string(),
                length,
                required: schema.payload_length(),
            });
        }
        if length > schema.payload_length() {
            tracing::trace!(
                message = schema.name(),
                extra = length - schema.payload_length(),
                "ignoring trailing payload bytes"
            );
        }

        let payload = frame.get_bytes(FrameHeader::ENCODED_LENGTH, length);
        let mut message = Message::new(schema.name(), schema.namespace())
            .with(HEADER_MESSAGE_NAME, Value::Message(header.to_message(schema.namespace())));
        for field in schema.fields() {
            let value = decode_field(field, &payload[field.offset()..field.end_offset()])?;
            message.set(field.name.clone(), value);
        }
        Ok(message)
    }

    /// Applies recovery after `error` was returned by [`Codec::decode`].
    ///
    /// Field errors drop the offending frame. Protocol errors follow the
    /// configured [`ResyncPolicy`]. Returns `false` when the connection should
    /// be closed instead.
    pub fn resync(&self, buffer: &mut BytesMut, error: &CodecError) -> bool {
        let frame = Self::frame_length(buffer).map(|len| len.min(buffer.len()));
        if !error.is_protocol_error() {
            buffer.advance(frame.unwrap_or(buffer.len()));
            return true;
        }
        match self.config.resync_policy {
            ResyncPolicy::Disconnect => false,
            ResyncPolicy::SkipByte => {
                buffer.advance(1.min(buffer.len()));
                true
            }
            ResyncPolicy::SkipFrame => {
                buffer.advance(frame.unwrap_or(1).min(buffer.len()));
                true
            }
        }
    }

    fn check_start_of_message(&self, buffer: &[u8]) -> Result<()> {
        let found = buffer.get_u8(FrameHeader::START_OF_MESSAGE_OFFSET);
        if found == self.config.start_of_message {
            Ok(())
        } else {
            Err(CodecError::UnexpectedStartOfMessage {
                found,
                expected: self.config.start_of_message,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use irongate_core::{Decimal, FieldType};
    use irongate_schema::{FieldDescriptor, InMemoryDictionary, TYPE_ATTRIBUTE};

    fn order_schema() -> MessageSchema {
        MessageSchema::builder("NewOrder", "TEST", b'D')
            .field(FieldDescriptor::new("ClOrdID", FieldType::Alpha, 10))
            .field(FieldDescriptor::new("Qty", FieldType::DecimalUint, 8).attribute(TYPE_ATTRIBUTE, "Uint64"))
            .field(
                FieldDescriptor::new("Price", FieldType::DecimalPrice, 8)
                    .precision(2)
                    .attribute(TYPE_ATTRIBUTE, "Price"),
            )
            .field(FieldDescriptor::new("Account", FieldType::Int32, 4).default_value(7))
            .field(FieldDescriptor::new("Memo", FieldType::String, 4).optional())
            .build()
            .unwrap()
    }

    fn heartbeat_schema() -> MessageSchema {
        MessageSchema::builder("Heartbeat", "TEST", b'0').build().unwrap()
    }

    fn codec(policy: ResyncPolicy) -> Codec {
        Codec::new(
            vec![order_schema(), heartbeat_schema()],
            CodecConfig::default().resync_policy(policy),
        )
        .unwrap()
    }

    fn order() -> Message {
        Message::new("NewOrder", "TEST")
            .with("ClOrdID", "ORD-1")
            .with("Qty", 10i64)
            .with("Price", 150.5)
    }

    #[test]
    fn test_encode_layout() {
        let frame = codec(ResyncPolicy::Disconnect).encode(&order()).unwrap();
        assert_eq!(frame.len(), 4 + 34);
        assert_eq!(&frame[..4], &[2, 34, 0, b'D']);
        assert_eq!(&frame[4..14], b"ORD-1     ");
        assert_eq!(&frame[14..22], &10u64.to_le_bytes());
        assert_eq!(&frame[22..30], &15050i64.to_le_bytes());
        assert_eq!(&frame[30..34], &7i32.to_le_bytes());
        assert_eq!(&frame[34..38], b"    ");
    }

    #[test]
    fn test_decode_round_trip() {
        let codec = codec(ResyncPolicy::Disconnect);
        let mut buffer = BytesMut::from(&codec.encode(&order()).unwrap()[..]);

        let decoded = codec.decode(&mut buffer).unwrap().unwrap();
        assert!(buffer.is_empty());
        assert_eq!(decoded.name(), "NewOrder");
        assert_eq!(decoded.get_str("ClOrdID"), Some("ORD-1"));
        assert_eq!(decoded.get("Qty"), Some(&Value::Decimal(Decimal::from(10))));
        assert_eq!(decoded.get("Price"), Some(&Value::Decimal(Decimal::new(15050, -2))));
        assert_eq!(decoded.get_i32("Account"), Some(7));
        assert_eq!(decoded.get_str("Memo"), Some(""));

        let header = decoded.get_message(HEADER_MESSAGE_NAME).unwrap();
        assert_eq!(header.get_i32("MessageLength"), Some(34));
        assert_eq!(header.get_str("MessageType"), Some("D"));
    }

    #[test]
    fn test_missing_and_null_fields_write_nothing() {
        let codec = codec(ResyncPolicy::Disconnect);
        let mut dst = BytesMut::new();

        let mut missing = order();
        missing.remove("Qty");
        assert_eq!(
            codec.encode_into(&missing, &mut dst),
            Err(CodecError::MissingField {
                message: "NewOrder".to_string(),
                field: "Qty".to_string()
            })
        );

        let null = order().with("Price", Value::Null);
        assert!(matches!(
            codec.encode_into(&null, &mut dst),
            Err(CodecError::NullFieldValue { .. })
        ));
        assert!(dst.is_empty());
    }

    #[test]
    fn test_unknown_message() {
        let err = codec(ResyncPolicy::Disconnect)
            .encode(&Message::new("Bogus", "TEST"))
            .unwrap_err();
        assert_eq!(err, CodecError::UnknownMessage { name: "Bogus".to_string() });
    }

    #[test]
    fn test_partial_frame_is_not_consumed() {
        let codec = codec(ResyncPolicy::Disconnect);
        let frame = codec.encode(&order()).unwrap();
        let mut buffer = BytesMut::from(&frame[..2]);

        assert!(!codec.decodable(&buffer));
        assert_eq!(codec.decode(&mut buffer).unwrap(), None);
        buffer.extend_from_slice(&frame[2..20]);
        assert_eq!(codec.decode(&mut buffer).unwrap(), None);
        assert_eq!(buffer.len(), 20);
        buffer.extend_from_slice(&frame[20..]);
        assert!(codec.decodable(&buffer));
        assert!(codec.decode(&mut buffer).unwrap().is_some());
    }

    #[test]
    fn test_back_to_back_frames() {
        let codec = codec(ResyncPolicy::Disconnect);
        let mut buffer = BytesMut::new();
        codec.encode_into(&Message::new("Heartbeat", "TEST"), &mut buffer).unwrap();
        codec.encode_into(&order(), &mut buffer).unwrap();

        assert_eq!(codec.decode(&mut buffer).unwrap().unwrap().name(), "Heartbeat");
        assert_eq!(codec.decode(&mut buffer).unwrap().unwrap().name(), "NewOrder");
        assert_eq!(codec.decode(&mut buffer).unwrap(), None);
    }

    #[test]
    fn test_bad_start_of_message_leaves_buffer() {
        let codec = codec(ResyncPolicy::Disconnect);
        let mut buffer = BytesMut::from(&[9u8, 0, 0, b'0'][..]);
        let err = codec.decode(&mut buffer).unwrap_err();
        assert_eq!(err, CodecError::UnexpectedStartOfMessage { found: 9, expected: 2 });
        assert_eq!(buffer.len(), 4);
        assert!(!codec.resync(&mut buffer, &err));
        assert_eq!(buffer.len(), 4);
    }

    #[test]
    fn test_skip_byte_resync() {
        let codec = codec(ResyncPolicy::SkipByte);
        let mut buffer = BytesMut::from(&[0xAAu8, 0xBB][..]);
        codec.encode_into(&Message::new("Heartbeat", "TEST"), &mut buffer).unwrap();

        let mut decoded = None;
        while decoded.is_none() {
            match codec.decode(&mut buffer) {
                Ok(message) => decoded = message,
                Err(err) => assert!(codec.resync(&mut buffer, &err)),
            }
        }
        assert_eq!(decoded.unwrap().name(), "Heartbeat");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_skip_frame_resync() {
        let codec = codec(ResyncPolicy::SkipFrame);
        let mut buffer = BytesMut::from(&[2u8, 2, 0, b'Z', 0xDE, 0xAD][..]);
        codec.encode_into(&Message::new("Heartbeat", "TEST"), &mut buffer).unwrap();

        let err = codec.decode(&mut buffer).unwrap_err();
        assert_eq!(err, CodecError::UnknownMessageType { type_code: b'Z' });
        assert!(codec.resync(&mut buffer, &err));
        assert_eq!(codec.decode(&mut buffer).unwrap().unwrap().name(), "Heartbeat");
    }

    #[test]
    fn test_short_frame_is_dropped() {
        let codec = codec(ResyncPolicy::Disconnect);
        let mut buffer = BytesMut::from(&[2u8, 1, 0, b'D', 0][..]);
        codec.encode_into(&Message::new("Heartbeat", "TEST"), &mut buffer).unwrap();

        let err = codec.decode(&mut buffer).unwrap_err();
        assert!(matches!(err, CodecError::FrameTooShort { required: 34, .. }));
        assert!(codec.resync(&mut buffer, &err));
        assert_eq!(codec.decode(&mut buffer).unwrap().unwrap().name(), "Heartbeat");
    }

    #[test]
    fn test_duplicate_type_code_is_fatal() {
        let clash = MessageSchema::builder("Other", "TEST", b'D').build().unwrap();
        let err = Codec::new(vec![order_schema(), clash], CodecConfig::default()).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateTypeCode { type_code: b'D', .. }));
    }

    #[test]
    fn test_from_dictionary() {
        let dictionary = InMemoryDictionary::new("TEST")
            .with_message(order_schema())
            .unwrap()
            .with_message(heartbeat_schema())
            .unwrap();
        let codec = Codec::from_dictionary(&dictionary, CodecConfig::default()).unwrap();
        assert_eq!(codec.schema_by_type_code(b'0').unwrap().name(), "Heartbeat");
        assert!(codec.schema("NewOrder").is_some());
    }
}
