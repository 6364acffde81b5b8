//! Frame header.
//!
//! Every frame starts with a fixed 4-byte header:
//!
//! ```text
//! +0: startOfMessage (u8, protocol constant, 2 by default)
//! +1: messageLength  (u16 LE, payload bytes following the header)
//! +3: messageType    (u8, schema type code)
//! ```

use crate::buffer::{ReadBuffer, WriteBuffer};
use crate::message::{Message, Value};

/// Default StartOfMessage marker.
pub const DEFAULT_START_OF_MESSAGE: u8 = 2;

/// Name of the nested header sub-message attached to decoded messages.
pub const HEADER_MESSAGE_NAME: &str = "MessageHeader";

/// Header field holding the StartOfMessage marker.
pub const START_OF_MESSAGE_FIELD: &str = "StartOfMessage";

/// Header field holding the payload length.
pub const MESSAGE_LENGTH_FIELD: &str = "MessageLength";

/// Header field holding the type code.
pub const MESSAGE_TYPE_FIELD: &str = "MessageType";

/// Fixed frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// StartOfMessage marker.
    pub start_of_message: u8,
    /// Number of payload bytes after the header.
    pub message_length: u16,
    /// Type code selecting the message schema.
    pub message_type: u8,
}

impl FrameHeader {
    /// Encoded length of the header in bytes.
    pub const ENCODED_LENGTH: usize = 4;
    /// Offset of the StartOfMessage byte.
    pub const START_OF_MESSAGE_OFFSET: usize = 0;
    /// Offset of the MessageLength field.
    pub const MESSAGE_LENGTH_OFFSET: usize = 1;
    /// Offset of the MessageType byte.
    pub const MESSAGE_TYPE_OFFSET: usize = 3;

    /// Creates a new header.
    #[must_use]
    pub const fn new(start_of_message: u8, message_length: u16, message_type: u8) -> Self {
        Self {
            start_of_message,
            message_length,
            message_type,
        }
    }

    /// Decodes a header at the given offset.
    ///
    /// # Panics
    /// Panics if fewer than [`Self::ENCODED_LENGTH`] bytes are available.
    #[inline]
    #[must_use]
    pub fn wrap<B: ReadBuffer + ?Sized>(buffer: &B, offset: usize) -> Self {
        Self {
            start_of_message: buffer.get_u8(offset + Self::START_OF_MESSAGE_OFFSET),
            message_length: buffer.get_u16_le(offset + Self::MESSAGE_LENGTH_OFFSET),
            message_type: buffer.get_u8(offset + Self::MESSAGE_TYPE_OFFSET),
        }
    }

    /// Encodes the header at the given offset.
    #[inline]
    pub fn encode<B: WriteBuffer + ?Sized>(&self, buffer: &mut B, offset: usize) {
        buffer.put_u8(offset + Self::START_OF_MESSAGE_OFFSET, self.start_of_message);
        buffer.put_u16_le(offset + Self::MESSAGE_LENGTH_OFFSET, self.message_length);
        buffer.put_u8(offset + Self::MESSAGE_TYPE_OFFSET, self.message_type);
    }

    /// Reads the MessageLength field without consuming anything.
    ///
    /// Returns `None` when the length field itself is not buffered yet.
    #[must_use]
    pub fn peek_message_length(buffer: &[u8]) -> Option<u16> {
        if buffer.len() < Self::MESSAGE_LENGTH_OFFSET + 2 {
            return None;
        }
        Some(buffer.get_u16_le(Self::MESSAGE_LENGTH_OFFSET))
    }

    /// Returns the total frame size (header + payload).
    #[must_use]
    pub const fn frame_size(&self) -> usize {
        Self::ENCODED_LENGTH + self.message_length as usize
    }

    /// Converts the header into the nested sub-message attached to decoded messages.
    #[must_use]
    pub fn to_message(&self, namespace: &str) -> Message {
        Message::new(HEADER_MESSAGE_NAME, namespace)
            .with(START_OF_MESSAGE_FIELD, Value::Int32(i32::from(self.start_of_message)))
            .with(MESSAGE_LENGTH_FIELD, Value::Int32(i32::from(self.message_length)))
            .with(
                MESSAGE_TYPE_FIELD,
                Value::Str(char::from(self.message_type).to_string()),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_encode_decode() {
        let mut buf = vec![0u8; 8];
        let header = FrameHeader::new(2, 0x0102, b'A');
        header.encode(&mut buf, 0);

        assert_eq!(&buf[..4], &[0x02, 0x02, 0x01, b'A']);
        assert_eq!(FrameHeader::wrap(&buf, 0), header);
        assert_eq!(header.frame_size(), 4 + 0x0102);
    }

    #[test]
    fn test_peek_message_length() {
        assert_eq!(FrameHeader::peek_message_length(&[2, 10]), None);
        assert_eq!(FrameHeader::peek_message_length(&[2, 10, 0]), Some(10));
    }

    #[test]
    fn test_header_as_message() {
        let header = FrameHeader::new(2, 25, b'B');
        let msg = header.to_message("NTG");
        assert_eq!(msg.name(), HEADER_MESSAGE_NAME);
        assert_eq!(msg.get_i32(MESSAGE_LENGTH_FIELD), Some(25));
        assert_eq!(msg.get_str(MESSAGE_TYPE_FIELD), Some("B"));
    }
}
