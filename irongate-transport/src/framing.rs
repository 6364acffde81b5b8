//! Message framing codec for byte streams.
//!
//! Frames are delimited by the fixed header's MessageLength field, so no extra
//! length prefix is added on the wire.

use crate::error::TransportError;
use bytes::BytesMut;
use irongate_codec::{Codec, CodecError};
use irongate_core::Message;
use std::sync::Arc;
use tokio_util::codec::{Decoder, Encoder};

/// `tokio_util` codec over a shared [`Codec`].
///
/// Decoded items are `Result<Message, CodecError>`: a frame that fails to
/// decode field-wise is dropped and reported as an `Err` item while the stream
/// keeps going. Protocol errors follow the codec's resync policy; under
/// `Disconnect` they end the stream with [`TransportError::Codec`].
#[derive(Debug, Clone)]
pub struct FrameCodec {
    codec: Arc<Codec>,
}

impl FrameCodec {
    /// Creates a frame codec.
    #[must_use]
    pub fn new(codec: Arc<Codec>) -> Self {
        Self { codec }
    }

    /// Returns the underlying message codec.
    #[must_use]
    pub fn codec(&self) -> &Arc<Codec> {
        &self.codec
    }
}

impl Decoder for FrameCodec {
    type Item = Result<Message, CodecError>;
    type Error = TransportError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.codec.decode(src) {
                Ok(Some(message)) => return Ok(Some(Ok(message))),
                Ok(None) => {
                    if let Some(len) = Codec::frame_length(src) {
                        src.reserve(len.saturating_sub(src.len()));
                    }
                    return Ok(None);
                }
                Err(err) => {
                    if !self.codec.resync(src, &err) {
                        return Err(TransportError::Codec(err));
                    }
                    if err.is_protocol_error() {
                        tracing::warn!(error = %err, "resynchronising byte stream");
                        continue;
                    }
                    tracing::debug!(error = %err, "dropped undecodable frame");
                    return Ok(Some(Err(err)));
                }
            }
        }
    }
}

impl Encoder<&Message> for FrameCodec {
    type Error = TransportError;

    fn encode(&mut self, item: &Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.codec.encode_into(item, dst).map_err(TransportError::Codec)
    }
}

impl Encoder<Message> for FrameCodec {
    type Error = TransportError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        <Self as Encoder<&Message>>::encode(self, &item, dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{SinkExt, StreamExt};
    use irongate_codec::{CodecConfig, ResyncPolicy};
    use irongate_core::FieldType;
    use irongate_schema::{FieldDescriptor, MessageSchema};
    use tokio_util::codec::{FramedRead, FramedWrite};

    fn codec(policy: ResyncPolicy) -> FrameCodec {
        let ping = MessageSchema::builder("Ping", "T", b'P')
            .field(FieldDescriptor::new("Seq", FieldType::Int32, 4))
            .build()
            .unwrap();
        FrameCodec::new(Arc::new(
            Codec::new(vec![ping], CodecConfig::default().resync_policy(policy)).unwrap(),
        ))
    }

    fn ping(seq: i32) -> Message {
        Message::new("Ping", "T").with("Seq", seq)
    }

    #[test]
    fn test_encode_decode() {
        let mut codec = codec(ResyncPolicy::Disconnect);
        let mut buf = BytesMut::new();
        codec.encode(&ping(7), &mut buf).unwrap();
        assert_eq!(buf.len(), 8);

        let decoded = codec.decode(&mut buf).unwrap().unwrap().unwrap();
        assert_eq!(decoded.get_i32("Seq"), Some(7));
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_disconnect_policy_ends_stream() {
        let mut codec = codec(ResyncPolicy::Disconnect);
        let mut buf = BytesMut::from(&[0x55u8, 0, 0, 0][..]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(TransportError::Codec(CodecError::UnexpectedStartOfMessage { .. }))
        ));
    }

    #[test]
    fn test_skip_byte_policy_recovers() {
        let mut codec = codec(ResyncPolicy::SkipByte);
        let mut buf = BytesMut::from(&[0x55u8, 0x66][..]);
        codec.encode(&ping(3), &mut buf).unwrap();

        let decoded = codec.decode(&mut buf).unwrap().unwrap().unwrap();
        assert_eq!(decoded.get_i32("Seq"), Some(3));
    }

    #[test]
    fn test_field_error_yields_item_and_continues() {
        let mut codec = codec(ResyncPolicy::Disconnect);
        let mut buf = BytesMut::from(&[2u8, 1, 0, b'P', 0][..]);
        codec.encode(&ping(9), &mut buf).unwrap();

        assert!(matches!(
            codec.decode(&mut buf),
            Ok(Some(Err(CodecError::FrameTooShort { .. })))
        ));
        let decoded = codec.decode(&mut buf).unwrap().unwrap().unwrap();
        assert_eq!(decoded.get_i32("Seq"), Some(9));
    }

    #[tokio::test]
    async fn test_framed_over_duplex() {
        let (client, server) = tokio::io::duplex(1024);
        let mut writer = FramedWrite::new(client, codec(ResyncPolicy::Disconnect));
        let mut reader = FramedRead::new(server, codec(ResyncPolicy::Disconnect));

        for seq in 0..3 {
            writer.send(ping(seq)).await.unwrap();
        }
        drop(writer);

        let mut seen = Vec::new();
        while let Some(item) = reader.next().await {
            seen.push(item.unwrap().unwrap().get_i32("Seq").unwrap());
        }
        assert_eq!(seen, vec![0, 1, 2]);
    }
}
