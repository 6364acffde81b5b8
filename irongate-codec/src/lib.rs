//! # IronGate Codec
//!
//! Converts [`Message`](irongate_core::Message) values to and from binary
//! frames using immutable [`MessageSchema`](irongate_schema::MessageSchema)
//! layouts.
//!
//! Encoding writes the fixed header from schema metadata and then every field
//! in schema order. Decoding is two-phase: [`Codec::decodable`] peeks the
//! announced frame length without consuming anything, then [`Codec::decode`]
//! consumes exactly one frame on success and leaves the buffer untouched on
//! failure.
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use irongate_codec::{Codec, CodecConfig};
//! use irongate_core::{FieldType, Message};
//! use irongate_schema::{FieldDescriptor, MessageSchema};
//!
//! let schema = MessageSchema::builder("Quantity", "DEMO", b'Q')
//!     .field(FieldDescriptor::new("Qty", FieldType::Int32, 4))
//!     .build()
//!     .unwrap();
//! let codec = Codec::new(vec![schema], CodecConfig::default()).unwrap();
//!
//! let frame = codec
//!     .encode(&Message::new("Quantity", "DEMO").with("Qty", 2_147_483_647))
//!     .unwrap();
//! assert_eq!(&frame[4..], &[0xFF, 0xFF, 0xFF, 0x7F]);
//!
//! let mut buffer = BytesMut::from(&frame[..]);
//! let decoded = codec.decode(&mut buffer).unwrap().unwrap();
//! assert_eq!(decoded.get_i32("Qty"), Some(2_147_483_647));
//! assert!(buffer.is_empty());
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod field;

pub use codec::Codec;
pub use config::{CodecConfig, ResyncPolicy};
pub use error::{CodecError, Result};
pub use field::{decode_field, encode_field};
