//! Codec module - translation between opaque bytes and typed values.
//!
//! The dispatcher only talks to the wire format through the narrow
//! [`WireCodec`] trait. The crate ships one implementation:
//!
//! - [`MsgPackCodec`] - MessagePack using `rmp-serde` (to_vec_named for messages)
//!
//! # Design
//!
//! Scalars and collections are read and written against a
//! [`TypeDescriptor`], so the same descriptor drives decoding of parameters
//! and encoding of return values. Messages carry their own encoder through
//! [`Message`] and are decoded with a per-type [`MessageBuilder`].
//!
//! # Example
//!
//! ```
//! use krpc_dispatch::codec::{MsgPackCodec, WireCodec};
//! use krpc_dispatch::types::{TypeDescriptor, Value};
//!
//! let codec = MsgPackCodec;
//! let ty = TypeDescriptor::list(TypeDescriptor::Int32);
//! let value = Value::List(vec![Value::Int32(1), Value::Int32(2)]);
//!
//! let bytes = codec.write_scalar(&value, &ty).unwrap();
//! assert_eq!(codec.read_scalar(&bytes, &ty).unwrap(), value);
//! ```

mod msgpack;
mod value;

pub use msgpack::MsgPackCodec;

use crate::error::CodecError;
use crate::types::{Message, MessageBuilder, MessageDescriptor, TypeDescriptor, Value};

/// Wire format used by the dispatcher.
///
/// Implementations must be usable from many threads at once.
pub trait WireCodec: Send + Sync {
    /// Whether `ty` is decoded with a message builder rather than a scalar read.
    fn is_structured_type(&self, ty: &TypeDescriptor) -> bool {
        ty.is_message()
    }

    /// Whether values of `ty` can be carried by this codec.
    fn is_valid_type(&self, ty: &TypeDescriptor) -> bool {
        ty.is_valid()
    }

    /// Decode a scalar or collection value of type `ty`.
    fn read_scalar(&self, bytes: &[u8], ty: &TypeDescriptor) -> Result<Value, CodecError>;

    /// Encode a scalar or collection value of type `ty`.
    fn write_scalar(&self, value: &Value, ty: &TypeDescriptor) -> Result<Vec<u8>, CodecError>;

    /// Encode a message.
    fn write_message(&self, message: &dyn Message) -> Result<Vec<u8>, CodecError>;

    /// Display name of `ty`, used in fault messages.
    fn type_name(&self, ty: &TypeDescriptor) -> String {
        ty.to_string()
    }

    /// A fresh builder for a message type.
    fn message_builder(&self, descriptor: &MessageDescriptor) -> Box<dyn MessageBuilder> {
        descriptor.new_builder()
    }
}
