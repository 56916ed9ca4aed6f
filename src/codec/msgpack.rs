//! MsgPack codec using `rmp-serde`.
//!
//! Messages are always encoded with `to_vec_named`, never `to_vec`: struct
//! fields go on the wire as a map keyed by field name, so clients in other
//! languages can decode them without knowing the Rust field order.
//!
//! Scalars and collections use plain MessagePack values. A `bytes` value is
//! a MessagePack bin, a tuple is an array.
//!
//! # Example
//!
//! ```
//! use krpc_dispatch::codec::MsgPackCodec;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Status {
//!     version: String,
//!     bytes_read: u64,
//! }
//!
//! let status = Status { version: "0.1.0".to_string(), bytes_read: 42 };
//! let encoded = MsgPackCodec::encode(&status).unwrap();
//! let decoded: Status = MsgPackCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, status);
//! ```

use serde::de::DeserializeSeed;

use super::value::ValueSeed;
use super::WireCodec;
use crate::error::CodecError;
use crate::types::{Message, TypeDescriptor, Value};

/// MessagePack wire codec.
///
/// Stateless; one instance can be shared by any number of dispatchers.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgPackCodec;

impl MsgPackCodec {
    /// Encode a value to MsgPack bytes.
    ///
    /// Uses `to_vec_named` for struct-as-map format.
    ///
    /// # Errors
    ///
    /// Returns error if the value cannot be serialized.
    #[inline]
    pub fn encode<T: serde::Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CodecError> {
        // to_vec_named, NOT to_vec!
        Ok(rmp_serde::to_vec_named(value)?)
    }

    /// Decode MsgPack bytes to a value.
    ///
    /// # Errors
    ///
    /// Returns error if the bytes cannot be deserialized to type T.
    #[inline]
    pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

impl WireCodec for MsgPackCodec {
    fn read_scalar(&self, bytes: &[u8], ty: &TypeDescriptor) -> Result<Value, CodecError> {
        if ty.is_message() {
            return Err(CodecError::NotScalar(ty.to_string()));
        }

        let mut remaining = bytes;
        let value = {
            let mut deserializer = rmp_serde::Deserializer::new(&mut remaining);
            ValueSeed(ty).deserialize(&mut deserializer)?
        };

        if !remaining.is_empty() {
            return Err(CodecError::TrailingBytes(remaining.len()));
        }
        Ok(value)
    }

    fn write_scalar(&self, value: &Value, ty: &TypeDescriptor) -> Result<Vec<u8>, CodecError> {
        if ty.is_message() {
            return Err(CodecError::NotScalar(ty.to_string()));
        }
        if !ty.matches(value) {
            return Err(CodecError::TypeMismatch {
                expected: ty.to_string(),
                got: value.type_name(),
            });
        }
        Self::encode(value)
    }

    fn write_message(&self, message: &dyn Message) -> Result<Vec<u8>, CodecError> {
        message.encode_message()
    }
}
