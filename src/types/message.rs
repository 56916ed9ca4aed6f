//! Structured message types.
//!
//! A message type is a plain serde struct that implements [`MessageType`].
//! The blanket [`Message`] impl turns it into an object the dispatcher can
//! carry inside a [`Value`](super::Value) without knowing its concrete type.
//!
//! Messages are decoded with a [`MessageBuilder`]: bytes are merged into a
//! fresh builder, then the builder is finalized into the message. Builders
//! are created per call from the type's [`BuilderFactory`] and never reused.
//!
//! # Example
//!
//! ```
//! use krpc_dispatch::types::{MessageDescriptor, MessageType};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, Default, Clone, PartialEq, Debug)]
//! struct Status {
//!     version: String,
//! }
//!
//! impl MessageType for Status {
//!     const NAME: &'static str = "KRPC.Status";
//! }
//!
//! let descriptor = MessageDescriptor::of::<Status>();
//! let mut builder = descriptor.new_builder();
//! builder.merge_from(&[]).unwrap();
//! let message = builder.build();
//! assert_eq!(message.message_name(), "KRPC.Status");
//! ```

use std::any::{Any, TypeId};
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::MsgPackCodec;
use crate::error::CodecError;

/// A concrete structured type that can be sent over the wire.
///
/// Messages are encoded as MsgPack maps (field names included).
pub trait MessageType:
    Serialize + DeserializeOwned + Default + Clone + PartialEq + fmt::Debug + Send + Sync + 'static
{
    /// Fully qualified message name, e.g. `"KRPC.Status"`.
    const NAME: &'static str;
}

/// Object-safe view of a message value.
pub trait Message: Any + Send + Sync + fmt::Debug {
    /// Fully qualified message name.
    fn message_name(&self) -> &'static str;

    /// Encode to the wire format.
    fn encode_message(&self) -> Result<Vec<u8>, CodecError>;

    /// Clone into a new box.
    fn clone_message(&self) -> Box<dyn Message>;

    /// Compare with another message of any type.
    fn eq_message(&self, other: &dyn Message) -> bool;

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: MessageType> Message for T {
    fn message_name(&self) -> &'static str {
        T::NAME
    }

    fn encode_message(&self) -> Result<Vec<u8>, CodecError> {
        MsgPackCodec::encode(self)
    }

    fn clone_message(&self) -> Box<dyn Message> {
        Box::new(self.clone())
    }

    fn eq_message(&self, other: &dyn Message) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .map_or(false, |other| self == other)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl Clone for Box<dyn Message> {
    fn clone(&self) -> Self {
        self.clone_message()
    }
}

impl PartialEq for dyn Message {
    fn eq(&self, other: &Self) -> bool {
        self.eq_message(other)
    }
}

/// Incremental decoder for one message value.
pub trait MessageBuilder: Send {
    /// Merge encoded bytes into the builder.
    ///
    /// Fields present in `bytes` overwrite the builder's current fields;
    /// absent fields keep their current value (the default, for a fresh
    /// builder). Nested maps merge the same way. Empty input is a no-op.
    fn merge_from(&mut self, bytes: &[u8]) -> Result<(), CodecError>;

    /// Finalize into a message.
    fn build(self: Box<Self>) -> Box<dyn Message>;
}

/// Creates a fresh builder for one message type.
pub type BuilderFactory = fn() -> Box<dyn MessageBuilder>;

struct TypedBuilder<T> {
    value: T,
}

impl<T: MessageType> MessageBuilder for TypedBuilder<T> {
    fn merge_from(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        if bytes.is_empty() {
            return Ok(());
        }

        let incoming = read_value(bytes)?;
        let mut merged = read_value(&MsgPackCodec::encode(&self.value)?)?;
        merge_value(&mut merged, incoming);

        let mut encoded = Vec::new();
        rmpv::encode::write_value(&mut encoded, &merged)
            .map_err(|e| CodecError::MergeEncode(e.to_string()))?;
        self.value = MsgPackCodec::decode(&encoded)?;
        Ok(())
    }

    fn build(self: Box<Self>) -> Box<dyn Message> {
        Box::new(self.value)
    }
}

fn new_typed_builder<T: MessageType>() -> Box<dyn MessageBuilder> {
    Box::new(TypedBuilder::<T> {
        value: T::default(),
    })
}

/// Read exactly one MsgPack value.
fn read_value(bytes: &[u8]) -> Result<rmpv::Value, CodecError> {
    let mut remaining = bytes;
    let value = rmpv::decode::read_value(&mut remaining)?;
    if !remaining.is_empty() {
        return Err(CodecError::TrailingBytes(remaining.len()));
    }
    Ok(value)
}

/// Overlay `incoming` onto `target`. Maps merge key by key; anything else
/// is replaced.
fn merge_value(target: &mut rmpv::Value, incoming: rmpv::Value) {
    match (target, incoming) {
        (rmpv::Value::Map(entries), rmpv::Value::Map(incoming)) => {
            for (key, value) in incoming {
                match entries.iter_mut().find(|(k, _)| *k == key) {
                    Some((_, existing)) => merge_value(existing, value),
                    None => entries.push((key, value)),
                }
            }
        }
        (target, incoming) => *target = incoming,
    }
}

/// Runtime description of a message type.
#[derive(Clone, Copy)]
pub struct MessageDescriptor {
    name: &'static str,
    type_id: TypeId,
    factory: BuilderFactory,
}

impl MessageDescriptor {
    /// Descriptor for `T`.
    pub fn of<T: MessageType>() -> Self {
        Self {
            name: T::NAME,
            type_id: TypeId::of::<T>(),
            factory: new_typed_builder::<T>,
        }
    }

    /// Fully qualified message name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Rust type backing the message.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The builder factory for this type.
    pub fn factory(&self) -> BuilderFactory {
        self.factory
    }

    /// Create a fresh builder.
    pub fn new_builder(&self) -> Box<dyn MessageBuilder> {
        (self.factory)()
    }
}

impl PartialEq for MessageDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for MessageDescriptor {}

impl fmt::Debug for MessageDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MessageDescriptor").field(&self.name).finish()
    }
}
