//! Serde glue between [`Value`] and the wire format.
//!
//! [`Value`] serializes itself structurally. Decoding goes through
//! [`ValueSeed`], which is driven by a [`TypeDescriptor`]: the descriptor,
//! not the bytes, decides which Rust type each element is read as, so a
//! wire integer can never come back as a bool or a list of the wrong type.

use std::fmt;

use serde::de::{self, DeserializeSeed, MapAccess, SeqAccess, Visitor};
use serde::ser::{self, SerializeMap, SerializeSeq, SerializeTuple};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::types::{TypeDescriptor, Value};

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Double(v) => serializer.serialize_f64(*v),
            Value::Float(v) => serializer.serialize_f32(*v),
            Value::Int32(v) => serializer.serialize_i32(*v),
            Value::Int64(v) => serializer.serialize_i64(*v),
            Value::UInt32(v) => serializer.serialize_u32(*v),
            Value::UInt64(v) => serializer.serialize_u64(*v),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::String(v) => serializer.serialize_str(v),
            Value::Bytes(v) => serializer.serialize_bytes(v),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Dictionary(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Value::Tuple(items) => {
                let mut tuple = serializer.serialize_tuple(items.len())?;
                for item in items {
                    tuple.serialize_element(item)?;
                }
                tuple.end()
            }
            Value::Message(message) => Err(ser::Error::custom(format!(
                "message {} cannot be written as a scalar",
                message.message_name()
            ))),
        }
    }
}

/// Deserializes one [`Value`] of a known type.
pub(crate) struct ValueSeed<'a>(pub(crate) &'a TypeDescriptor);

impl<'de, 'a> DeserializeSeed<'de> for ValueSeed<'a> {
    type Value = Value;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        match self.0 {
            TypeDescriptor::Double => f64::deserialize(deserializer).map(Value::Double),
            TypeDescriptor::Float => f32::deserialize(deserializer).map(Value::Float),
            TypeDescriptor::Int32 => i32::deserialize(deserializer).map(Value::Int32),
            TypeDescriptor::Int64 => i64::deserialize(deserializer).map(Value::Int64),
            TypeDescriptor::UInt32 => u32::deserialize(deserializer).map(Value::UInt32),
            TypeDescriptor::UInt64 => u64::deserialize(deserializer).map(Value::UInt64),
            TypeDescriptor::Bool => bool::deserialize(deserializer).map(Value::Bool),
            TypeDescriptor::String => String::deserialize(deserializer).map(Value::String),
            TypeDescriptor::Bytes => serde_bytes::ByteBuf::deserialize(deserializer)
                .map(|buf| Value::Bytes(buf.into_vec().into())),
            TypeDescriptor::List(element) => deserializer.deserialize_seq(ListVisitor(element)),
            TypeDescriptor::Dictionary(key, value) => {
                deserializer.deserialize_map(DictionaryVisitor(key, value))
            }
            TypeDescriptor::Tuple(types) => {
                deserializer.deserialize_tuple(types.len(), TupleVisitor(types))
            }
            TypeDescriptor::Message(descriptor) => Err(de::Error::custom(format!(
                "message {} cannot be read as a scalar",
                descriptor.name()
            ))),
        }
    }
}

struct ListVisitor<'a>(&'a TypeDescriptor);

impl<'de, 'a> Visitor<'de> for ListVisitor<'a> {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a list of {}", self.0)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0).min(4096));
        while let Some(item) = seq.next_element_seed(ValueSeed(self.0))? {
            items.push(item);
        }
        Ok(Value::List(items))
    }
}

struct DictionaryVisitor<'a>(&'a TypeDescriptor, &'a TypeDescriptor);

impl<'de, 'a> Visitor<'de> for DictionaryVisitor<'a> {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a dictionary from {} to {}", self.0, self.1)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Value, A::Error> {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0).min(4096));
        while let Some(key) = map.next_key_seed(ValueSeed(self.0))? {
            let value = map.next_value_seed(ValueSeed(self.1))?;
            entries.push((key, value));
        }
        Ok(Value::Dictionary(entries))
    }
}

struct TupleVisitor<'a>(&'a [TypeDescriptor]);

impl<'de, 'a> Visitor<'de> for TupleVisitor<'a> {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a tuple of {} elements", self.0.len())
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::with_capacity(self.0.len());
        for (i, ty) in self.0.iter().enumerate() {
            match seq.next_element_seed(ValueSeed(ty))? {
                Some(item) => items.push(item),
                None => return Err(de::Error::invalid_length(i, &self)),
            }
        }
        Ok(Value::Tuple(items))
    }
}
