//! Type model - descriptors and runtime values.
//!
//! Every procedure parameter and return value is described by a
//! [`TypeDescriptor`]. At runtime the dispatcher moves arguments and results
//! around as [`Value`]s, without knowing the concrete Rust types of the
//! handler it calls.
//!
//! - [`TypeDescriptor`] - wire type of a parameter or return value
//! - [`Value`] - a decoded value of any wire type
//! - [`Message`] / [`MessageType`] - structured (message) types
//! - [`MessageBuilder`] - merge-then-finalize decoder for one message
//! - [`WireType`] / [`IntoReturn`] - conversions used by typed handlers

mod message;
mod wire_type;

use std::any::TypeId;
use std::fmt;

pub use message::{BuilderFactory, Message, MessageBuilder, MessageDescriptor, MessageType};
pub use wire_type::{IntoReturn, WireType};

/// Wire type of a procedure parameter or return value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDescriptor {
    Double,
    Float,
    Int32,
    Int64,
    UInt32,
    UInt64,
    Bool,
    String,
    Bytes,
    /// Ordered sequence of one element type.
    List(Box<TypeDescriptor>),
    /// Key/value map.
    Dictionary(Box<TypeDescriptor>, Box<TypeDescriptor>),
    /// Fixed-length heterogeneous sequence.
    Tuple(Vec<TypeDescriptor>),
    /// Structured message type.
    Message(MessageDescriptor),
}

impl TypeDescriptor {
    /// Descriptor for a list of `element`.
    pub fn list(element: TypeDescriptor) -> Self {
        TypeDescriptor::List(Box::new(element))
    }

    /// Descriptor for a dictionary from `key` to `value`.
    pub fn dictionary(key: TypeDescriptor, value: TypeDescriptor) -> Self {
        TypeDescriptor::Dictionary(Box::new(key), Box::new(value))
    }

    /// Descriptor for the message type `T`.
    pub fn message<T: MessageType>() -> Self {
        TypeDescriptor::Message(MessageDescriptor::of::<T>())
    }

    /// Whether this is a structured message type.
    pub fn is_message(&self) -> bool {
        matches!(self, TypeDescriptor::Message(_))
    }

    /// Whether values of this type can be carried over the wire.
    ///
    /// Collections may not contain messages, dictionary keys must be integers,
    /// bools or strings, and tuples must have at least one element.
    pub fn is_valid(&self) -> bool {
        match self {
            TypeDescriptor::List(element) => element.is_valid_element(),
            TypeDescriptor::Dictionary(key, value) => {
                key.is_valid_key() && value.is_valid_element()
            }
            TypeDescriptor::Tuple(elements) => {
                !elements.is_empty() && elements.iter().all(TypeDescriptor::is_valid_element)
            }
            _ => true,
        }
    }

    fn is_valid_element(&self) -> bool {
        !self.is_message() && self.is_valid()
    }

    fn is_valid_key(&self) -> bool {
        matches!(
            self,
            TypeDescriptor::Int32
                | TypeDescriptor::Int64
                | TypeDescriptor::UInt32
                | TypeDescriptor::UInt64
                | TypeDescriptor::Bool
                | TypeDescriptor::String
        )
    }

    /// Whether `value` belongs to this type.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (TypeDescriptor::Double, Value::Double(_))
            | (TypeDescriptor::Float, Value::Float(_))
            | (TypeDescriptor::Int32, Value::Int32(_))
            | (TypeDescriptor::Int64, Value::Int64(_))
            | (TypeDescriptor::UInt32, Value::UInt32(_))
            | (TypeDescriptor::UInt64, Value::UInt64(_))
            | (TypeDescriptor::Bool, Value::Bool(_))
            | (TypeDescriptor::String, Value::String(_))
            | (TypeDescriptor::Bytes, Value::Bytes(_)) => true,
            (TypeDescriptor::List(element), Value::List(items)) => {
                items.iter().all(|item| element.matches(item))
            }
            (TypeDescriptor::Dictionary(key, value), Value::Dictionary(entries)) => entries
                .iter()
                .all(|(k, v)| key.matches(k) && value.matches(v)),
            (TypeDescriptor::Tuple(types), Value::Tuple(items)) => {
                types.len() == items.len()
                    && types.iter().zip(items).all(|(ty, item)| ty.matches(item))
            }
            (TypeDescriptor::Message(descriptor), Value::Message(message)) => {
                descriptor.type_id() == message.as_any().type_id()
            }
            _ => false,
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Double => f.write_str("double"),
            TypeDescriptor::Float => f.write_str("float"),
            TypeDescriptor::Int32 => f.write_str("int32"),
            TypeDescriptor::Int64 => f.write_str("int64"),
            TypeDescriptor::UInt32 => f.write_str("uint32"),
            TypeDescriptor::UInt64 => f.write_str("uint64"),
            TypeDescriptor::Bool => f.write_str("bool"),
            TypeDescriptor::String => f.write_str("string"),
            TypeDescriptor::Bytes => f.write_str("bytes"),
            TypeDescriptor::List(element) => write!(f, "list({})", element),
            TypeDescriptor::Dictionary(key, value) => write!(f, "dictionary({},{})", key, value),
            TypeDescriptor::Tuple(elements) => {
                f.write_str("tuple(")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", element)?;
                }
                f.write_str(")")
            }
            TypeDescriptor::Message(descriptor) => f.write_str(descriptor.name()),
        }
    }
}

/// A decoded value of any wire type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Double(f64),
    Float(f32),
    Int32(i32),
    Int64(i64),
    UInt32(u32),
    UInt64(u64),
    Bool(bool),
    String(String),
    Bytes(bytes::Bytes),
    List(Vec<Value>),
    /// Entries in wire order.
    Dictionary(Vec<(Value, Value)>),
    Tuple(Vec<Value>),
    Message(Box<dyn Message>),
}

impl Value {
    /// Runtime type name, for diagnostics.
    pub fn type_name(&self) -> String {
        match self {
            Value::Double(_) => "double".to_string(),
            Value::Float(_) => "float".to_string(),
            Value::Int32(_) => "int32".to_string(),
            Value::Int64(_) => "int64".to_string(),
            Value::UInt32(_) => "uint32".to_string(),
            Value::UInt64(_) => "uint64".to_string(),
            Value::Bool(_) => "bool".to_string(),
            Value::String(_) => "string".to_string(),
            Value::Bytes(_) => "bytes".to_string(),
            Value::List(_) => "list".to_string(),
            Value::Dictionary(_) => "dictionary".to_string(),
            Value::Tuple(items) => format!("tuple of {}", items.len()),
            Value::Message(message) => message.message_name().to_string(),
        }
    }

    /// Wrap a message value.
    pub fn message<T: MessageType>(message: T) -> Self {
        Value::Message(Box::new(message))
    }

    /// Take the message out of this value if it holds a `T`.
    pub fn into_message<T: MessageType>(self) -> Option<T> {
        match self {
            Value::Message(message) if message.as_any().type_id() == TypeId::of::<T>() => message
                .into_any()
                .downcast::<T>()
                .ok()
                .map(|boxed| *boxed),
            _ => None,
        }
    }
}
