//! Conversions between Rust types and [`Value`]s.
//!
//! [`WireType`] is what lets a plain Rust function be registered as a
//! procedure: its parameter types and return type are turned into
//! [`TypeDescriptor`]s once, at registration, and arguments are converted
//! back from [`Value`]s on every call.
//!
//! Message types opt in with [`wire_message!`](crate::wire_message).

use std::collections::HashMap;
use std::hash::Hash;

use bytes::Bytes;

use super::{TypeDescriptor, Value};
use crate::error::CodecError;

/// A Rust type with a fixed wire type.
pub trait WireType: Sized + Send + 'static {
    /// The wire type of `Self`.
    fn descriptor() -> TypeDescriptor;

    /// Convert a decoded value into `Self`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::TypeMismatch`] if the value has another type.
    fn from_value(value: Value) -> Result<Self, CodecError>;

    /// Convert `self` into a value.
    fn into_value(self) -> Value;
}

/// What a handler function returns.
///
/// `()` declares no return type. `Option<T>` declares `T` but may produce
/// no value, which the dispatcher reports as a null return.
pub trait IntoReturn: Send + 'static {
    /// Declared return type, `None` for procedures without one.
    fn return_type() -> Option<TypeDescriptor>;

    /// Convert into the value handed to the return value codec.
    fn into_return(self) -> Option<Value>;
}

pub(crate) fn mismatch(expected: &TypeDescriptor, got: &Value) -> CodecError {
    CodecError::TypeMismatch {
        expected: expected.to_string(),
        got: got.type_name(),
    }
}

macro_rules! scalar_wire_type {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl WireType for $ty {
                fn descriptor() -> TypeDescriptor {
                    TypeDescriptor::$variant
                }

                fn from_value(value: Value) -> Result<Self, CodecError> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => Err(mismatch(&TypeDescriptor::$variant, &other)),
                    }
                }

                fn into_value(self) -> Value {
                    Value::$variant(self)
                }
            }

            impl IntoReturn for $ty {
                fn return_type() -> Option<TypeDescriptor> {
                    Some(<$ty as WireType>::descriptor())
                }

                fn into_return(self) -> Option<Value> {
                    Some(self.into_value())
                }
            }
        )*
    };
}

scalar_wire_type! {
    f64 => Double,
    f32 => Float,
    i32 => Int32,
    i64 => Int64,
    u32 => UInt32,
    u64 => UInt64,
    bool => Bool,
    String => String,
    Bytes => Bytes,
}

impl<T: WireType> WireType for Vec<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::list(T::descriptor())
    }

    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(mismatch(&Self::descriptor(), &other)),
        }
    }

    fn into_value(self) -> Value {
        Value::List(self.into_iter().map(WireType::into_value).collect())
    }
}

impl<T: WireType> IntoReturn for Vec<T> {
    fn return_type() -> Option<TypeDescriptor> {
        Some(Self::descriptor())
    }

    fn into_return(self) -> Option<Value> {
        Some(self.into_value())
    }
}

impl<K, V> WireType for HashMap<K, V>
where
    K: WireType + Eq + Hash,
    V: WireType,
{
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::dictionary(K::descriptor(), V::descriptor())
    }

    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Dictionary(entries) => entries
                .into_iter()
                .map(|(k, v)| Ok((K::from_value(k)?, V::from_value(v)?)))
                .collect(),
            other => Err(mismatch(&Self::descriptor(), &other)),
        }
    }

    fn into_value(self) -> Value {
        Value::Dictionary(
            self.into_iter()
                .map(|(k, v)| (k.into_value(), v.into_value()))
                .collect(),
        )
    }
}

impl<K, V> IntoReturn for HashMap<K, V>
where
    K: WireType + Eq + Hash,
    V: WireType,
{
    fn return_type() -> Option<TypeDescriptor> {
        Some(Self::descriptor())
    }

    fn into_return(self) -> Option<Value> {
        Some(self.into_value())
    }
}

fn next_item(items: &mut impl Iterator<Item = Value>) -> Result<Value, CodecError> {
    items.next().ok_or_else(|| CodecError::TypeMismatch {
        expected: "tuple element".to_string(),
        got: "end of tuple".to_string(),
    })
}

macro_rules! tuple_wire_type {
    ($len:expr; $($name:ident),+) => {
        #[allow(non_snake_case)]
        impl<$($name: WireType),+> WireType for ($($name,)+) {
            fn descriptor() -> TypeDescriptor {
                TypeDescriptor::Tuple(vec![$($name::descriptor()),+])
            }

            fn from_value(value: Value) -> Result<Self, CodecError> {
                match value {
                    Value::Tuple(items) if items.len() == $len => {
                        let mut items = items.into_iter();
                        $(
                            let $name = $name::from_value(next_item(&mut items)?)?;
                        )+
                        Ok(($($name,)+))
                    }
                    other => Err(mismatch(&Self::descriptor(), &other)),
                }
            }

            fn into_value(self) -> Value {
                let ($($name,)+) = self;
                Value::Tuple(vec![$($name.into_value()),+])
            }
        }

        impl<$($name: WireType),+> IntoReturn for ($($name,)+) {
            fn return_type() -> Option<TypeDescriptor> {
                Some(Self::descriptor())
            }

            fn into_return(self) -> Option<Value> {
                Some(self.into_value())
            }
        }
    };
}

tuple_wire_type!(2; A, B);
tuple_wire_type!(3; A, B, C);
tuple_wire_type!(4; A, B, C, D);

impl IntoReturn for () {
    fn return_type() -> Option<TypeDescriptor> {
        None
    }

    fn into_return(self) -> Option<Value> {
        None
    }
}

impl<T: WireType> IntoReturn for Option<T> {
    fn return_type() -> Option<TypeDescriptor> {
        Some(T::descriptor())
    }

    fn into_return(self) -> Option<Value> {
        self.map(WireType::into_value)
    }
}

/// Implement [`WireType`] and [`IntoReturn`] for message types.
///
/// Each type must already implement
/// [`MessageType`](crate::types::MessageType).
///
/// # Example
///
/// ```
/// use krpc_dispatch::types::MessageType;
/// use krpc_dispatch::wire_message;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize, Default, Clone, PartialEq, Debug)]
/// struct Status {
///     version: String,
/// }
///
/// impl MessageType for Status {
///     const NAME: &'static str = "KRPC.Status";
/// }
///
/// wire_message!(Status);
/// ```
#[macro_export]
macro_rules! wire_message {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::types::WireType for $ty {
                fn descriptor() -> $crate::types::TypeDescriptor {
                    $crate::types::TypeDescriptor::message::<$ty>()
                }

                fn from_value(
                    value: $crate::types::Value,
                ) -> ::std::result::Result<Self, $crate::CodecError> {
                    let got = value.type_name();
                    value
                        .into_message::<$ty>()
                        .ok_or_else(|| $crate::CodecError::TypeMismatch {
                            expected: <$ty as $crate::types::MessageType>::NAME.to_string(),
                            got,
                        })
                }

                fn into_value(self) -> $crate::types::Value {
                    $crate::types::Value::message(self)
                }
            }

            impl $crate::types::IntoReturn for $ty {
                fn return_type() -> ::std::option::Option<$crate::types::TypeDescriptor> {
                    ::std::option::Option::Some(
                        <$ty as $crate::types::WireType>::descriptor(),
                    )
                }

                fn into_return(self) -> ::std::option::Option<$crate::types::Value> {
                    ::std::option::Option::Some($crate::types::Value::message(self))
                }
            }
        )+
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MessageType;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, Default, Clone, PartialEq, Debug)]
    struct Vessel {
        name: String,
    }

    impl MessageType for Vessel {
        const NAME: &'static str = "SpaceCenter.Vessel";
    }

    crate::wire_message!(Vessel);

    #[test]
    fn test_scalar_descriptors() {
        assert_eq!(f64::descriptor(), TypeDescriptor::Double);
        assert_eq!(u64::descriptor(), TypeDescriptor::UInt64);
        assert_eq!(Bytes::descriptor(), TypeDescriptor::Bytes);
        assert_eq!(
            <Vec<String>>::descriptor(),
            TypeDescriptor::list(TypeDescriptor::String)
        );
        assert_eq!(
            <(bool, i32)>::descriptor(),
            TypeDescriptor::Tuple(vec![TypeDescriptor::Bool, TypeDescriptor::Int32])
        );
    }

    #[test]
    fn test_from_value_rejects_other_types() {
        assert_eq!(i32::from_value(Value::Int32(7)).unwrap(), 7);
        assert!(matches!(
            i32::from_value(Value::String("7".to_string())),
            Err(CodecError::TypeMismatch { .. })
        ));
        assert!(<Vec<i32>>::from_value(Value::List(vec![Value::Bool(true)])).is_err());
    }

    #[test]
    fn test_dictionary_conversion() {
        let mut map = HashMap::new();
        map.insert("apoapsis".to_string(), 80_000.0f64);
        let value = map.clone().into_value();
        assert!(<HashMap<String, f64>>::descriptor().matches(&value));
        assert_eq!(<HashMap<String, f64>>::from_value(value).unwrap(), map);
    }

    #[test]
    fn test_tuple_conversion() {
        let value = (1u32, "a".to_string(), false).into_value();
        let back = <(u32, String, bool)>::from_value(value).unwrap();
        assert_eq!(back, (1, "a".to_string(), false));
        assert!(<(u32, u32)>::from_value(Value::Tuple(vec![Value::UInt32(1)])).is_err());
    }

    #[test]
    fn test_message_conversion() {
        let vessel = Vessel {
            name: "Kerbal X".to_string(),
        };
        let value = vessel.clone().into_value();
        assert_eq!(Vessel::descriptor(), TypeDescriptor::message::<Vessel>());
        assert_eq!(Vessel::from_value(value).unwrap(), vessel);
        assert!(Vessel::from_value(Value::Int32(0)).is_err());
    }

    #[test]
    fn test_return_types() {
        assert_eq!(<() as IntoReturn>::return_type(), None);
        assert_eq!(().into_return(), None);
        assert_eq!(
            <Option<i64> as IntoReturn>::return_type(),
            Some(TypeDescriptor::Int64)
        );
        assert_eq!(None::<i64>.into_return(), None);
        assert_eq!(Some(3i64).into_return(), Some(Value::Int64(3)));
        assert_eq!(
            <Vessel as IntoReturn>::return_type(),
            Some(TypeDescriptor::message::<Vessel>())
        );
    }
}
