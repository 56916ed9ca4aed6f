//! Return value encoding.

use bytes::Bytes;

use crate::codec::WireCodec;
use crate::error::{CodecError, RequestFault};
use crate::types::{TypeDescriptor, Value};

/// Encode the value a handler returned for a procedure declaring `return_type`.
///
/// An absent value is a fault: procedures that declare a return type must
/// produce one. The value must belong to the declared type.
pub fn encode_return_value<C: WireCodec + ?Sized>(
    codec: &C,
    procedure: &str,
    return_type: &TypeDescriptor,
    value: Option<Value>,
) -> Result<Bytes, RequestFault> {
    let value = value.ok_or_else(|| RequestFault::NullReturnValue {
        procedure: procedure.to_string(),
        expected_type: codec.type_name(return_type),
    })?;

    if !codec.is_valid_type(return_type) || !return_type.matches(&value) {
        return Err(RequestFault::InvalidReturnType {
            procedure: procedure.to_string(),
            expected: codec.type_name(return_type),
            got: value.type_name(),
        });
    }

    let encoded = if codec.is_structured_type(return_type) {
        match &value {
            Value::Message(message) => codec.write_message(message.as_ref()),
            other => Err(CodecError::TypeMismatch {
                expected: codec.type_name(return_type),
                got: other.type_name(),
            }),
        }
    } else {
        codec.write_scalar(&value, return_type)
    };

    encoded
        .map(Bytes::from)
        .map_err(|source| RequestFault::ReturnValueEncodeError {
            procedure: procedure.to_string(),
            source,
        })
}
