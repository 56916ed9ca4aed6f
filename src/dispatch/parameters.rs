//! Parameter decoding.

use bytes::Bytes;

use crate::codec::WireCodec;
use crate::error::{CodecError, RequestFault};
use crate::registry::ProcedureSignature;
use crate::types::{TypeDescriptor, Value};

/// Decode the raw parameters of a request into ordered values.
///
/// The count is checked before anything is decoded. Message parameters are
/// decoded through a fresh builder per call; everything else is read as a
/// scalar. The first failure aborts the whole decode.
pub fn decode_parameters<C: WireCodec + ?Sized>(
    codec: &C,
    procedure: &ProcedureSignature,
    raw: &[Bytes],
) -> Result<Vec<Value>, RequestFault> {
    let types = procedure.parameter_types();
    if raw.len() != types.len() {
        return Err(RequestFault::ParameterCountMismatch {
            procedure: procedure.fully_qualified_name().to_string(),
            expected: types.len(),
            got: raw.len(),
        });
    }

    types
        .iter()
        .zip(raw)
        .enumerate()
        .map(|(index, (ty, bytes))| {
            decode_one(codec, procedure, index, ty, bytes).map_err(|source| {
                RequestFault::ParameterDecodeError {
                    procedure: procedure.fully_qualified_name().to_string(),
                    index,
                    expected_type: codec.type_name(ty),
                    source,
                }
            })
        })
        .collect()
}

fn decode_one<C: WireCodec + ?Sized>(
    codec: &C,
    procedure: &ProcedureSignature,
    index: usize,
    ty: &TypeDescriptor,
    bytes: &[u8],
) -> Result<Value, CodecError> {
    match ty {
        TypeDescriptor::Message(descriptor) if codec.is_structured_type(ty) => {
            let mut builder = match procedure.parameter_builders().get(index).copied().flatten() {
                Some(factory) => factory(),
                None => codec.message_builder(descriptor),
            };
            builder.merge_from(bytes)?;
            Ok(Value::Message(builder.build()))
        }
        _ => codec.read_scalar(bytes, ty),
    }
}
