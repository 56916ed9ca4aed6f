//! Typed handler adapters.
//!
//! [`IntoHandler`] is implemented for functions of zero to six arguments
//! whose arguments are [`WireType`]s and whose return is
//! `Result<R, HandlerError>` with `R: IntoReturn`. The conversion from
//! [`Value`]s happens inside the adapter, so the dispatcher never sees the
//! concrete types.

use std::sync::Arc;

use super::{HandlerFn, HandlerResult};
use crate::error::{CodecError, HandlerError};
use crate::types::{IntoReturn, TypeDescriptor, Value, WireType};

/// A function that can be registered as a procedure handler.
///
/// `Args` is a tuple of the function's argument types; it only exists to
/// keep the impls for different arities apart and is always inferred.
pub trait IntoHandler<Args>: Send + Sync + 'static {
    /// Wire types of the arguments, in order.
    fn parameter_types() -> Vec<TypeDescriptor>;

    /// Declared return type.
    fn return_type() -> Option<TypeDescriptor>;

    /// Wrap into the uniform handler signature.
    fn into_handler_fn(self) -> Arc<HandlerFn>;
}

fn missing_argument(index: usize) -> HandlerError {
    anyhow::anyhow!("argument {} is missing", index)
}

fn bad_argument(index: usize, err: CodecError) -> HandlerError {
    HandlerError::new(err).context(format!("argument {}", index))
}

macro_rules! impl_into_handler {
    ($($arg:ident),*) => {
        #[allow(non_snake_case, unused_mut, unused_variables, unused_assignments)]
        impl<F, R, $($arg,)*> IntoHandler<($($arg,)*)> for F
        where
            F: Fn($($arg),*) -> Result<R, HandlerError> + Send + Sync + 'static,
            R: IntoReturn,
            $($arg: WireType,)*
        {
            fn parameter_types() -> Vec<TypeDescriptor> {
                vec![$($arg::descriptor()),*]
            }

            fn return_type() -> Option<TypeDescriptor> {
                R::return_type()
            }

            fn into_handler_fn(self) -> Arc<HandlerFn> {
                Arc::new(move |arguments: Vec<Value>| -> HandlerResult {
                    let mut arguments = arguments.into_iter();
                    let mut position = 0usize;
                    $(
                        let $arg = match arguments.next() {
                            Some(value) => $arg::from_value(value)
                                .map_err(|err| bad_argument(position, err))?,
                            None => return Err(missing_argument(position)),
                        };
                        position += 1;
                    )*
                    let result = (self)($($arg),*)?;
                    Ok(result.into_return())
                })
            }
        }
    };
}

impl_into_handler!();
impl_into_handler!(A1);
impl_into_handler!(A1, A2);
impl_into_handler!(A1, A2, A3);
impl_into_handler!(A1, A2, A3, A4);
impl_into_handler!(A1, A2, A3, A4, A5);
impl_into_handler!(A1, A2, A3, A4, A5, A6);
