//! Handler module - the uniform procedure handler and typed adapters.
//!
//! Every procedure is invoked through the same signature, [`HandlerFn`]:
//! ordered [`Value`] arguments in, an optional [`Value`] out. Plain Rust
//! functions are adapted to it once, at registration, through
//! [`IntoHandler`]:
//!
//! ```
//! use krpc_dispatch::handler::{Handler, IntoHandler};
//! use krpc_dispatch::types::{TypeDescriptor, Value};
//! use krpc_dispatch::HandlerError;
//!
//! fn add(a: i32, b: i32) -> Result<i32, HandlerError> {
//!     Ok(a + b)
//! }
//!
//! let handler = Handler::new(add);
//! assert_eq!(handler.parameter_types(), &[TypeDescriptor::Int32, TypeDescriptor::Int32]);
//! assert_eq!(handler.return_type(), Some(&TypeDescriptor::Int32));
//!
//! let result = handler.call(vec![Value::Int32(2), Value::Int32(3)]).unwrap();
//! assert_eq!(result, Some(Value::Int32(5)));
//! ```

mod typed;

use std::fmt;
use std::sync::Arc;

pub use typed::IntoHandler;

use crate::error::HandlerError;
use crate::types::{TypeDescriptor, Value};

/// Result type for handler functions.
pub type HandlerResult = Result<Option<Value>, HandlerError>;

/// The uniform handler signature every procedure is called through.
pub type HandlerFn = dyn Fn(Vec<Value>) -> HandlerResult + Send + Sync;

/// A handler together with the signature it was registered with.
#[derive(Clone)]
pub struct Handler {
    parameter_types: Vec<TypeDescriptor>,
    return_type: Option<TypeDescriptor>,
    call: Arc<HandlerFn>,
}

impl Handler {
    /// Adapt a typed function.
    ///
    /// Parameter and return types are taken from the function signature.
    pub fn new<Args, H: IntoHandler<Args>>(handler: H) -> Self {
        Self {
            parameter_types: H::parameter_types(),
            return_type: H::return_type(),
            call: handler.into_handler_fn(),
        }
    }

    /// Wrap an untyped function with an explicit signature.
    ///
    /// The function receives values already decoded as `parameter_types`.
    /// Its result is checked against `return_type` by the dispatcher.
    pub fn raw<F>(
        parameter_types: Vec<TypeDescriptor>,
        return_type: Option<TypeDescriptor>,
        handler: F,
    ) -> Self
    where
        F: Fn(Vec<Value>) -> HandlerResult + Send + Sync + 'static,
    {
        Self {
            parameter_types,
            return_type,
            call: Arc::new(handler),
        }
    }

    /// Declared parameter types, in order.
    pub fn parameter_types(&self) -> &[TypeDescriptor] {
        &self.parameter_types
    }

    /// Declared return type.
    pub fn return_type(&self) -> Option<&TypeDescriptor> {
        self.return_type.as_ref()
    }

    /// Invoke the handler.
    pub fn call(&self, arguments: Vec<Value>) -> HandlerResult {
        (self.call)(arguments)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("parameter_types", &self.parameter_types)
            .field("return_type", &self.return_type)
            .finish_non_exhaustive()
    }
}
