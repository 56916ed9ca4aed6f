//! Request dispatcher.
//!
//! The [`Dispatcher`] turns one [`Request`] into one [`Response`] or
//! [`RequestFault`]:
//! 1. Look up the service
//! 2. Look up the procedure
//! 3. Decode the parameters
//! 4. Invoke the handler
//! 5. Encode the return value, if the procedure declares one
//!
//! It holds no mutable state. Share one instance (or clones of the registry
//! `Arc`) between as many threads as the transport uses.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use krpc_dispatch::codec::MsgPackCodec;
//! use krpc_dispatch::{Dispatcher, HandlerError, Registry, Request, ServiceDefinition};
//!
//! fn add(a: i32, b: i32) -> Result<i32, HandlerError> {
//!     Ok(a + b)
//! }
//!
//! let registry = Registry::builder()
//!     .service(ServiceDefinition::new("KRPC").procedure("Add", add))
//!     .build()
//!     .unwrap();
//! let dispatcher = Dispatcher::new(Arc::new(registry));
//!
//! let request = Request::new("KRPC", "Add")
//!     .parameter(MsgPackCodec::encode(&2).unwrap())
//!     .parameter(MsgPackCodec::encode(&3).unwrap());
//! let response = dispatcher.handle(&request).unwrap();
//!
//! let sum: i32 = MsgPackCodec::decode(response.return_value.as_ref().unwrap()).unwrap();
//! assert_eq!(sum, 5);
//! ```

mod parameters;
mod return_value;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use bytes::Bytes;

pub use parameters::decode_parameters;
pub use return_value::encode_return_value;

use crate::codec::{MsgPackCodec, WireCodec};
use crate::error::{self, RequestFault};
use crate::handler::HandlerResult;
use crate::registry::{ProcedureSignature, Registry};
use crate::types::Value;

/// Default for [`DispatcherConfig::catch_panics`].
pub const DEFAULT_CATCH_PANICS: bool = true;

/// A decoded call, as framed by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub service: String,
    pub procedure: String,
    /// Raw encoded arguments, in declaration order.
    pub parameters: Vec<Bytes>,
}

impl Request {
    /// Create a request with no parameters.
    pub fn new(service: impl Into<String>, procedure: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            procedure: procedure.into(),
            parameters: Vec::new(),
        }
    }

    /// Append an encoded parameter.
    pub fn parameter(mut self, bytes: impl Into<Bytes>) -> Self {
        self.parameters.push(bytes.into());
        self
    }
}

/// Result of a successful call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    /// Encoded return value; present iff the procedure declares a return type.
    pub return_value: Option<Bytes>,
}

/// Dispatcher configuration.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Turn handler panics into [`RequestFault::InternalHandlerError`].
    ///
    /// When off, a panicking handler unwinds through [`Dispatcher::handle`].
    pub catch_panics: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            catch_panics: DEFAULT_CATCH_PANICS,
        }
    }
}

/// Routes requests to procedure handlers.
#[derive(Debug)]
pub struct Dispatcher<C: WireCodec = MsgPackCodec> {
    registry: Arc<Registry>,
    codec: C,
    config: DispatcherConfig,
}

impl Dispatcher {
    /// Create a dispatcher using the MessagePack codec.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self::with_codec(registry, MsgPackCodec)
    }
}

impl<C: WireCodec> Dispatcher<C> {
    /// Create a dispatcher using a custom wire codec.
    pub fn with_codec(registry: Arc<Registry>, codec: C) -> Self {
        Self {
            registry,
            codec,
            config: DispatcherConfig::default(),
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    /// Set whether handler panics are caught.
    pub fn catch_panics(mut self, enabled: bool) -> Self {
        self.config.catch_panics = enabled;
        self
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Handle one request.
    ///
    /// # Errors
    ///
    /// Returns the first [`RequestFault`] hit while resolving, decoding,
    /// invoking or encoding. Faults never unwind.
    pub fn handle(&self, request: &Request) -> error::Result<Response> {
        tracing::debug!(
            "Dispatching {}.{} with {} parameters",
            request.service,
            request.procedure,
            request.parameters.len()
        );

        let result = self.dispatch(request);
        if let Err(e) = &result {
            tracing::warn!(
                "Request {}.{} failed ({}): {}",
                request.service,
                request.procedure,
                e.kind(),
                e
            );
        }
        result
    }

    fn dispatch(&self, request: &Request) -> error::Result<Response> {
        let service = self
            .registry
            .lookup_service(&request.service)
            .ok_or_else(|| RequestFault::ServiceNotFound {
                service: request.service.clone(),
            })?;

        let procedure = service
            .lookup_procedure(&request.procedure)
            .ok_or_else(|| RequestFault::ProcedureNotFound {
                service: request.service.clone(),
                procedure: request.procedure.clone(),
            })?;

        let arguments = decode_parameters(&self.codec, procedure, &request.parameters)?;

        let returned = self
            .invoke(procedure, arguments)
            .map_err(|e| RequestFault::InternalHandlerError {
                procedure: procedure.fully_qualified_name().to_string(),
                message: e,
            })?;

        let return_value = match procedure.return_type() {
            Some(ty) => Some(encode_return_value(
                &self.codec,
                procedure.fully_qualified_name(),
                ty,
                returned,
            )?),
            None => None,
        };

        Ok(Response { return_value })
    }

    fn invoke(
        &self,
        procedure: &ProcedureSignature,
        arguments: Vec<Value>,
    ) -> Result<Option<Value>, String> {
        let handler = procedure.handler();
        let result: HandlerResult = if self.config.catch_panics {
            match panic::catch_unwind(AssertUnwindSafe(|| handler.call(arguments))) {
                Ok(result) => result,
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    tracing::error!(
                        "Handler for {} panicked: {}",
                        procedure.fully_qualified_name(),
                        message
                    );
                    return Err(format!("handler panicked: {}", message));
                }
            }
        } else {
            handler.call(arguments)
        };

        result.map_err(|e| format!("{:#}", e))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    }
}
