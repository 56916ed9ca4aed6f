//! Service definitions - the explicit input to the registry.
//!
//! Each service module builds a [`ServiceDefinition`] at start-up and hands
//! it to [`Registry::build`](crate::Registry::build) or
//! [`RegistryBuilder::service`](crate::RegistryBuilder::service). Nothing is
//! discovered implicitly.
//!
//! # Example
//!
//! ```
//! use krpc_dispatch::{HandlerError, ServiceDefinition};
//!
//! fn get_version() -> Result<String, HandlerError> {
//!     Ok("0.1.0".to_string())
//! }
//!
//! fn set_throttle(value: f32) -> Result<(), HandlerError> {
//!     let _ = value;
//!     Ok(())
//! }
//!
//! let service = ServiceDefinition::new("SpaceCenter")
//!     .procedure("GetVersion", get_version)
//!     .procedure("SetThrottle", set_throttle);
//!
//! assert_eq!(service.name(), "SpaceCenter");
//! ```

use crate::handler::{Handler, HandlerResult, IntoHandler};
use crate::types::{TypeDescriptor, Value};

/// A procedure as supplied by a service module.
#[derive(Debug, Clone)]
pub struct ProcedureDefinition {
    name: String,
    handler: Handler,
}

impl ProcedureDefinition {
    /// Define a procedure backed by a typed function.
    pub fn new<Args, H: IntoHandler<Args>>(name: impl Into<String>, handler: H) -> Self {
        Self {
            name: name.into(),
            handler: Handler::new(handler),
        }
    }

    /// Define a procedure with an explicit signature and an untyped handler.
    pub fn raw<F>(
        name: impl Into<String>,
        parameter_types: Vec<TypeDescriptor>,
        return_type: Option<TypeDescriptor>,
        handler: F,
    ) -> Self
    where
        F: Fn(Vec<Value>) -> HandlerResult + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            handler: Handler::raw(parameter_types, return_type, handler),
        }
    }

    /// Procedure name within its service.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn into_parts(self) -> (String, Handler) {
        (self.name, self.handler)
    }
}

/// A named group of procedures as supplied by a service module.
#[derive(Debug, Clone)]
pub struct ServiceDefinition {
    name: String,
    procedures: Vec<ProcedureDefinition>,
}

impl ServiceDefinition {
    /// Start a service definition.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            procedures: Vec::new(),
        }
    }

    /// Add a procedure backed by a typed function.
    pub fn procedure<Args, H: IntoHandler<Args>>(
        mut self,
        name: impl Into<String>,
        handler: H,
    ) -> Self {
        self.procedures.push(ProcedureDefinition::new(name, handler));
        self
    }

    /// Add a prepared procedure definition.
    pub fn with_procedure(mut self, procedure: ProcedureDefinition) -> Self {
        self.procedures.push(procedure);
        self
    }

    /// Service name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn into_parts(self) -> (String, Vec<ProcedureDefinition>) {
        (self.name, self.procedures)
    }
}
