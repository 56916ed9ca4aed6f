//! Service registry - the immutable index of services and procedures.
//!
//! The registry is built once at start-up from an explicit list of
//! [`ServiceDefinition`]s, then shared read-only (typically behind an `Arc`)
//! with the dispatcher and the transport. It is never mutated afterwards, so
//! lookups from any number of threads need no locking.
//!
//! Building fails with a [`SetupError`] when:
//! - two services share a name,
//! - no service is named [`CORE_SERVICE`] (`"KRPC"`),
//! - two procedures in one service share a name,
//! - a parameter or return type cannot be carried over the wire.
//!
//! # Example
//!
//! ```
//! use krpc_dispatch::{HandlerError, Registry, ServiceDefinition};
//!
//! fn get_version() -> Result<String, HandlerError> {
//!     Ok("0.1.0".to_string())
//! }
//!
//! let registry = Registry::builder()
//!     .service(ServiceDefinition::new("KRPC").procedure("GetVersion", get_version))
//!     .build()
//!     .unwrap();
//!
//! let service = registry.lookup_service("KRPC").unwrap();
//! let procedure = service.lookup_procedure("GetVersion").unwrap();
//! assert_eq!(procedure.fully_qualified_name(), "KRPC.GetVersion");
//! assert!(procedure.has_return_type());
//! ```

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::SetupError;
use crate::handler::Handler;
use crate::service::ServiceDefinition;
use crate::types::{BuilderFactory, TypeDescriptor};

/// Name of the bootstrap service that must always be registered.
pub const CORE_SERVICE: &str = "KRPC";

/// Everything the dispatcher needs to call one procedure.
#[derive(Debug)]
pub struct ProcedureSignature {
    fully_qualified_name: String,
    /// `Some` exactly where the parameter is a message type.
    parameter_builders: Vec<Option<BuilderFactory>>,
    handler: Handler,
}

impl ProcedureSignature {
    fn new(service: &str, name: &str, handler: Handler) -> Result<Self, SetupError> {
        let fully_qualified_name = format!("{}.{}", service, name);

        let invalid = handler
            .parameter_types()
            .iter()
            .chain(handler.return_type())
            .find(|ty| !ty.is_valid());
        if let Some(ty) = invalid {
            return Err(SetupError::InvalidType {
                procedure: fully_qualified_name,
                type_name: ty.to_string(),
            });
        }

        let parameter_builders = handler
            .parameter_types()
            .iter()
            .map(|ty| match ty {
                TypeDescriptor::Message(descriptor) => Some(descriptor.factory()),
                _ => None,
            })
            .collect();

        Ok(Self {
            fully_qualified_name,
            parameter_builders,
            handler,
        })
    }

    /// `"<Service>.<Procedure>"`.
    pub fn fully_qualified_name(&self) -> &str {
        &self.fully_qualified_name
    }

    pub fn parameter_types(&self) -> &[TypeDescriptor] {
        self.handler.parameter_types()
    }

    /// Builder factory per parameter position, `None` for non-message types.
    pub fn parameter_builders(&self) -> &[Option<BuilderFactory>] {
        &self.parameter_builders
    }

    pub fn return_type(&self) -> Option<&TypeDescriptor> {
        self.handler.return_type()
    }

    pub fn has_return_type(&self) -> bool {
        self.handler.return_type().is_some()
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }
}

/// A registered service and its procedures.
#[derive(Debug)]
pub struct ServiceSignature {
    name: String,
    procedures: HashMap<String, ProcedureSignature>,
}

impl ServiceSignature {
    fn new(definition: ServiceDefinition) -> Result<Self, SetupError> {
        let (name, definitions) = definition.into_parts();

        let duplicates = duplicate_names(definitions.iter().map(|p| p.name()));
        if !duplicates.is_empty() {
            return Err(SetupError::DuplicateProcedureName {
                service: name,
                names: duplicates,
            });
        }

        let mut procedures = HashMap::with_capacity(definitions.len());
        for procedure in definitions {
            let (procedure_name, handler) = procedure.into_parts();
            let signature = ProcedureSignature::new(&name, &procedure_name, handler)?;
            procedures.insert(procedure_name, signature);
        }

        Ok(Self { name, procedures })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get a procedure by name.
    pub fn lookup_procedure(&self, name: &str) -> Option<&ProcedureSignature> {
        self.procedures.get(name)
    }
}

/// Immutable index of services.
#[derive(Debug)]
pub struct Registry {
    services: HashMap<String, ServiceSignature>,
}

impl Registry {
    /// Create a registry builder.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Build the registry from the given service definitions.
    ///
    /// # Errors
    ///
    /// Fails with the first [`SetupError`] found; no partial registry is
    /// returned.
    pub fn build(definitions: Vec<ServiceDefinition>) -> Result<Self, SetupError> {
        let duplicates = duplicate_names(definitions.iter().map(ServiceDefinition::name));
        if !duplicates.is_empty() {
            tracing::error!(
                "Multiple services have the same name: {}",
                duplicates.join(", ")
            );
            return Err(SetupError::DuplicateServiceName { names: duplicates });
        }

        if !definitions.iter().any(|d| d.name() == CORE_SERVICE) {
            tracing::error!("{} service could not be found", CORE_SERVICE);
            return Err(SetupError::MissingCoreService);
        }

        let mut services = HashMap::with_capacity(definitions.len());
        for definition in definitions {
            let service = ServiceSignature::new(definition).map_err(|e| {
                tracing::error!("Failed to register service: {}", e);
                e
            })?;
            tracing::debug!(
                "Registered service {} with {} procedures",
                service.name,
                service.procedures.len()
            );
            services.insert(service.name.clone(), service);
        }

        Ok(Self { services })
    }

    /// Get a service by name.
    pub fn lookup_service(&self, name: &str) -> Option<&ServiceSignature> {
        self.services.get(name)
    }

    /// Describe every service and procedure, sorted by name.
    ///
    /// This is what the `KRPC` service reports to clients that ask which
    /// procedures are available.
    pub fn describe(&self) -> Vec<ServiceDescription> {
        let mut services: Vec<_> = self
            .services
            .values()
            .map(|service| {
                let mut procedures: Vec<_> = service
                    .procedures
                    .iter()
                    .map(|(name, procedure)| ProcedureDescription {
                        name: name.clone(),
                        parameter_types: procedure
                            .parameter_types()
                            .iter()
                            .map(ToString::to_string)
                            .collect(),
                        return_type: procedure.return_type().map(ToString::to_string),
                    })
                    .collect();
                procedures.sort_by(|a, b| a.name.cmp(&b.name));
                ServiceDescription {
                    name: service.name.clone(),
                    procedures,
                }
            })
            .collect();
        services.sort_by(|a, b| a.name.cmp(&b.name));
        services
    }
}

/// Fluent builder for [`Registry`].
///
/// Each service module registers itself with [`service`](Self::service);
/// [`build`](Self::build) validates and freezes the result.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    definitions: Vec<ServiceDefinition>,
}

impl RegistryBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service.
    pub fn service(mut self, definition: ServiceDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    /// Validate and build the registry.
    pub fn build(self) -> Result<Registry, SetupError> {
        Registry::build(self.definitions)
    }
}

/// Introspection data for one service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescription {
    pub name: String,
    pub procedures: Vec<ProcedureDescription>,
}

/// Introspection data for one procedure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcedureDescription {
    pub name: String,
    pub parameter_types: Vec<String>,
    pub return_type: Option<String>,
}

/// Names that occur more than once, sorted and listed once each.
fn duplicate_names<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for name in names {
        *counts.entry(name).or_default() += 1;
    }
    counts
        .into_iter()
        .filter(|&(_, count)| count > 1)
        .map(|(name, _)| name.to_string())
        .collect()
}
