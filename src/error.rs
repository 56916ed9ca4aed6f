//! Error types for krpc-dispatch.
//!
//! Failures come in two severities that are never mixed:
//!
//! - [`SetupError`] - raised while building the [`Registry`](crate::Registry).
//!   Fatal: the process must not start serving.
//! - [`RequestFault`] - raised while handling a single request. Recoverable:
//!   returned to the caller as a value so the transport can report it.
//!
//! [`CodecError`] and [`HandlerError`] are the lower-level errors that get
//! wrapped into a [`RequestFault`] with request context attached.

use thiserror::Error;

/// Error raised while building the service registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetupError {
    /// Two or more service definitions share a name.
    #[error("Multiple services have the same name. Duplicates are {}", .names.join(", "))]
    DuplicateServiceName {
        /// The duplicated names, sorted, each listed once.
        names: Vec<String>,
    },

    /// The bootstrap `KRPC` service was not registered.
    #[error("KRPC service could not be found")]
    MissingCoreService,

    /// Two or more procedures in one service share a name.
    #[error("Service {service} declares duplicate procedures: {}", .names.join(", "))]
    DuplicateProcedureName {
        /// Service declaring the duplicates.
        service: String,
        /// The duplicated procedure names, sorted, each listed once.
        names: Vec<String>,
    },

    /// A parameter or return type cannot be carried over the wire.
    #[error("{procedure} uses a type that cannot be sent over the wire: {type_name}")]
    InvalidType {
        /// Fully qualified procedure name.
        procedure: String,
        /// Display name of the offending type.
        type_name: String,
    },
}

/// Error raised by a [`WireCodec`](crate::codec::WireCodec).
#[derive(Debug, Error)]
pub enum CodecError {
    /// MsgPack serialization error.
    #[error("MsgPack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// MsgPack deserialization error.
    #[error("MsgPack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    /// Bytes were left over after reading a complete value.
    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),

    /// A message type was passed where a scalar or collection was expected.
    #[error("{0} is a message type, not a scalar")]
    NotScalar(String),

    /// The bytes are not a well-formed MsgPack value.
    #[error("malformed MsgPack value: {0}")]
    MalformedValue(#[from] rmpv::decode::Error),

    /// A merged message could not be written back out.
    #[error("failed to re-encode merged message: {0}")]
    MergeEncode(String),

    /// The value does not belong to the requested type.
    #[error("expected a value of type {expected}; got {got}")]
    TypeMismatch {
        /// Requested type.
        expected: String,
        /// Runtime type of the value.
        got: String,
    },
}

/// Per-request fault, returned to the caller instead of a response.
#[derive(Debug, Error)]
pub enum RequestFault {
    /// No service with the requested name.
    #[error("Service {service} not found")]
    ServiceNotFound {
        /// Requested service name.
        service: String,
    },

    /// The service exists but has no such procedure.
    #[error("Procedure {procedure} not found, in Service {service}")]
    ProcedureNotFound {
        /// Requested service name.
        service: String,
        /// Requested procedure name.
        procedure: String,
    },

    /// The request carried the wrong number of parameters.
    #[error("Incorrect number of parameters for {procedure}. Expected {expected}; got {got}.")]
    ParameterCountMismatch {
        /// Fully qualified procedure name.
        procedure: String,
        /// Number of declared parameters.
        expected: usize,
        /// Number of parameters in the request.
        got: usize,
    },

    /// A parameter could not be decoded as its declared type.
    #[error(
        "Failed to decode parameter {index} for {procedure}. \
         Expected a parameter of type {expected_type}. {source}"
    )]
    ParameterDecodeError {
        /// Fully qualified procedure name.
        procedure: String,
        /// Zero-based parameter position.
        index: usize,
        /// Display name of the declared type.
        expected_type: String,
        /// Underlying codec failure.
        #[source]
        source: CodecError,
    },

    /// The handler produced no value although a return type is declared.
    #[error("{procedure} returned null. Expected an object of type {expected_type}")]
    NullReturnValue {
        /// Fully qualified procedure name.
        procedure: String,
        /// Display name of the declared return type.
        expected_type: String,
    },

    /// The handler produced a value of the wrong type.
    #[error("{procedure} returned an object of an invalid type. Expected {expected}; got {got}")]
    InvalidReturnType {
        /// Fully qualified procedure name.
        procedure: String,
        /// Display name of the declared return type.
        expected: String,
        /// Runtime type of the returned value.
        got: String,
    },

    /// The returned value could not be encoded.
    #[error("Failed to encode the value returned by {procedure}. {source}")]
    ReturnValueEncodeError {
        /// Fully qualified procedure name.
        procedure: String,
        /// Underlying codec failure.
        #[source]
        source: CodecError,
    },

    /// The handler failed or panicked.
    #[error("{procedure} failed: {message}")]
    InternalHandlerError {
        /// Fully qualified procedure name.
        procedure: String,
        /// Failure description.
        message: String,
    },
}

impl RequestFault {
    /// Stable machine-readable code for the fault variant.
    pub fn kind(&self) -> &'static str {
        match self {
            RequestFault::ServiceNotFound { .. } => "service_not_found",
            RequestFault::ProcedureNotFound { .. } => "procedure_not_found",
            RequestFault::ParameterCountMismatch { .. } => "parameter_count_mismatch",
            RequestFault::ParameterDecodeError { .. } => "parameter_decode_error",
            RequestFault::NullReturnValue { .. } => "null_return_value",
            RequestFault::InvalidReturnType { .. } => "invalid_return_type",
            RequestFault::ReturnValueEncodeError { .. } => "return_value_encode_error",
            RequestFault::InternalHandlerError { .. } => "internal_handler_error",
        }
    }
}

/// Failure reported by handler code.
///
/// Handlers return `anyhow::Result<R>`; add context with
/// [`anyhow::Context`] and the whole chain ends up in the fault message.
pub type HandlerError = anyhow::Error;

/// Result type alias using RequestFault.
pub type Result<T> = std::result::Result<T, RequestFault>;
