//! # krpc-dispatch
//!
//! Dispatch core for a kRPC-style remote procedure call server.
//!
//! The crate turns a framed call (service name, procedure name, encoded
//! arguments) into an encoded return value or a typed fault. Transports own
//! connections and framing; this crate owns lookup, decoding, invocation and
//! encoding.
//!
//! ## Architecture
//!
//! - **Registry**: immutable index of services and procedures, built once
//!   from explicit [`ServiceDefinition`]s
//! - **Dispatcher**: stateless request handler over a shared registry
//! - **Codec**: MessagePack wire format behind the [`codec::WireCodec`] trait
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use krpc_dispatch::codec::MsgPackCodec;
//! use krpc_dispatch::types::MessageType;
//! use krpc_dispatch::{wire_message, Dispatcher, HandlerError, Registry, Request, ServiceDefinition};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, Default, Clone, PartialEq, Debug)]
//! struct Status {
//!     version: String,
//! }
//!
//! impl MessageType for Status {
//!     const NAME: &'static str = "KRPC.Status";
//! }
//!
//! wire_message!(Status);
//!
//! fn get_status() -> Result<Status, HandlerError> {
//!     Ok(Status { version: "0.1.0".to_string() })
//! }
//!
//! let registry = Registry::builder()
//!     .service(ServiceDefinition::new("KRPC").procedure("GetStatus", get_status))
//!     .build()
//!     .unwrap();
//! let dispatcher = Dispatcher::new(Arc::new(registry));
//!
//! let response = dispatcher.handle(&Request::new("KRPC", "GetStatus")).unwrap();
//! let status: Status = MsgPackCodec::decode(&response.return_value.unwrap()).unwrap();
//! assert_eq!(status.version, "0.1.0");
//! ```

pub mod codec;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod registry;
pub mod service;
pub mod types;

pub use codec::MsgPackCodec;
pub use dispatch::{Dispatcher, DispatcherConfig, Request, Response};
pub use error::{CodecError, HandlerError, RequestFault, SetupError};
pub use registry::{Registry, RegistryBuilder, CORE_SERVICE};
pub use service::{ProcedureDefinition, ServiceDefinition};
