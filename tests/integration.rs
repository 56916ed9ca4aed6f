//! Integration tests for krpc-dispatch.
//!
//! These tests drive the dispatcher end to end: registry build, request
//! decoding, handler invocation and return value encoding.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Context;
use bytes::Bytes;
use krpc_dispatch::codec::MsgPackCodec;
use krpc_dispatch::types::{MessageType, TypeDescriptor, Value};
use krpc_dispatch::{
    wire_message, Dispatcher, HandlerError, ProcedureDefinition, Registry, Request, RequestFault,
    ServiceDefinition, SetupError,
};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Default, Clone, PartialEq, Debug)]
struct Status {
    version: String,
    bytes_read: u64,
    bytes_written: u64,
}

impl MessageType for Status {
    const NAME: &'static str = "KRPC.Status";
}

#[derive(Serialize, Deserialize, Default, Clone, PartialEq, Debug)]
struct Vessel {
    name: String,
    mass: f64,
}

impl MessageType for Vessel {
    const NAME: &'static str = "SpaceCenter.Vessel";
}

wire_message!(Status, Vessel);

fn get_status() -> Result<Status, HandlerError> {
    Ok(Status {
        version: "0.4.8".to_string(),
        bytes_read: 1024,
        bytes_written: 2048,
    })
}

fn echo(a: String, b: i32) -> Result<String, HandlerError> {
    Ok(format!("{}{}", a, b))
}

fn find_vessel(name: String) -> Result<Option<Vessel>, HandlerError> {
    if name == "Kerbal X" {
        Ok(Some(Vessel { name, mass: 10.5 }))
    } else {
        Ok(None)
    }
}

fn vessel_name(vessel: Vessel) -> Result<String, HandlerError> {
    Ok(vessel.name)
}

fn total_mass(vessels: HashMap<String, f64>) -> Result<f64, HandlerError> {
    Ok(vessels.values().sum())
}

fn launch(name: String) -> Result<(), HandlerError> {
    Err(HandlerError::msg(format!("no launch pad for {}", name)))
}

fn parse_stage(stage: String) -> Result<i32, HandlerError> {
    stage
        .parse::<i32>()
        .with_context(|| format!("stage {:?}", stage))
}

fn explode() -> Result<i32, HandlerError> {
    panic!("rapid unplanned disassembly")
}

fn build_registry() -> Registry {
    Registry::builder()
        .service(
            ServiceDefinition::new("KRPC")
                .procedure("GetStatus", get_status)
                .procedure("Echo", echo),
        )
        .service(
            ServiceDefinition::new("SpaceCenter")
                .procedure("FindVessel", find_vessel)
                .procedure("VesselName", vessel_name)
                .procedure("TotalMass", total_mass)
                .procedure("Launch", launch)
                .procedure("ParseStage", parse_stage)
                .procedure("Explode", explode)
                .with_procedure(ProcedureDefinition::raw(
                    "Liar",
                    vec![],
                    Some(TypeDescriptor::Int32),
                    |_| Ok(Some(Value::String("not an int".to_string()))),
                ))
                .with_procedure(ProcedureDefinition::raw(
                    "Discard",
                    vec![],
                    None,
                    |_| Ok(Some(Value::Bool(true))),
                )),
        )
        .build()
        .unwrap()
}

fn dispatcher() -> Dispatcher {
    Dispatcher::new(Arc::new(build_registry()))
}

fn encode<T: Serialize + ?Sized>(value: &T) -> Bytes {
    Bytes::from(MsgPackCodec::encode(value).unwrap())
}

/// Scenario: KRPC.GetStatus returns a message that decodes back unchanged.
#[test]
fn test_get_status_round_trip() {
    let response = dispatcher()
        .handle(&Request::new("KRPC", "GetStatus"))
        .unwrap();

    let bytes = response.return_value.expect("GetStatus declares a return type");
    let status: Status = MsgPackCodec::decode(&bytes).unwrap();
    assert_eq!(status, get_status().unwrap());
}

#[test]
fn test_scalar_parameters_and_return() {
    let request = Request::new("KRPC", "Echo")
        .parameter(encode("abc"))
        .parameter(encode(&42i32));

    let response = dispatcher().handle(&request).unwrap();
    let result: String = MsgPackCodec::decode(&response.return_value.unwrap()).unwrap();
    assert_eq!(result, "abc42");
}

#[test]
fn test_message_parameter() {
    let vessel = Vessel {
        name: "Jebediah's Junk".to_string(),
        mass: 3.0,
    };
    let request = Request::new("SpaceCenter", "VesselName").parameter(encode(&vessel));

    let response = dispatcher().handle(&request).unwrap();
    let name: String = MsgPackCodec::decode(&response.return_value.unwrap()).unwrap();
    assert_eq!(name, vessel.name);
}

#[test]
fn test_empty_message_parameter_decodes_to_default() {
    let request = Request::new("SpaceCenter", "VesselName").parameter(Bytes::new());

    let response = dispatcher().handle(&request).unwrap();
    let name: String = MsgPackCodec::decode(&response.return_value.unwrap()).unwrap();
    assert_eq!(name, "");
}

/// A message parameter carrying only some fields merges onto the defaults.
#[test]
fn test_partial_message_parameter() {
    #[derive(Serialize)]
    struct NameOnly {
        name: &'static str,
    }

    let request =
        Request::new("SpaceCenter", "VesselName").parameter(encode(&NameOnly { name: "X" }));

    let response = dispatcher().handle(&request).unwrap();
    let name: String = MsgPackCodec::decode(&response.return_value.unwrap()).unwrap();
    assert_eq!(name, "X");
}

#[test]
fn test_message_parameter_trailing_bytes_rejected() {
    let mut bytes = MsgPackCodec::encode(&Vessel::default()).unwrap();
    bytes.extend_from_slice(&[0xc1, 0xc1]);
    let request = Request::new("SpaceCenter", "VesselName").parameter(bytes);

    let fault = dispatcher().handle(&request).unwrap_err();
    match fault {
        RequestFault::ParameterDecodeError { index, source, .. } => {
            assert_eq!(index, 0);
            assert!(matches!(source, krpc_dispatch::CodecError::TrailingBytes(2)));
        }
        other => panic!("unexpected fault: {:?}", other),
    }
}

#[test]
fn test_dictionary_parameter() {
    let mut vessels = HashMap::new();
    vessels.insert("a".to_string(), 1.5f64);
    vessels.insert("b".to_string(), 2.5f64);
    let request = Request::new("SpaceCenter", "TotalMass").parameter(encode(&vessels));

    let response = dispatcher().handle(&request).unwrap();
    let total: f64 = MsgPackCodec::decode(&response.return_value.unwrap()).unwrap();
    assert_eq!(total, 4.0);
}

#[test]
fn test_service_not_found() {
    let fault = dispatcher()
        .handle(&Request::new("Foo", "GetStatus"))
        .unwrap_err();

    assert!(matches!(
        fault,
        RequestFault::ServiceNotFound { ref service } if service == "Foo"
    ));
    assert_eq!(fault.to_string(), "Service Foo not found");
    assert_eq!(fault.kind(), "service_not_found");
}

#[test]
fn test_procedure_not_found() {
    let fault = dispatcher().handle(&Request::new("KRPC", "Bar")).unwrap_err();

    match fault {
        RequestFault::ProcedureNotFound { service, procedure } => {
            assert_eq!(service, "KRPC");
            assert_eq!(procedure, "Bar");
        }
        other => panic!("unexpected fault: {:?}", other),
    }
}

#[test]
fn test_parameter_count_mismatch() {
    let request = Request::new("KRPC", "Echo").parameter(encode("abc"));

    let fault = dispatcher().handle(&request).unwrap_err();
    match fault {
        RequestFault::ParameterCountMismatch {
            procedure,
            expected,
            got,
        } => {
            assert_eq!(procedure, "KRPC.Echo");
            assert_eq!(expected, 2);
            assert_eq!(got, 1);
        }
        other => panic!("unexpected fault: {:?}", other),
    }
}

#[test]
fn test_parameter_decode_error_names_position() {
    let request = Request::new("KRPC", "Echo")
        .parameter(encode("abc"))
        .parameter(encode("not a number"));

    let fault = dispatcher().handle(&request).unwrap_err();
    match fault {
        RequestFault::ParameterDecodeError {
            procedure,
            index,
            expected_type,
            ..
        } => {
            assert_eq!(procedure, "KRPC.Echo");
            assert_eq!(index, 1);
            assert_eq!(expected_type, "int32");
        }
        other => panic!("unexpected fault: {:?}", other),
    }
}

#[test]
fn test_null_return_value() {
    let request = Request::new("SpaceCenter", "FindVessel").parameter(encode("Nobody"));

    let fault = dispatcher().handle(&request).unwrap_err();
    assert!(matches!(
        fault,
        RequestFault::NullReturnValue { ref procedure, ref expected_type }
            if procedure == "SpaceCenter.FindVessel" && expected_type == "SpaceCenter.Vessel"
    ));
}

#[test]
fn test_optional_return_present() {
    let request = Request::new("SpaceCenter", "FindVessel").parameter(encode("Kerbal X"));

    let response = dispatcher().handle(&request).unwrap();
    let vessel: Vessel = MsgPackCodec::decode(&response.return_value.unwrap()).unwrap();
    assert_eq!(vessel.mass, 10.5);
}

#[test]
fn test_invalid_return_type() {
    let fault = dispatcher()
        .handle(&Request::new("SpaceCenter", "Liar"))
        .unwrap_err();

    assert!(matches!(
        fault,
        RequestFault::InvalidReturnType { ref expected, ref got, .. }
            if expected == "int32" && got == "string"
    ));
}

#[test]
fn test_no_return_type_discards_handler_value() {
    let response = dispatcher()
        .handle(&Request::new("SpaceCenter", "Discard"))
        .unwrap();
    assert!(response.return_value.is_none());
}

#[test]
fn test_handler_error_becomes_internal_fault() {
    let request = Request::new("SpaceCenter", "Launch").parameter(encode("Kerbal X"));

    let fault = dispatcher().handle(&request).unwrap_err();
    match fault {
        RequestFault::InternalHandlerError { procedure, message } => {
            assert_eq!(procedure, "SpaceCenter.Launch");
            assert_eq!(message, "no launch pad for Kerbal X");
        }
        other => panic!("unexpected fault: {:?}", other),
    }
}

#[test]
fn test_handler_std_error_becomes_internal_fault() {
    let request = Request::new("SpaceCenter", "ParseStage").parameter(encode("three"));

    let fault = dispatcher().handle(&request).unwrap_err();
    assert_eq!(fault.kind(), "internal_handler_error");
    match fault {
        RequestFault::InternalHandlerError { message, .. } => {
            assert_eq!(message, "stage \"three\": invalid digit found in string");
        }
        other => panic!("unexpected fault: {:?}", other),
    }
}

#[test]
fn test_handler_panic_becomes_internal_fault() {
    let fault = dispatcher()
        .handle(&Request::new("SpaceCenter", "Explode"))
        .unwrap_err();

    match fault {
        RequestFault::InternalHandlerError { message, .. } => {
            assert!(message.contains("rapid unplanned disassembly"));
        }
        other => panic!("unexpected fault: {:?}", other),
    }
}

#[test]
#[should_panic(expected = "rapid unplanned disassembly")]
fn test_handler_panic_propagates_when_not_caught() {
    let dispatcher = dispatcher().catch_panics(false);
    let _ = dispatcher.handle(&Request::new("SpaceCenter", "Explode"));
}

#[test]
fn test_dispatcher_survives_faults() {
    let dispatcher = dispatcher();

    assert!(dispatcher
        .handle(&Request::new("SpaceCenter", "Explode"))
        .is_err());
    assert!(dispatcher.handle(&Request::new("Foo", "Bar")).is_err());

    let response = dispatcher.handle(&Request::new("KRPC", "GetStatus"));
    assert!(response.is_ok());
}

#[test]
fn test_setup_errors() {
    let result = Registry::build(vec![
        ServiceDefinition::new("KRPC"),
        ServiceDefinition::new("SpaceCenter"),
        ServiceDefinition::new("SpaceCenter"),
    ]);
    assert_eq!(
        result.unwrap_err(),
        SetupError::DuplicateServiceName {
            names: vec!["SpaceCenter".to_string()]
        }
    );

    let result = Registry::build(vec![ServiceDefinition::new("SpaceCenter")]);
    assert_eq!(result.unwrap_err(), SetupError::MissingCoreService);
}

#[test]
fn test_describe_serializes_to_json() {
    let registry = build_registry();
    let json = serde_json::to_value(registry.describe()).unwrap();

    assert_eq!(json[0]["name"], "KRPC");
    assert_eq!(json[0]["procedures"][0]["name"], "Echo");
    assert_eq!(
        json[0]["procedures"][0]["parameterTypes"],
        serde_json::json!(["string", "int32"])
    );
    assert_eq!(json[0]["procedures"][1]["returnType"], "KRPC.Status");
    assert_eq!(json[1]["name"], "SpaceCenter");
}

/// Many threads share one dispatcher without coordination.
#[test]
fn test_concurrent_dispatch_threads() {
    let dispatcher = dispatcher();

    std::thread::scope(|scope| {
        for i in 0..8 {
            let dispatcher = &dispatcher;
            scope.spawn(move || {
                for j in 0..50 {
                    let request = Request::new("KRPC", "Echo")
                        .parameter(encode("t"))
                        .parameter(encode(&(i * 100 + j)));
                    let response = dispatcher.handle(&request).unwrap();
                    let result: String =
                        MsgPackCodec::decode(&response.return_value.unwrap()).unwrap();
                    assert_eq!(result, format!("t{}", i * 100 + j));
                }
            });
        }
    });
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_dispatch_tasks() {
    let counter = Arc::new(AtomicU64::new(0));
    let calls = Arc::clone(&counter);

    let registry = Registry::builder()
        .service(ServiceDefinition::new("KRPC").procedure(
            "Tick",
            move || -> Result<u64, HandlerError> { Ok(calls.fetch_add(1, Ordering::SeqCst) + 1) },
        ))
        .build()
        .unwrap();
    let dispatcher = Arc::new(Dispatcher::new(Arc::new(registry)));

    let mut handles = Vec::new();
    for _ in 0..64 {
        let dispatcher = Arc::clone(&dispatcher);
        handles.push(tokio::task::spawn_blocking(move || {
            dispatcher.handle(&Request::new("KRPC", "Tick"))
        }));
    }

    let mut ticks = Vec::new();
    for handle in handles {
        let response = handle.await.unwrap().unwrap();
        let tick: u64 = MsgPackCodec::decode(&response.return_value.unwrap()).unwrap();
        ticks.push(tick);
    }

    ticks.sort_unstable();
    assert_eq!(ticks, (1..=64).collect::<Vec<_>>());
    assert_eq!(counter.load(Ordering::SeqCst), 64);
}
