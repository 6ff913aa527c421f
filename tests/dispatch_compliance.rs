//! Dispatch Compliance Tests
//!
//! End-to-end checks of request binding, reply encoding and the Tower service.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, TimeZone, Timelike};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower::ServiceExt;
use tower_json_dispatch::{
    binding::CoercionPolicy,
    codec::{JsonCodec, WireDateTime},
    formatter::{DispatchFormatter, FormatterConfig},
    protocol::{DispatchError, OperationDescriptor, ParameterSlots, TypeRef},
    service::{operation_fn, DispatchRequest, DispatchService, OperationTable},
    transport::{
        read_raw_body, BoundVariables, Message, MessageVersion, UriTemplateMatch, BINARY_ELEMENT,
    },
};

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
struct DetailRequest {
    verbose: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
struct UserName {
    name: String,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
enum Tier {
    #[default]
    Free,
    Pro,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
struct Address {
    street_name: String,
    postal_code: u32,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
struct Profile {
    display_name: String,
    tier: Tier,
    home_address: Address,
    tags: Vec<String>,
}

fn request(vars: BoundVariables) -> Message {
    Message::request(UriTemplateMatch::new(vars))
}

fn get_user_descriptor() -> OperationDescriptor {
    OperationDescriptor::builder("GetUser")
        .parameter("id", TypeRef::scalar::<i32>())
        .parameter("detail", TypeRef::json::<DetailRequest>())
        .returns(TypeRef::json::<UserName>())
        .uri_template("users/{id}")
        .build()
        .unwrap()
}

fn get_user() -> Arc<OperationDescriptor> {
    Arc::new(get_user_descriptor())
}

fn reply_body(reply: &Message) -> Vec<u8> {
    read_raw_body(reply, BINARY_ELEMENT).unwrap().to_vec()
}

#[test]
fn test_zero_parameter_operation_is_noop() {
    let descriptor = OperationDescriptor::builder("Ping").build().unwrap();
    let formatter = DispatchFormatter::new(Arc::new(descriptor));

    // no body format, no URI match, unreadable body
    let message = Message::new(MessageVersion::None).with_buffered_body("not json at all");
    let mut slots = ParameterSlots::with_len(0);

    formatter.deserialize_request(&message, &mut slots).unwrap();
    assert!(slots.is_empty());
}

#[test]
fn test_single_body_parameter() {
    let descriptor = OperationDescriptor::builder("Save")
        .parameter("profile", TypeRef::json::<Profile>())
        .build()
        .unwrap();
    let formatter = DispatchFormatter::new(Arc::new(descriptor));

    let message = request(BoundVariables::new()).with_buffered_body(
        r#"{"displayName":"Ann","tier":"Pro","homeAddress":{"streetName":"Elm","postalCode":12345},"tags":["a"]}"#,
    );
    let mut slots = ParameterSlots::with_len(1);
    formatter.deserialize_request(&message, &mut slots).unwrap();

    let profile = slots.get::<Profile>(0).unwrap();
    assert_eq!(profile.display_name, "Ann");
    assert_eq!(profile.tier, Tier::Pro);
    assert_eq!(profile.home_address.postal_code, 12345);
}

#[test]
fn test_single_body_parameter_empty_body_is_zero() {
    let descriptor = OperationDescriptor::builder("Save")
        .parameter("profile", TypeRef::json::<Profile>())
        .build()
        .unwrap();
    let formatter = DispatchFormatter::new(Arc::new(descriptor));

    let mut slots = ParameterSlots::with_len(1);
    formatter
        .deserialize_request(&request(BoundVariables::new()), &mut slots)
        .unwrap();

    assert_eq!(slots.get::<Profile>(0), Some(&Profile::default()));
}

#[test]
fn test_body_parameter_position_does_not_matter() {
    let descriptor = OperationDescriptor::builder("Move")
        .parameter("from", TypeRef::string())
        .parameter("payload", TypeRef::json::<DetailRequest>())
        .parameter("to", TypeRef::string())
        .uri_template("move/{from}/{to}")
        .build()
        .unwrap();
    let formatter = DispatchFormatter::new(Arc::new(descriptor));

    let vars = BoundVariables::new().with("to", "b").with("from", "a");
    let message = request(vars).with_buffered_body(r#"{"verbose":true}"#);
    let mut slots = ParameterSlots::with_len(3);
    formatter.deserialize_request(&message, &mut slots).unwrap();

    assert_eq!(slots.get::<String>(0).unwrap(), "a");
    assert_eq!(slots.get::<DetailRequest>(1), Some(&DetailRequest { verbose: true }));
    assert_eq!(slots.get::<String>(2).unwrap(), "b");
}

#[test]
fn test_round_trip_representative_types() {
    let codec = JsonCodec::new();

    let text = "héllo \"quoted\"".to_string();
    let bytes = codec.encode(&text, &TypeRef::string()).unwrap();
    let back = codec.decode(&bytes, &TypeRef::string()).unwrap();
    assert_eq!(back.downcast_ref::<String>(), Some(&text));

    let bytes = codec.encode(&-17i64, &TypeRef::scalar::<i64>()).unwrap();
    let back = codec.decode(&bytes, &TypeRef::scalar::<i64>()).unwrap();
    assert_eq!(back.downcast_ref::<i64>(), Some(&-17));

    let bytes = codec.encode(&true, &TypeRef::scalar::<bool>()).unwrap();
    let back = codec.decode(&bytes, &TypeRef::scalar::<bool>()).unwrap();
    assert_eq!(back.downcast_ref::<bool>(), Some(&true));

    let bytes = codec.encode(&Tier::Pro, &TypeRef::enumeration::<Tier>()).unwrap();
    let back = codec.decode(&bytes, &TypeRef::enumeration::<Tier>()).unwrap();
    assert_eq!(back.downcast_ref::<Tier>(), Some(&Tier::Pro));

    let profile = Profile {
        display_name: "Ann".to_string(),
        tier: Tier::Pro,
        home_address: Address {
            street_name: "Elm".to_string(),
            postal_code: 90210,
        },
        tags: vec!["x".to_string(), "y".to_string()],
    };
    let bytes = codec.encode(&profile, &TypeRef::json::<Profile>()).unwrap();
    let wire: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(wire["homeAddress"]["streetName"], "Elm");
    let back = codec.decode(&bytes, &TypeRef::json::<Profile>()).unwrap();
    assert_eq!(back.downcast_ref::<Profile>(), Some(&profile));
}

#[test]
fn test_date_time_round_trip_keeps_offset_and_millis() {
    let offset = FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap();
    let value: DateTime<FixedOffset> = offset
        .with_ymd_and_hms(2024, 3, 1, 10, 20, 30)
        .unwrap()
        .with_nanosecond(123_000_000)
        .unwrap();

    let codec = JsonCodec::new();
    let bytes = codec
        .encode(&WireDateTime(value), &TypeRef::date_time())
        .unwrap();
    assert_eq!(&bytes[..], br#""2024-03-01T10:20:30.123+05:30""#);

    let back = codec.decode(&bytes, &TypeRef::date_time()).unwrap();
    let back = back.downcast_ref::<WireDateTime>().unwrap();
    assert_eq!(back.0, value);
    assert_eq!(back.0.offset(), &offset);
    assert_eq!(back.0.timestamp_subsec_millis(), 123);
}

#[test]
fn test_malformed_body_leaves_slots_untouched() {
    let formatter = DispatchFormatter::new(get_user());
    let message = request(BoundVariables::new().with("id", "42")).with_buffered_body(r#"{"verbose":"#);

    let mut slots = ParameterSlots::with_len(2);
    slots.set(0, Box::new(7i32));

    let err = formatter.deserialize_request(&message, &mut slots).unwrap_err();
    assert!(matches!(err, DispatchError::BodyDeserialization { .. }));
    assert_eq!(slots.get::<i32>(0), Some(&7));
    assert!(!slots.is_filled(1));
}

#[test]
fn test_get_user_scenario() {
    let formatter = DispatchFormatter::new(get_user());
    let message = request(BoundVariables::new().with("id", "42")).with_buffered_body(r#"{"verbose":true}"#);

    let mut slots = ParameterSlots::with_len(2);
    formatter.deserialize_request(&message, &mut slots).unwrap();

    assert_eq!(slots.get::<i32>(0), Some(&42));
    assert_eq!(slots.get::<DetailRequest>(1), Some(&DetailRequest { verbose: true }));
}

#[test]
fn test_uncoercible_uri_value_becomes_zero() {
    let formatter = DispatchFormatter::new(get_user());
    let message = request(BoundVariables::new().with("id", "abc"));

    let mut slots = ParameterSlots::with_len(2);
    formatter.deserialize_request(&message, &mut slots).unwrap();

    assert_eq!(slots.get::<i32>(0), Some(&0));
}

#[test]
fn test_uncoercible_uri_value_fails_when_strict() {
    let config = FormatterConfig::new().with_coercion_policy(CoercionPolicy::Strict);
    let formatter = DispatchFormatter::with_config(get_user(), config);
    let message = request(BoundVariables::new().with("id", "abc"));

    let mut slots = ParameterSlots::with_len(2);
    let err = formatter.deserialize_request(&message, &mut slots).unwrap_err();

    assert!(matches!(err, DispatchError::ParameterCoercion { .. }));
    assert_eq!(err.status_code(), 400);
}

#[test]
fn test_reply_is_camel_case_json() {
    let formatter = DispatchFormatter::new(get_user());
    let reply = formatter
        .serialize_reply(
            MessageVersion::None,
            &ParameterSlots::with_len(2),
            &UserName {
                name: "Ann".to_string(),
            },
        )
        .unwrap();

    assert_eq!(reply_body(&reply), br#"{"name":"Ann"}"#);
    let http = reply.http_response().unwrap();
    assert_eq!(http.status, 200);
    assert_eq!(http.header_value("Content-Type"), Some("application/json"));
}

#[test]
fn test_wrapped_body_binds_by_name() {
    let descriptor = OperationDescriptor::builder("Register")
        .parameter("display_name", TypeRef::string())
        .parameter("tier", TypeRef::enumeration::<Tier>())
        .parameter("age", TypeRef::scalar::<u8>())
        .build()
        .unwrap();
    let formatter = DispatchFormatter::new(Arc::new(descriptor));

    let message = request(BoundVariables::new())
        .with_buffered_body(r#"{"displayName":"Ann","tier":"Pro","ignored":1}"#);
    let mut slots = ParameterSlots::with_len(3);
    formatter.deserialize_request(&message, &mut slots).unwrap();

    assert_eq!(slots.get::<String>(0).unwrap(), "Ann");
    assert_eq!(slots.get::<Tier>(1), Some(&Tier::Pro));
    assert_eq!(slots.get::<u8>(2), Some(&0));
}

#[test]
fn test_builder_rejects_orphan_template_variable() {
    let result = OperationDescriptor::builder("GetUser")
        .parameter("id", TypeRef::scalar::<i32>())
        .uri_template("users/{uid}")
        .build();

    assert!(matches!(result, Err(DispatchError::BindingConfiguration(_))));
}

#[test]
fn test_unit_reply_has_empty_body() {
    let descriptor = OperationDescriptor::builder("Delete")
        .parameter("id", TypeRef::scalar::<i32>())
        .uri_template("users/{id}")
        .build()
        .unwrap();
    let formatter = DispatchFormatter::new(Arc::new(descriptor));

    let reply = formatter
        .serialize_reply(MessageVersion::Soap12, &ParameterSlots::with_len(1), &())
        .unwrap();

    assert_eq!(reply.version(), MessageVersion::Soap12);
    assert!(reply_body(&reply).is_empty());
}

#[test]
fn test_fault_reply_carries_status() {
    let formatter = DispatchFormatter::new(get_user());
    let reply = formatter
        .serialize_fault(MessageVersion::None, &DispatchError::MissingUriMatch)
        .unwrap();

    assert_eq!(reply.http_response().unwrap().status, 500);
    let body: serde_json::Value = serde_json::from_slice(&reply_body(&reply)).unwrap();
    assert_eq!(body["code"], "MISSING_URI_MATCH");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_do_not_interfere() {
    let formatter = Arc::new(DispatchFormatter::new(get_user()));

    let handles = (0..64).map(|i| {
        let formatter = Arc::clone(&formatter);
        tokio::spawn(async move {
            let verbose = i % 2 == 0;
            let message = request(BoundVariables::new().with("id", i.to_string()))
                .with_buffered_body(json!({ "verbose": verbose }).to_string());

            let mut slots = ParameterSlots::with_len(2);
            formatter.deserialize_request(&message, &mut slots).unwrap();
            (
                i,
                slots.take::<i32>(0).unwrap(),
                slots.take::<DetailRequest>(1).unwrap(),
            )
        })
    });

    for result in futures::future::join_all(handles).await {
        let (i, id, detail) = result.unwrap();
        assert_eq!(id, i);
        assert_eq!(detail.verbose, i % 2 == 0);
    }
}

#[tokio::test]
async fn test_service_oneshot() {
    let table = OperationTable::new()
        .register(
            get_user_descriptor(),
            operation_fn(|params: &ParameterSlots| {
                let id = params.get::<i32>(0).copied().unwrap_or_default();
                Ok(UserName {
                    name: format!("user-{}", id),
                })
            }),
        )
        .unwrap();

    let message = request(BoundVariables::new().with("id", "42")).with_buffered_body(r#"{"verbose":true}"#);
    let reply = DispatchService::new(table)
        .oneshot(DispatchRequest::new("GetUser", message))
        .await
        .unwrap();

    assert_eq!(reply.action(), Some("GetUserResponse"));
    assert_eq!(reply_body(&reply), br#"{"name":"user-42"}"#);
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ticket {
    ticket_id: String,
    custom_fields: std::collections::BTreeMap<String, String>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
struct Sample {
    x_1: i32,
    y_2: i32,
}

#[test]
fn test_round_trip_keeps_renames_map_keys_and_digit_members() {
    let codec = JsonCodec::new();

    let ticket = Ticket {
        ticket_id: "T-7".to_string(),
        custom_fields: [("dueDate", "soon"), ("owner_team", "core")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    };
    let ty = TypeRef::json::<Ticket>();
    let bytes = codec.encode(&ticket, &ty).unwrap();
    assert_eq!(
        &bytes[..],
        br#"{"customFields":{"dueDate":"soon","owner_team":"core"},"ticketId":"T-7"}"#
    );
    let back = codec.decode(&bytes, &ty).unwrap();
    assert_eq!(back.downcast_ref::<Ticket>(), Some(&ticket));

    let sample = Sample { x_1: 5, y_2: -1 };
    let ty = TypeRef::json::<Sample>();
    let bytes = codec.encode(&sample, &ty).unwrap();
    assert_eq!(&bytes[..], br#"{"x1":5,"y2":-1}"#);
    let back = codec.decode(&bytes, &ty).unwrap();
    assert_eq!(back.downcast_ref::<Sample>(), Some(&sample));
}

#[tokio::test]
async fn test_client_errors_from_operation_keep_status() {
    let table = OperationTable::new()
        .register(
            get_user_descriptor(),
            operation_fn(|_: &ParameterSlots| -> Result<UserName, DispatchError> {
                Err(DispatchError::ParameterCoercion {
                    parameter: "id".to_string(),
                    value: "-1".to_string(),
                    expected: "a positive id",
                })
            }),
        )
        .unwrap();

    let message = request(BoundVariables::new().with("id", "-1"));
    let reply = DispatchService::new(table)
        .dispatch_or_fault(DispatchRequest::new("GetUser", message))
        .await
        .unwrap();

    assert_eq!(reply.http_response().unwrap().status, 400);
}
