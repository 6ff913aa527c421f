//! JSON codec with the fixed camelCase naming policy

use std::any::Any;

use bytes::Bytes;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::{
    codec::wire,
    protocol::{
        error::{DispatchError, DispatchResult},
        types::{BoxedValue, TypeRef},
    },
};

/// Width of the body excerpt reported with syntax errors
const FRAGMENT_WIDTH: usize = 32;

/// JSON codec used for request bodies and replies
///
/// Struct member names are translated to camelCase on the wire in both
/// directions (see [`wire`]); map keys travel unchanged. Output is always
/// compact.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    /// Create a new JSON codec
    pub fn new() -> Self {
        Self
    }

    /// Encode a type-erased value of type `ty`
    pub fn encode(&self, value: &(dyn Any + Send + Sync), ty: &TypeRef) -> DispatchResult<Bytes> {
        let tree = ty.to_json(value)?;
        Self::write(tree)
    }

    /// Encode a concrete value
    pub fn encode_value<T: Serialize>(&self, value: &T) -> DispatchResult<Bytes> {
        let tree = wire::to_wire(value)?;
        Self::write(tree)
    }

    /// Decode `bytes` into a value of type `ty`
    pub fn decode(&self, bytes: &[u8], ty: &TypeRef) -> DispatchResult<BoxedValue> {
        let tree = Self::parse(bytes)?;
        self.decode_tree(tree, ty)
    }

    /// Decode `bytes` into a concrete value
    pub fn decode_value<T: DeserializeOwned>(&self, bytes: &[u8]) -> DispatchResult<T> {
        let tree = Self::parse(bytes)?;
        Ok(wire::from_wire(tree)?)
    }

    /// Decode an already-parsed wire tree into a value of type `ty`
    pub(crate) fn decode_tree(&self, tree: Value, ty: &TypeRef) -> DispatchResult<BoxedValue> {
        ty.from_json(tree)
    }

    /// Parse `bytes` into a wire tree, locating syntax errors in the input
    pub(crate) fn parse(bytes: &[u8]) -> DispatchResult<Value> {
        serde_json::from_slice(bytes).map_err(|err| DispatchError::BodyDeserialization {
            message: err.to_string(),
            fragment: fragment_at(bytes, err.line(), err.column()),
        })
    }

    /// Get the content type for this codec
    pub fn content_type(&self) -> &str {
        "application/json"
    }

    fn write(tree: Value) -> DispatchResult<Bytes> {
        let bytes = serde_json::to_vec(&tree)?;
        Ok(Bytes::from(bytes))
    }
}

/// Cut an excerpt of `bytes` starting a little before `line:column` (1-based)
fn fragment_at(bytes: &[u8], line: usize, column: usize) -> Option<String> {
    if line == 0 {
        return None;
    }

    let text = String::from_utf8_lossy(bytes);
    let line_text = text.lines().nth(line - 1)?;
    let chars: Vec<char> = line_text.chars().collect();
    let end = column.min(chars.len());
    let start = end.saturating_sub(FRAGMENT_WIDTH / 2);
    let stop = (start + FRAGMENT_WIDTH).min(chars.len());

    let fragment: String = chars[start..stop].iter().collect();
    if fragment.trim().is_empty() {
        None
    } else {
        Some(fragment)
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;
    use crate::codec::datetime::WireDateTime;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Profile {
        display_name: String,
        login_count: u32,
        is_admin: bool,
    }

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Audit {
        #[serde(with = "crate::codec::datetime")]
        changed_at: chrono::DateTime<chrono::FixedOffset>,
    }

    #[test]
    fn test_encode_uses_camel_case() {
        let codec = JsonCodec::new();
        let profile = Profile {
            display_name: "Ann".into(),
            login_count: 3,
            is_admin: false,
        };

        let bytes = codec.encode(&profile, &TypeRef::json::<Profile>()).unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"displayName": "Ann", "loginCount": 3, "isAdmin": false})
        );

        // Compact output
        assert!(!bytes.contains(&b'\n'));
        assert!(!bytes.contains(&b' '));
    }

    #[test]
    fn test_decode_camel_case() {
        let codec = JsonCodec::new();
        let json = br#"{"displayName":"Bob","loginCount":7,"isAdmin":true}"#;

        let value = codec.decode(json, &TypeRef::json::<Profile>()).unwrap();
        let profile = value.downcast_ref::<Profile>().unwrap();
        assert_eq!(profile.display_name, "Bob");
        assert_eq!(profile.login_count, 7);
        assert!(profile.is_admin);
    }

    #[test]
    fn test_decode_syntax_error_has_fragment() {
        let codec = JsonCodec::new();
        let err = codec
            .decode(br#"{"displayName": "Bob", oops}"#, &TypeRef::json::<Profile>())
            .unwrap_err();

        match err {
            DispatchError::BodyDeserialization { fragment, .. } => {
                assert!(fragment.unwrap().contains("oops"));
            }
            other => panic!("Expected BodyDeserialization, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_type_mismatch() {
        let codec = JsonCodec::new();
        let err = codec
            .decode(br#"{"loginCount":"many"}"#, &TypeRef::json::<Profile>())
            .unwrap_err();
        assert!(matches!(err, DispatchError::BodyDeserialization { .. }));
    }

    #[test]
    fn test_nested_bad_date_is_format_error() {
        let codec = JsonCodec::new();
        let err = codec
            .decode(br#"{"changedAt":"not-a-date"}"#, &TypeRef::json::<Audit>())
            .unwrap_err();
        assert!(matches!(err, DispatchError::Format(_)));
    }

    #[test]
    fn test_date_time_round_trip() {
        let codec = JsonCodec::new();
        let ty = TypeRef::date_time();
        let bytes = codec.encode_value(&"2030-01-02T03:04:05.678-07:00").unwrap();

        let value = codec.decode(&bytes, &ty).unwrap();
        let dt = value.downcast_ref::<WireDateTime>().unwrap();
        assert_eq!(dt.to_string(), "2030-01-02T03:04:05.678-07:00");

        let again = codec.encode(dt, &ty).unwrap();
        assert_eq!(&again[..], bytes.as_ref());
    }

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct TaskCard {
        task_id: String,
        context_id: Option<String>,
    }

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Labelled {
        labels: std::collections::HashMap<String, u32>,
        x_1: i32,
    }

    #[test]
    fn test_camel_case_struct_round_trip() {
        let codec = JsonCodec::new();
        let ty = TypeRef::json::<TaskCard>();
        let card = TaskCard {
            task_id: "t-1".into(),
            context_id: Some("c-9".into()),
        };

        let bytes = codec.encode(&card, &ty).unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json, serde_json::json!({"taskId": "t-1", "contextId": "c-9"}));

        let back = codec.decode(&bytes, &ty).unwrap();
        assert_eq!(back.downcast_ref::<TaskCard>(), Some(&card));
    }

    #[test]
    fn test_map_keys_and_digit_members_round_trip() {
        let codec = JsonCodec::new();
        let ty = TypeRef::json::<Labelled>();

        let value = codec
            .decode(br#"{"labels":{"fooBar":1,"baz_qux":2},"x1":5}"#, &ty)
            .unwrap();
        let labelled = value.downcast_ref::<Labelled>().unwrap();
        assert_eq!(labelled.labels.get("fooBar"), Some(&1));
        assert_eq!(labelled.labels.get("baz_qux"), Some(&2));
        assert_eq!(labelled.x_1, 5);

        let bytes = codec.encode(labelled, &ty).unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"labels": {"fooBar": 1, "baz_qux": 2}, "x1": 5})
        );

        let back = codec.decode(&bytes, &ty).unwrap();
        assert_eq!(back.downcast_ref::<Labelled>(), Some(labelled));
    }

    #[test]
    fn test_decode_value_uses_wire_names() {
        let codec = JsonCodec::new();
        let card: TaskCard = codec.decode_value(br#"{"taskId":"t-2"}"#).unwrap();
        assert_eq!(card.task_id, "t-2");
        assert_eq!(card.context_id, None);
    }

    #[test]
    fn test_content_type() {
        assert_eq!(JsonCodec.content_type(), "application/json");
    }
}
