//! Serde adapters between Rust values and camelCase wire trees
//!
//! [`to_wire`] serializes a value straight into a [`Value`] tree, renaming
//! struct members with [`to_camel_case`]. [`from_wire`] walks a tree back into
//! a value; struct objects have their keys matched against the declared member
//! names, everything else (map keys included) is left as it arrived.

use std::fmt;

use serde::{
    de::{
        self,
        value::{MapDeserializer, SeqDeserializer, StringDeserializer},
        DeserializeOwned, DeserializeSeed, Deserializer as _, EnumAccess, Expected,
        IntoDeserializer, Unexpected, VariantAccess, Visitor,
    },
    forward_to_deserialize_any,
    ser::{self, Serialize, Serializer as _},
};
use serde_json::{Map, Number, Value};

use crate::{
    codec::{
        datetime::{self, INVALID_DATE},
        naming::{member_name, to_camel_case},
    },
    protocol::error::DispatchError,
};

/// Serialize `value` into a wire tree with camelCase member names
pub fn to_wire<T: Serialize + ?Sized>(value: &T) -> Result<Value, serde_json::Error> {
    value.serialize(WireSerializer)
}

/// Deserialize a wire tree, matching camelCase members to their declared names
pub fn from_wire<T: DeserializeOwned>(value: Value) -> Result<T, WireError> {
    T::deserialize(WireValue(value))
}

/// Failure to turn a wire tree into a value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    /// The tree does not fit the target type
    #[error("{0}")]
    Data(String),

    /// A date/time member holds an unparseable string
    #[error("{0}")]
    Format(String),
}

impl de::Error for WireError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        WireError::Data(msg.to_string())
    }

    fn invalid_value(unexp: Unexpected<'_>, exp: &dyn Expected) -> Self {
        let message = format!("invalid value: {}, expected {}", unexp, exp);
        if datetime::is_date_time(exp) {
            WireError::Format(format!("{}: {}", INVALID_DATE, message))
        } else {
            WireError::Data(message)
        }
    }
}

impl From<WireError> for DispatchError {
    fn from(err: WireError) -> Self {
        match err {
            WireError::Data(message) => DispatchError::body(message),
            WireError::Format(message) => DispatchError::Format(message),
        }
    }
}

// Serialization

struct WireSerializer;

fn tagged(variant: &str, value: Value) -> Value {
    let mut map = Map::with_capacity(1);
    map.insert(variant.to_owned(), value);
    Value::Object(map)
}

impl ser::Serializer for WireSerializer {
    type Ok = Value;
    type Error = serde_json::Error;

    type SerializeSeq = WireSeq;
    type SerializeTuple = WireSeq;
    type SerializeTupleStruct = WireSeq;
    type SerializeTupleVariant = WireSeq;
    type SerializeMap = WireMap;
    type SerializeStruct = WireStruct;
    type SerializeStructVariant = WireStruct;

    fn serialize_bool(self, v: bool) -> Result<Value, Self::Error> {
        Ok(Value::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Value, Self::Error> {
        Ok(Value::from(v))
    }

    fn serialize_i16(self, v: i16) -> Result<Value, Self::Error> {
        Ok(Value::from(v))
    }

    fn serialize_i32(self, v: i32) -> Result<Value, Self::Error> {
        Ok(Value::from(v))
    }

    fn serialize_i64(self, v: i64) -> Result<Value, Self::Error> {
        Ok(Value::from(v))
    }

    fn serialize_i128(self, v: i128) -> Result<Value, Self::Error> {
        serde_json::value::Serializer.serialize_i128(v)
    }

    fn serialize_u8(self, v: u8) -> Result<Value, Self::Error> {
        Ok(Value::from(v))
    }

    fn serialize_u16(self, v: u16) -> Result<Value, Self::Error> {
        Ok(Value::from(v))
    }

    fn serialize_u32(self, v: u32) -> Result<Value, Self::Error> {
        Ok(Value::from(v))
    }

    fn serialize_u64(self, v: u64) -> Result<Value, Self::Error> {
        Ok(Value::from(v))
    }

    fn serialize_u128(self, v: u128) -> Result<Value, Self::Error> {
        serde_json::value::Serializer.serialize_u128(v)
    }

    fn serialize_f32(self, v: f32) -> Result<Value, Self::Error> {
        serde_json::value::Serializer.serialize_f32(v)
    }

    fn serialize_f64(self, v: f64) -> Result<Value, Self::Error> {
        serde_json::value::Serializer.serialize_f64(v)
    }

    fn serialize_char(self, v: char) -> Result<Value, Self::Error> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Value, Self::Error> {
        Ok(Value::String(v.to_owned()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Value, Self::Error> {
        serde_json::value::Serializer.serialize_bytes(v)
    }

    fn serialize_none(self) -> Result<Value, Self::Error> {
        Ok(Value::Null)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<Value, Self::Error> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value, Self::Error> {
        Ok(Value::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Value, Self::Error> {
        Ok(Value::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<Value, Self::Error> {
        Ok(Value::String(variant.to_owned()))
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Value, Self::Error> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Value, Self::Error> {
        Ok(tagged(variant, to_wire(value)?))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<WireSeq, Self::Error> {
        Ok(WireSeq {
            variant: None,
            items: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<WireSeq, Self::Error> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<WireSeq, Self::Error> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<WireSeq, Self::Error> {
        Ok(WireSeq {
            variant: Some(variant),
            items: Vec::with_capacity(len),
        })
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<WireMap, Self::Error> {
        Ok(WireMap {
            entries: Map::new(),
            next_key: None,
        })
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<WireStruct, Self::Error> {
        Ok(WireStruct {
            variant: None,
            members: Map::new(),
        })
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<WireStruct, Self::Error> {
        Ok(WireStruct {
            variant: Some(variant),
            members: Map::new(),
        })
    }
}

struct WireSeq {
    variant: Option<&'static str>,
    items: Vec<Value>,
}

impl WireSeq {
    fn push<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), serde_json::Error> {
        self.items.push(to_wire(value)?);
        Ok(())
    }

    fn finish(self) -> Value {
        let items = Value::Array(self.items);
        match self.variant {
            Some(variant) => tagged(variant, items),
            None => items,
        }
    }
}

impl ser::SerializeSeq for WireSeq {
    type Ok = Value;
    type Error = serde_json::Error;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Self::Error> {
        self.push(value)
    }

    fn end(self) -> Result<Value, Self::Error> {
        Ok(self.finish())
    }
}

impl ser::SerializeTuple for WireSeq {
    type Ok = Value;
    type Error = serde_json::Error;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Self::Error> {
        self.push(value)
    }

    fn end(self) -> Result<Value, Self::Error> {
        Ok(self.finish())
    }
}

impl ser::SerializeTupleStruct for WireSeq {
    type Ok = Value;
    type Error = serde_json::Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Self::Error> {
        self.push(value)
    }

    fn end(self) -> Result<Value, Self::Error> {
        Ok(self.finish())
    }
}

impl ser::SerializeTupleVariant for WireSeq {
    type Ok = Value;
    type Error = serde_json::Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Self::Error> {
        self.push(value)
    }

    fn end(self) -> Result<Value, Self::Error> {
        Ok(self.finish())
    }
}

struct WireMap {
    entries: Map<String, Value>,
    next_key: Option<String>,
}

impl ser::SerializeMap for WireMap {
    type Ok = Value;
    type Error = serde_json::Error;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), Self::Error> {
        let key = match key.serialize(serde_json::value::Serializer)? {
            Value::String(key) => key,
            Value::Number(number) => number.to_string(),
            Value::Bool(flag) => flag.to_string(),
            _ => return Err(ser::Error::custom("map keys must be strings, numbers or booleans")),
        };
        self.next_key = Some(key);
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Self::Error> {
        let key = self
            .next_key
            .take()
            .ok_or_else(|| <serde_json::Error as ser::Error>::custom("map value without a key"))?;
        self.entries.insert(key, to_wire(value)?);
        Ok(())
    }

    fn end(self) -> Result<Value, Self::Error> {
        Ok(Value::Object(self.entries))
    }
}

struct WireStruct {
    variant: Option<&'static str>,
    members: Map<String, Value>,
}

impl WireStruct {
    fn insert<T: Serialize + ?Sized>(
        &mut self,
        name: &'static str,
        value: &T,
    ) -> Result<(), serde_json::Error> {
        self.members.insert(to_camel_case(name), to_wire(value)?);
        Ok(())
    }

    fn finish(self) -> Value {
        let members = Value::Object(self.members);
        match self.variant {
            Some(variant) => tagged(variant, members),
            None => members,
        }
    }
}

impl ser::SerializeStruct for WireStruct {
    type Ok = Value;
    type Error = serde_json::Error;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        name: &'static str,
        value: &T,
    ) -> Result<(), Self::Error> {
        self.insert(name, value)
    }

    fn end(self) -> Result<Value, Self::Error> {
        Ok(self.finish())
    }
}

impl ser::SerializeStructVariant for WireStruct {
    type Ok = Value;
    type Error = serde_json::Error;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        name: &'static str,
        value: &T,
    ) -> Result<(), Self::Error> {
        self.insert(name, value)
    }

    fn end(self) -> Result<Value, Self::Error> {
        Ok(self.finish())
    }
}

// Deserialization

fn unexpected(value: &Value) -> Unexpected<'_> {
    match value {
        Value::Null => Unexpected::Unit,
        Value::Bool(flag) => Unexpected::Bool(*flag),
        Value::Number(_) => Unexpected::Other("number"),
        Value::String(text) => Unexpected::Str(text),
        Value::Array(_) => Unexpected::Seq,
        Value::Object(_) => Unexpected::Map,
    }
}

struct WireValue(Value);

impl WireValue {
    fn visit_array<'de, V: Visitor<'de>>(items: Vec<Value>, visitor: V) -> Result<V::Value, WireError> {
        let mut seq = SeqDeserializer::<_, WireError>::new(items.into_iter().map(WireValue));
        let value = visitor.visit_seq(&mut seq)?;
        seq.end()?;
        Ok(value)
    }

    fn visit_object<'de, V: Visitor<'de>>(
        entries: Map<String, Value>,
        members: Option<&'static [&'static str]>,
        visitor: V,
    ) -> Result<V::Value, WireError> {
        let entries = entries.into_iter().map(|(key, value)| {
            let key = match members {
                Some(members) => member_name(key, members),
                None => key,
            };
            (WireKey(key), WireValue(value))
        });

        let mut map = MapDeserializer::<_, WireError>::new(entries);
        let value = visitor.visit_map(&mut map)?;
        map.end()?;
        Ok(value)
    }
}

impl<'de> IntoDeserializer<'de, WireError> for WireValue {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

impl<'de> de::Deserializer<'de> for WireValue {
    type Error = WireError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, WireError> {
        match self.0 {
            Value::Null => visitor.visit_unit(),
            Value::Bool(flag) => visitor.visit_bool(flag),
            Value::Number(number) => visit_number(number, visitor),
            Value::String(text) => visitor.visit_string(text),
            Value::Array(items) => Self::visit_array(items, visitor),
            Value::Object(entries) => Self::visit_object(entries, None, visitor),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, WireError> {
        match self.0 {
            Value::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, WireError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, WireError> {
        match self.0 {
            Value::Object(entries) => Self::visit_object(entries, Some(fields), visitor),
            other => WireValue(other).deserialize_any(visitor),
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, WireError> {
        match self.0 {
            Value::String(variant) => visitor.visit_enum(WireEnum {
                variant,
                content: None,
            }),
            Value::Object(entries) if entries.len() == 1 => {
                let mut entries = entries.into_iter();
                match entries.next() {
                    Some((variant, content)) => visitor.visit_enum(WireEnum {
                        variant,
                        content: Some(content),
                    }),
                    None => Err(de::Error::invalid_length(0, &"a single-key object")),
                }
            }
            other => Err(de::Error::invalid_type(unexpected(&other), &"an enum")),
        }
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple tuple_struct map identifier ignored_any
    }
}

fn visit_number<'de, V: Visitor<'de>>(number: Number, visitor: V) -> Result<V::Value, WireError> {
    if let Some(n) = number.as_u64() {
        visitor.visit_u64(n)
    } else if let Some(n) = number.as_i64() {
        visitor.visit_i64(n)
    } else if let Some(n) = number.as_f64() {
        visitor.visit_f64(n)
    } else {
        Err(de::Error::invalid_type(Unexpected::Other("number"), &visitor))
    }
}

/// Object key; numeric and boolean map keys are parsed on request
struct WireKey(String);

impl<'de> IntoDeserializer<'de, WireError> for WireKey {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

macro_rules! deserialize_parsed_key {
    ($($method:ident => $visit:ident: $ty:ty),* $(,)?) => {$(
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, WireError> {
            match self.0.parse::<$ty>() {
                Ok(value) => visitor.$visit(value),
                Err(_) => visitor.visit_string(self.0),
            }
        }
    )*};
}

impl<'de> de::Deserializer<'de> for WireKey {
    type Error = WireError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, WireError> {
        visitor.visit_string(self.0)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, WireError> {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, WireError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, WireError> {
        visitor.visit_enum(StringDeserializer::<WireError>::new(self.0))
    }

    deserialize_parsed_key! {
        deserialize_bool => visit_bool: bool,
        deserialize_i8 => visit_i8: i8,
        deserialize_i16 => visit_i16: i16,
        deserialize_i32 => visit_i32: i32,
        deserialize_i64 => visit_i64: i64,
        deserialize_u8 => visit_u8: u8,
        deserialize_u16 => visit_u16: u16,
        deserialize_u32 => visit_u32: u32,
        deserialize_u64 => visit_u64: u64,
    }

    forward_to_deserialize_any! {
        i128 u128 f32 f64 char str string bytes byte_buf unit unit_struct
        seq tuple tuple_struct map struct identifier ignored_any
    }
}

struct WireEnum {
    variant: String,
    content: Option<Value>,
}

impl<'de> EnumAccess<'de> for WireEnum {
    type Error = WireError;
    type Variant = WireVariant;

    fn variant_seed<S: DeserializeSeed<'de>>(
        self,
        seed: S,
    ) -> Result<(S::Value, WireVariant), WireError> {
        let variant = seed.deserialize(StringDeserializer::<WireError>::new(self.variant))?;
        Ok((variant, WireVariant(self.content)))
    }
}

struct WireVariant(Option<Value>);

impl<'de> VariantAccess<'de> for WireVariant {
    type Error = WireError;

    fn unit_variant(self) -> Result<(), WireError> {
        match self.0 {
            None | Some(Value::Null) => Ok(()),
            Some(other) => Err(de::Error::invalid_type(unexpected(&other), &"a unit variant")),
        }
    }

    fn newtype_variant_seed<S: DeserializeSeed<'de>>(self, seed: S) -> Result<S::Value, WireError> {
        match self.0 {
            Some(content) => seed.deserialize(WireValue(content)),
            None => Err(de::Error::invalid_type(
                Unexpected::UnitVariant,
                &"a newtype variant",
            )),
        }
    }

    fn tuple_variant<V: Visitor<'de>>(self, len: usize, visitor: V) -> Result<V::Value, WireError> {
        match self.0 {
            Some(content) => de::Deserializer::deserialize_tuple(WireValue(content), len, visitor),
            None => Err(de::Error::invalid_type(
                Unexpected::UnitVariant,
                &"a tuple variant",
            )),
        }
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, WireError> {
        match self.0 {
            Some(content) => {
                de::Deserializer::deserialize_struct(WireValue(content), "", fields, visitor)
            }
            None => Err(de::Error::invalid_type(
                Unexpected::UnitVariant,
                &"a struct variant",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};

    use serde::{Deserialize, Serialize};
    use serde_json::json;

    use super::*;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Account {
        display_name: String,
        labels: HashMap<String, u32>,
        x_1: i32,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Renamed {
        display_name: String,
        #[serde(rename = "Legacy")]
        legacy_id: u32,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    enum Shape {
        Point,
        Circle(f64),
        Pair(u8, u8),
        Rect { top_left: u32, bottom_right: u32 },
    }

    #[test]
    fn test_to_wire_renames_members_not_map_keys() {
        let account = Account {
            display_name: "Ann".into(),
            labels: HashMap::from([("foo_bar".to_string(), 1)]),
            x_1: 5,
        };

        assert_eq!(
            to_wire(&account).unwrap(),
            json!({"displayName": "Ann", "labels": {"foo_bar": 1}, "x1": 5})
        );
    }

    #[test]
    fn test_from_wire_keeps_map_keys() {
        let account: Account =
            from_wire(json!({"displayName": "Ann", "labels": {"fooBar": 1}, "x1": 5})).unwrap();

        assert_eq!(account.display_name, "Ann");
        assert_eq!(account.labels.keys().collect::<Vec<_>>(), ["fooBar"]);
        assert_eq!(account.x_1, 5);
    }

    #[test]
    fn test_declared_names_accepted() {
        let account: Account =
            from_wire(json!({"display_name": "Bo", "labels": {}, "x_1": 2})).unwrap();
        assert_eq!(account.display_name, "Bo");
        assert_eq!(account.x_1, 2);
    }

    #[test]
    fn test_serde_renames_round_trip() {
        let renamed = Renamed {
            display_name: "Ann".into(),
            legacy_id: 9,
        };

        let wire = to_wire(&renamed).unwrap();
        assert_eq!(wire, json!({"displayName": "Ann", "Legacy": 9}));
        assert_eq!(from_wire::<Renamed>(wire).unwrap(), renamed);
    }

    #[test]
    fn test_enum_variants_round_trip() {
        for shape in [
            Shape::Point,
            Shape::Circle(1.5),
            Shape::Pair(1, 2),
            Shape::Rect {
                top_left: 3,
                bottom_right: 4,
            },
        ] {
            let wire = to_wire(&shape).unwrap();
            assert_eq!(from_wire::<Shape>(wire).unwrap(), shape);
        }

        assert_eq!(
            to_wire(&Shape::Rect {
                top_left: 3,
                bottom_right: 4
            })
            .unwrap(),
            json!({"Rect": {"topLeft": 3, "bottomRight": 4}})
        );
    }

    #[test]
    fn test_numeric_map_keys() {
        let scores = BTreeMap::from([(1u32, "one".to_string()), (20, "twenty".to_string())]);

        let wire = to_wire(&scores).unwrap();
        assert_eq!(wire, json!({"1": "one", "20": "twenty"}));
        assert_eq!(from_wire::<BTreeMap<u32, String>>(wire).unwrap(), scores);
    }

    #[test]
    fn test_options_and_values() {
        let wire = json!({"nested": {"inner_key": [1, null, "x"]}});
        assert_eq!(from_wire::<Value>(wire.clone()).unwrap(), wire);
        assert_eq!(from_wire::<Option<u8>>(Value::Null).unwrap(), None);
        assert_eq!(from_wire::<Option<u8>>(json!(4)).unwrap(), Some(4));
    }

    #[test]
    fn test_data_errors() {
        let err = from_wire::<Account>(json!({"displayName": 3})).unwrap_err();
        assert!(matches!(err, WireError::Data(_)));

        let err = from_wire::<Shape>(json!(["Point"])).unwrap_err();
        assert!(matches!(err, WireError::Data(_)));
    }

    #[test]
    fn test_bad_date_is_format_error() {
        let err = from_wire::<crate::codec::WireDateTime>(json!("tomorrow")).unwrap_err();
        assert!(matches!(err, WireError::Format(ref msg) if msg.starts_with(INVALID_DATE)));
        assert!(matches!(DispatchError::from(err), DispatchError::Format(_)));
    }
}
