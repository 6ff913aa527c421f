//! Scalar coercion of URI-bound strings

use std::str::FromStr;

use serde::{
    de::{self, value::Error as ValueError, DeserializeOwned, IntoDeserializer, Visitor},
    forward_to_deserialize_any, Deserializer,
};

/// Parse a `FromStr` scalar from the trimmed input
///
/// The lowercase form is tried second so `True`/`FALSE` bind to booleans.
pub fn parse_scalar<T: FromStr>(raw: &str) -> Option<T> {
    let trimmed = raw.trim();
    trimmed
        .parse()
        .ok()
        .or_else(|| trimmed.to_ascii_lowercase().parse().ok())
}

/// Match a unit enum member by its serialized name, ignoring ASCII case
pub fn parse_enum<T: DeserializeOwned>(raw: &str) -> Option<T> {
    T::deserialize(MemberName(raw.trim())).ok()
}

/// Deserializer that only answers `deserialize_enum`
///
/// serde hands it the list of member names, so the match honours
/// `#[serde(rename)]` and `rename_all` on the enum.
struct MemberName<'a>(&'a str);

impl<'de> Deserializer<'de> for MemberName<'_> {
    type Error = ValueError;

    fn deserialize_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Self::Error> {
        Err(de::Error::custom("only enum members can be matched by name"))
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        let member: &'static str = variants
            .iter()
            .copied()
            .find(|v| v.eq_ignore_ascii_case(self.0))
            .ok_or_else(|| <ValueError as de::Error>::unknown_variant(self.0, variants))?;

        visitor.visit_enum(IntoDeserializer::<ValueError>::into_deserializer(member))
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct newtype_struct seq tuple
        tuple_struct map struct identifier ignored_any
    }
}
