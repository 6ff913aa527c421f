//! Structural type descriptors and type-erased parameter values
//!
//! A [`TypeRef`] is resolved once per parameter when the operation descriptor is
//! built. It carries everything the binder and the codec need to know about a
//! type (zero value, scalar coercion, JSON conversion), so no runtime type
//! introspection happens on the request path.

use std::{any::Any, fmt, str::FromStr, sync::Arc};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::{
    binding::coerce,
    codec::{
        datetime::{self, WireDateTime},
        wire,
    },
    protocol::error::{DispatchError, DispatchResult},
};

/// A type-erased parameter or result value
pub type BoxedValue = Box<dyn Any + Send + Sync>;

/// Broad category of a wire type, drives scalar coercion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// Text, bound verbatim from URI values
    Text,

    /// Numbers, booleans and other `FromStr` scalars
    Scalar,

    /// Unit-only enums, matched by member name
    Enumeration,

    /// Date/time values using the canonical ISO-8601 form
    DateTime,

    /// Objects, sequences and anything else only reachable through JSON
    Structured,

    /// No value (operations without a result)
    Unit,
}

/// Interface over a concrete wire type
///
/// Implemented for every type built through the [`TypeRef`] constructors. Hosts
/// with unusual types can implement it themselves and wrap it with
/// [`TypeRef::custom`].
pub trait WireType: Send + Sync + 'static {
    /// Human-readable type name, used in errors and logs
    fn type_name(&self) -> &'static str;

    /// Category of the type
    fn kind(&self) -> TypeKind;

    /// The type's zero/default value
    fn zero_value(&self) -> BoxedValue;

    /// Convert a raw URI string, `None` when the string does not fit the type
    fn coerce(&self, raw: &str) -> Option<BoxedValue>;

    /// Convert a value of this type into a wire tree (camelCase members)
    fn to_json(&self, value: &(dyn Any + Send + Sync)) -> DispatchResult<Value>;

    /// Convert a wire tree into a value of this type
    ///
    /// Bad date/time strings are reported as [`DispatchError::Format`], any
    /// other mismatch as [`DispatchError::BodyDeserialization`].
    fn from_json(&self, value: Value) -> DispatchResult<BoxedValue>;
}

/// Shared handle to a [`WireType`]
#[derive(Clone)]
pub struct TypeRef(Arc<dyn WireType>);

impl TypeRef {
    /// Wrap a custom wire type
    pub fn custom(ty: Arc<dyn WireType>) -> Self {
        Self(ty)
    }

    /// `String`, bound verbatim
    pub fn string() -> Self {
        Self::typed::<String>(TypeKind::Text, |raw| Some(raw.to_owned()))
    }

    /// A `FromStr` scalar such as `i32`, `u64`, `f64` or `bool`
    pub fn scalar<T>() -> Self
    where
        T: FromStr + Serialize + DeserializeOwned + Default + Send + Sync + 'static,
    {
        Self::typed::<T>(TypeKind::Scalar, coerce::parse_scalar::<T>)
    }

    /// A unit-only enum; URI values match member names case-insensitively
    pub fn enumeration<T>() -> Self
    where
        T: Serialize + DeserializeOwned + Default + Send + Sync + 'static,
    {
        Self::typed::<T>(TypeKind::Enumeration, coerce::parse_enum::<T>)
    }

    /// [`WireDateTime`], the canonical ISO-8601 date/time
    pub fn date_time() -> Self {
        Self::typed::<WireDateTime>(TypeKind::DateTime, |raw| {
            datetime::parse(raw).ok().map(WireDateTime)
        })
    }

    /// Any serde type reachable only through a JSON body
    pub fn json<T>() -> Self
    where
        T: Serialize + DeserializeOwned + Default + Send + Sync + 'static,
    {
        Self::typed::<T>(TypeKind::Structured, |_| None)
    }

    /// `()`, for operations without a result
    pub fn unit() -> Self {
        Self::typed::<()>(TypeKind::Unit, |_| None)
    }

    fn typed<T>(kind: TypeKind, coerce: fn(&str) -> Option<T>) -> Self
    where
        T: Serialize + DeserializeOwned + Default + Send + Sync + 'static,
    {
        Self(Arc::new(Typed { kind, coerce }))
    }

    pub fn type_name(&self) -> &'static str {
        self.0.type_name()
    }

    pub fn kind(&self) -> TypeKind {
        self.0.kind()
    }

    pub fn zero_value(&self) -> BoxedValue {
        self.0.zero_value()
    }

    pub fn coerce(&self, raw: &str) -> Option<BoxedValue> {
        self.0.coerce(raw)
    }

    pub fn to_json(&self, value: &(dyn Any + Send + Sync)) -> DispatchResult<Value> {
        self.0.to_json(value)
    }

    pub fn from_json(&self, value: Value) -> DispatchResult<BoxedValue> {
        self.0.from_json(value)
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeRef").field(&self.type_name()).finish()
    }
}

struct Typed<T> {
    kind: TypeKind,
    coerce: fn(&str) -> Option<T>,
}

impl<T> WireType for Typed<T>
where
    T: Serialize + DeserializeOwned + Default + Send + Sync + 'static,
{
    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn kind(&self) -> TypeKind {
        self.kind
    }

    fn zero_value(&self) -> BoxedValue {
        Box::new(T::default())
    }

    fn coerce(&self, raw: &str) -> Option<BoxedValue> {
        (self.coerce)(raw).map(|value| Box::new(value) as BoxedValue)
    }

    fn to_json(&self, value: &(dyn Any + Send + Sync)) -> DispatchResult<Value> {
        let value = value
            .downcast_ref::<T>()
            .ok_or(DispatchError::ResultTypeMismatch {
                expected: self.type_name(),
            })?;
        Ok(wire::to_wire(value)?)
    }

    fn from_json(&self, value: Value) -> DispatchResult<BoxedValue> {
        let value: T = wire::from_wire(value)?;
        Ok(Box::new(value))
    }
}

/// Caller-supplied parameter array for one invocation
///
/// Slots are indexed by parameter position. The formatter fills every slot or
/// none of them.
#[derive(Default)]
pub struct ParameterSlots(Vec<Option<BoxedValue>>);

impl ParameterSlots {
    /// Create `len` empty slots
    pub fn with_len(len: usize) -> Self {
        Self((0..len).map(|_| None).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check if the slot at `index` holds a value
    pub fn is_filled(&self, index: usize) -> bool {
        matches!(self.0.get(index), Some(Some(_)))
    }

    /// Borrow the value at `index` as a `T`
    pub fn get<T: 'static>(&self, index: usize) -> Option<&T> {
        self.0.get(index)?.as_ref()?.downcast_ref::<T>()
    }

    /// Borrow the raw value at `index`
    pub fn get_raw(&self, index: usize) -> Option<&(dyn Any + Send + Sync)> {
        self.0.get(index)?.as_deref()
    }

    /// Move the value at `index` out as a `T`; the slot is left empty on success
    pub fn take<T: 'static>(&mut self, index: usize) -> Option<T> {
        let slot = self.0.get_mut(index)?;
        match slot.take()?.downcast::<T>() {
            Ok(value) => Some(*value),
            Err(other) => {
                *slot = Some(other);
                None
            }
        }
    }

    /// Store `value` at `index`
    pub fn set(&mut self, index: usize, value: BoxedValue) {
        if let Some(slot) = self.0.get_mut(index) {
            *slot = Some(value);
        }
    }

    /// Fill the slots in index order
    pub(crate) fn fill(&mut self, values: Vec<BoxedValue>) {
        for (slot, value) in self.0.iter_mut().zip(values) {
            *slot = Some(value);
        }
    }
}

impl fmt::Debug for ParameterSlots {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(
                self.0
                    .iter()
                    .map(|slot| if slot.is_some() { "<filled>" } else { "<empty>" }),
            )
            .finish()
    }
}
