//! Parameter binding
//!
//! Reconciles the three parameter sources of a request: URI template
//! variables, the JSON body, and the operation descriptor.
//!
//! Binding happens in two steps. [`ParameterBinder::plan`] decides, from the
//! names the host bound, which parameters come from the URI and which from the
//! body. [`ParameterBinder::bind_planned`] then produces the values. Splitting
//! the steps lets the formatter skip reading the body when no parameter needs it.

pub mod coerce;

use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    codec::{naming, JsonCodec},
    protocol::{
        descriptor::{OperationDescriptor, ParameterDescriptor, ParameterSource},
        error::{DispatchError, DispatchResult},
        types::{BoxedValue, TypeKind},
    },
    transport::BoundVariables,
};

/// What to do when a URI-bound value does not fit its declared type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CoercionPolicy {
    /// Substitute the type's zero value and log a warning
    #[default]
    Lenient,

    /// Fail the request with [`DispatchError::ParameterCoercion`]
    Strict,
}

/// How the body feeds the parameters of one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyBinding {
    /// Every parameter is URI-bound, the body is not read
    None,

    /// The whole body is the parameter at this index
    Single(usize),

    /// The body is a JSON object whose members are the parameters, by name
    Wrapped,
}

/// Per-request classification of an operation's parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingPlan {
    sources: Vec<ParameterSource>,
    body: BodyBinding,
}

impl BindingPlan {
    /// Source of the parameter at `index`
    pub fn source(&self, index: usize) -> Option<ParameterSource> {
        self.sources.get(index).copied()
    }

    pub fn body(&self) -> BodyBinding {
        self.body
    }

    /// Check if binding needs the request body
    pub fn needs_body(&self) -> bool {
        self.body != BodyBinding::None
    }
}

/// Produces the ordered parameter values for an invocation
#[derive(Debug, Clone, Default)]
pub struct ParameterBinder {
    codec: JsonCodec,
    policy: CoercionPolicy,
}

impl ParameterBinder {
    /// Create a binder with the given coercion policy
    pub fn new(policy: CoercionPolicy) -> Self {
        Self {
            codec: JsonCodec::new(),
            policy,
        }
    }

    pub fn policy(&self) -> CoercionPolicy {
        self.policy
    }

    /// Bind every parameter of `descriptor`, values ordered by index
    pub fn bind(
        &self,
        descriptor: &OperationDescriptor,
        bound_variables: &BoundVariables,
        raw_body: &[u8],
    ) -> DispatchResult<Vec<BoxedValue>> {
        let plan = self.plan(descriptor, bound_variables)?;
        self.bind_planned(descriptor, &plan, bound_variables, raw_body)
    }

    /// Classify the parameters of `descriptor` against the bound variable names
    pub fn plan(
        &self,
        descriptor: &OperationDescriptor,
        bound_variables: &BoundVariables,
    ) -> DispatchResult<BindingPlan> {
        let sources: Vec<ParameterSource> = descriptor
            .parameters()
            .iter()
            .map(|p| {
                if bound_variables.contains(&p.name) {
                    ParameterSource::UriBound
                } else {
                    ParameterSource::Body
                }
            })
            .collect();

        let unmatched: Vec<usize> = sources
            .iter()
            .enumerate()
            .filter(|(_, source)| **source == ParameterSource::Body)
            .map(|(index, _)| index)
            .collect();

        let body = match unmatched.as_slice() {
            [] => BodyBinding::None,
            [index] => BodyBinding::Single(*index),
            all if all.len() == sources.len() => BodyBinding::Wrapped,
            several => {
                let names: Vec<&str> = several
                    .iter()
                    .map(|i| descriptor.parameters()[*i].name.as_str())
                    .collect();
                return Err(DispatchError::BindingConfiguration(format!(
                    "Operation '{}' has {} parameters not bound by the URI template ({}); at most one can come from the body",
                    descriptor.name(),
                    several.len(),
                    names.join(", ")
                )));
            }
        };

        debug!(
            operation = descriptor.name(),
            uri_bound = sources.len() - unmatched.len(),
            body = ?body,
            "planned parameter binding"
        );

        Ok(BindingPlan { sources, body })
    }

    /// Produce the parameter values following `plan`
    ///
    /// Nothing is returned unless every parameter was bound.
    pub fn bind_planned(
        &self,
        descriptor: &OperationDescriptor,
        plan: &BindingPlan,
        bound_variables: &BoundVariables,
        raw_body: &[u8],
    ) -> DispatchResult<Vec<BoxedValue>> {
        let parameters = descriptor.parameters();
        let mut values: Vec<Option<BoxedValue>> = (0..parameters.len()).map(|_| None).collect();

        for parameter in parameters {
            if plan.source(parameter.index) != Some(ParameterSource::UriBound) {
                continue;
            }
            let raw = bound_variables.get(&parameter.name).unwrap_or_default();
            values[parameter.index] = Some(self.coerce(parameter, raw)?);
        }

        match plan.body() {
            BodyBinding::None => {}
            BodyBinding::Single(index) => {
                let parameter = &parameters[index];
                values[index] = Some(self.decode_body(parameter, raw_body)?);
            }
            BodyBinding::Wrapped => self.decode_wrapped(parameters, raw_body, &mut values)?,
        }

        values
            .into_iter()
            .zip(parameters)
            .map(|(value, parameter)| {
                value.ok_or_else(|| {
                    DispatchError::BindingConfiguration(format!(
                        "Parameter '{}' of operation '{}' was not bound",
                        parameter.name,
                        descriptor.name()
                    ))
                })
            })
            .collect()
    }

    /// Scalar coercion of one URI-bound value
    fn coerce(&self, parameter: &ParameterDescriptor, raw: &str) -> DispatchResult<BoxedValue> {
        let ty = &parameter.ty;

        if ty.kind() != TypeKind::Text && raw.trim().is_empty() {
            return Ok(ty.zero_value());
        }

        if let Some(value) = ty.coerce(raw) {
            return Ok(value);
        }

        match self.policy {
            CoercionPolicy::Lenient => {
                warn!(
                    parameter = %parameter.name,
                    value = raw,
                    expected = ty.type_name(),
                    "URI value does not fit parameter type, using zero value"
                );
                Ok(ty.zero_value())
            }
            CoercionPolicy::Strict => Err(DispatchError::ParameterCoercion {
                parameter: parameter.name.clone(),
                value: raw.to_string(),
                expected: ty.type_name(),
            }),
        }
    }

    /// Decode the whole body into a single parameter
    fn decode_body(
        &self,
        parameter: &ParameterDescriptor,
        raw_body: &[u8],
    ) -> DispatchResult<BoxedValue> {
        let body = strip_bom(raw_body);
        if is_blank(body) {
            debug!(parameter = %parameter.name, "empty body, using zero value");
            return Ok(parameter.ty.zero_value());
        }
        self.codec.decode(body, &parameter.ty)
    }

    /// Decode a JSON object body whose members are the parameters
    fn decode_wrapped(
        &self,
        parameters: &[ParameterDescriptor],
        raw_body: &[u8],
        values: &mut [Option<BoxedValue>],
    ) -> DispatchResult<()> {
        let body = strip_bom(raw_body);
        let mut members = if is_blank(body) {
            serde_json::Map::new()
        } else {
            match JsonCodec::parse(body)? {
                Value::Object(map) => map,
                other => {
                    return Err(DispatchError::body(format!(
                        "Wrapped body must be a JSON object, found {}",
                        json_kind(&other)
                    )))
                }
            }
        };

        for parameter in parameters {
            let member = members
                .remove(&parameter.name)
                .or_else(|| members.remove(&naming::to_camel_case(&parameter.name)));

            values[parameter.index] = Some(match member {
                Some(value) => self.codec.decode_tree(value, &parameter.ty)?,
                None => parameter.ty.zero_value(),
            });
        }

        Ok(())
    }
}

fn strip_bom(body: &[u8]) -> &[u8] {
    body.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(body)
}

fn is_blank(body: &[u8]) -> bool {
    body.iter().all(u8::is_ascii_whitespace)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
