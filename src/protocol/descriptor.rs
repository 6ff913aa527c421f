//! Operation descriptors
//!
//! An [`OperationDescriptor`] is built once at service start-up and shared
//! read-only by every request for that operation.

use crate::protocol::{
    error::{DispatchError, DispatchResult},
    template::UriTemplate,
    types::TypeRef,
};

/// Where a parameter's value comes from for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterSource {
    /// Bound from a URI template variable
    UriBound,

    /// Decoded from the JSON body
    Body,
}

/// A single operation parameter
#[derive(Debug, Clone)]
pub struct ParameterDescriptor {
    /// Parameter name, matched against URI template variables
    pub name: String,

    /// Declared type
    pub ty: TypeRef,

    /// Position in the invocation argument array
    pub index: usize,
}

/// Static metadata of a remotely invocable operation
#[derive(Debug, Clone)]
pub struct OperationDescriptor {
    name: String,
    parameters: Vec<ParameterDescriptor>,
    return_type: TypeRef,
    uri_template: Option<UriTemplate>,
}

impl OperationDescriptor {
    /// Start building a descriptor for operation `name`
    pub fn builder(name: impl Into<String>) -> OperationDescriptorBuilder {
        OperationDescriptorBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameters ordered by index
    pub fn parameters(&self) -> &[ParameterDescriptor] {
        &self.parameters
    }

    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    /// Find a parameter by exact name
    pub fn parameter(&self, name: &str) -> Option<&ParameterDescriptor> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn return_type(&self) -> &TypeRef {
        &self.return_type
    }

    pub fn uri_template(&self) -> Option<&UriTemplate> {
        self.uri_template.as_ref()
    }
}

/// Builder for [`OperationDescriptor`]
#[derive(Debug)]
pub struct OperationDescriptorBuilder {
    name: String,
    parameters: Vec<ParameterDescriptor>,
    return_type: TypeRef,
    uri_template: Option<String>,
}

impl OperationDescriptorBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            return_type: TypeRef::unit(),
            uri_template: None,
        }
    }

    /// Append a parameter at the next free position
    pub fn parameter(mut self, name: impl Into<String>, ty: TypeRef) -> Self {
        let index = self.parameters.len();
        self.parameters.push(ParameterDescriptor {
            name: name.into(),
            ty,
            index,
        });
        self
    }

    /// Add a parameter at an explicit position
    pub fn parameter_at(mut self, index: usize, name: impl Into<String>, ty: TypeRef) -> Self {
        self.parameters.push(ParameterDescriptor {
            name: name.into(),
            ty,
            index,
        });
        self
    }

    /// Set the return type (defaults to unit)
    pub fn returns(mut self, ty: TypeRef) -> Self {
        self.return_type = ty;
        self
    }

    /// Declare the URI template the host routes this operation with
    pub fn uri_template(mut self, template: impl Into<String>) -> Self {
        self.uri_template = Some(template.into());
        self
    }

    /// Validate and build the descriptor
    pub fn build(self) -> DispatchResult<OperationDescriptor> {
        if self.name.trim().is_empty() {
            return Err(DispatchError::BindingConfiguration(
                "Operation name cannot be empty".into(),
            ));
        }

        let mut parameters = self.parameters;
        parameters.sort_by_key(|p| p.index);

        for (position, parameter) in parameters.iter().enumerate() {
            if parameter.name.trim().is_empty() {
                return Err(DispatchError::BindingConfiguration(format!(
                    "Operation '{}' has a parameter without a name",
                    self.name
                )));
            }
            if parameter.index != position {
                return Err(DispatchError::BindingConfiguration(format!(
                    "Operation '{}' parameter indices must be contiguous from 0, found {} at position {}",
                    self.name, parameter.index, position
                )));
            }
            if parameters[..position]
                .iter()
                .any(|p| p.name.eq_ignore_ascii_case(&parameter.name))
            {
                return Err(DispatchError::BindingConfiguration(format!(
                    "Operation '{}' declares parameter '{}' twice",
                    self.name, parameter.name
                )));
            }
        }

        let uri_template = self.uri_template.map(UriTemplate::parse).transpose()?;
        if let Some(template) = &uri_template {
            check_template(&self.name, template, &parameters)?;
        }

        Ok(OperationDescriptor {
            name: self.name,
            parameters,
            return_type: self.return_type,
            uri_template,
        })
    }
}

/// Apply the body-parameter rule to the variables a template can bind
fn check_template(
    operation: &str,
    template: &UriTemplate,
    parameters: &[ParameterDescriptor],
) -> DispatchResult<()> {
    if let Some(orphan) = template
        .variables()
        .iter()
        .find(|v| !parameters.iter().any(|p| p.name.eq_ignore_ascii_case(v)))
    {
        return Err(DispatchError::BindingConfiguration(format!(
            "URI template '{}' of operation '{}' binds '{}', which is not a parameter",
            template.as_str(),
            operation,
            orphan
        )));
    }

    let unbound = parameters
        .iter()
        .filter(|p| !template.binds(&p.name))
        .count();
    if unbound > 1 && unbound < parameters.len() {
        return Err(DispatchError::BindingConfiguration(format!(
            "Operation '{}' leaves {} parameters outside URI template '{}'; at most one can come from the body",
            operation,
            unbound,
            template.as_str()
        )));
    }

    Ok(())
}
