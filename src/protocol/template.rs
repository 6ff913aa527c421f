//! URI template variable extraction
//!
//! Matching a request URI against a template is the host's job. This module
//! only reads the variable names out of a template such as
//! `/users/{id}/orders?since={since}` so descriptors can be checked at start-up.

use crate::protocol::error::{DispatchError, DispatchResult};

/// A parsed URI template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriTemplate {
    template: String,
    variables: Vec<String>,
}

impl UriTemplate {
    /// Parse a template, collecting `{name}` and `{*name}` variables
    pub fn parse(template: impl Into<String>) -> DispatchResult<Self> {
        let template = template.into();
        let mut variables: Vec<String> = Vec::new();
        let mut rest = template.as_str();

        while let Some(open) = rest.find(['{', '}']) {
            if rest[open..].starts_with('}') {
                return Err(DispatchError::BindingConfiguration(format!(
                    "Unbalanced '}}' in URI template '{}'",
                    template
                )));
            }

            let after = &rest[open + 1..];
            let close = after.find('}').ok_or_else(|| {
                DispatchError::BindingConfiguration(format!(
                    "Unclosed '{{' in URI template '{}'",
                    template
                ))
            })?;

            let raw = &after[..close];
            let name = raw.trim_start_matches('*').trim();
            if name.is_empty() || name.contains('{') {
                return Err(DispatchError::BindingConfiguration(format!(
                    "Invalid variable '{{{}}}' in URI template '{}'",
                    raw, template
                )));
            }
            if variables.iter().any(|v| v.eq_ignore_ascii_case(name)) {
                return Err(DispatchError::BindingConfiguration(format!(
                    "Variable '{}' appears twice in URI template '{}'",
                    name, template
                )));
            }

            variables.push(name.to_string());
            rest = &after[close + 1..];
        }

        Ok(Self {
            template,
            variables,
        })
    }

    /// The template text
    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Variable names in order of appearance
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Check if the template binds `name` (ASCII case-insensitive)
    pub fn binds(&self, name: &str) -> bool {
        self.variables.iter().any(|v| v.eq_ignore_ascii_case(name))
    }
}
