//! Formatter configuration

use crate::{binding::CoercionPolicy, transport::BINARY_ELEMENT};

/// Configuration shared by the formatters of a service
#[derive(Debug, Clone)]
pub struct FormatterConfig {
    /// Failure policy for URI value coercion
    pub coercion_policy: CoercionPolicy,

    /// Name of the element wrapping base64 bodies
    pub body_element: String,
}

impl FormatterConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self {
            coercion_policy: CoercionPolicy::Lenient,
            body_element: BINARY_ELEMENT.to_string(),
        }
    }

    /// Set the coercion policy
    pub fn with_coercion_policy(mut self, policy: CoercionPolicy) -> Self {
        self.coercion_policy = policy;
        self
    }

    /// Set the body wrapper element name
    pub fn with_body_element(mut self, element: impl Into<String>) -> Self {
        self.body_element = element.into();
        self
    }
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self::new()
    }
}
