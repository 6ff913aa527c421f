//! Error types for request binding and reply formatting

use thiserror::Error;

/// Main error type for dispatch formatting
///
/// Every variant is fatal for the request it was raised for. None of them is
/// retried locally; the host is expected to turn them into an HTTP error reply
/// (see [`DispatchError::status_code`]).
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The message body is not in the raw/binary form the formatter expects
    #[error("Unsupported content format: {0}")]
    UnsupportedContentFormat(String),

    /// The host did not attach URI template match results to the message
    #[error("Missing URI template match results on the incoming message")]
    MissingUriMatch,

    /// Operation metadata does not resolve to zero-or-one body parameter,
    /// or the descriptor itself is malformed
    #[error("Binding configuration error: {0}")]
    BindingConfiguration(String),

    /// The JSON body does not parse or does not match the declared type
    #[error("Body deserialization error: {message}")]
    BodyDeserialization {
        /// Parser message
        message: String,

        /// Excerpt of the body around the failure, when it can be located
        fragment: Option<String>,
    },

    /// A value violates its wire-format contract (notably date/time)
    #[error("Format error: {0}")]
    Format(String),

    /// A URI-bound value could not be coerced under the strict policy
    #[error("Cannot coerce parameter '{parameter}' value '{value}' into {expected}")]
    ParameterCoercion {
        parameter: String,
        value: String,
        expected: &'static str,
    },

    /// The operation result is not of the declared return type
    #[error("Result type mismatch: expected {expected}")]
    ResultTypeMismatch { expected: &'static str },

    /// No operation is registered under the requested name
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    /// The invoked operation failed
    #[error("Operation failed: {0}")]
    Operation(String),

    /// Serialization error while producing a reply
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with custom message
    #[error("{0}")]
    Other(String),
}

impl DispatchError {
    /// Create a body deserialization error without a located fragment
    pub fn body(message: impl Into<String>) -> Self {
        DispatchError::BodyDeserialization {
            message: message.into(),
            fragment: None,
        }
    }

    /// Short machine-readable code, used in fault replies
    pub fn code(&self) -> &'static str {
        match self {
            DispatchError::UnsupportedContentFormat(_) => "UNSUPPORTED_CONTENT_FORMAT",
            DispatchError::MissingUriMatch => "MISSING_URI_MATCH",
            DispatchError::BindingConfiguration(_) => "BINDING_CONFIGURATION",
            DispatchError::BodyDeserialization { .. } => "BODY_DESERIALIZATION",
            DispatchError::Format(_) => "FORMAT",
            DispatchError::ParameterCoercion { .. } => "PARAMETER_COERCION",
            DispatchError::ResultTypeMismatch { .. } => "RESULT_TYPE_MISMATCH",
            DispatchError::UnknownOperation(_) => "UNKNOWN_OPERATION",
            DispatchError::Operation(_) => "OPERATION_FAILED",
            DispatchError::Serialization(_) => "SERIALIZATION",
            DispatchError::Other(_) => "INTERNAL",
        }
    }

    /// HTTP status class the host should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            DispatchError::UnsupportedContentFormat(_)
            | DispatchError::BodyDeserialization { .. }
            | DispatchError::Format(_)
            | DispatchError::ParameterCoercion { .. } => 400,
            DispatchError::UnknownOperation(_) => 404,
            DispatchError::MissingUriMatch
            | DispatchError::BindingConfiguration(_)
            | DispatchError::ResultTypeMismatch { .. }
            | DispatchError::Operation(_)
            | DispatchError::Serialization(_)
            | DispatchError::Other(_) => 500,
        }
    }

    /// Check if the error was caused by the caller's request
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}

/// Result type alias for dispatch operations
pub type DispatchResult<T> = Result<T, DispatchError>;

impl From<&str> for DispatchError {
    fn from(s: &str) -> Self {
        DispatchError::Other(s.to_string())
    }
}

impl From<String> for DispatchError {
    fn from(s: String) -> Self {
        DispatchError::Other(s)
    }
}
