//! Dispatch request type

use crate::transport::{Message, MessageVersion};

/// A request to the dispatch service
///
/// Names the operation the host routed the message to. The reply carries
/// `version` unchanged.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    /// Name of the target operation
    pub operation: String,

    /// Envelope version for the reply
    pub version: MessageVersion,

    /// The incoming message
    pub message: Message,
}

impl DispatchRequest {
    /// Create a request whose reply uses the message's own version
    pub fn new(operation: impl Into<String>, message: Message) -> Self {
        Self {
            operation: operation.into(),
            version: message.version(),
            message,
        }
    }

    /// Override the reply envelope version
    pub fn with_version(mut self, version: MessageVersion) -> Self {
        self.version = version;
        self
    }
}
