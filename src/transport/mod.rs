//! Transport message abstraction
//!
//! The host runtime owns the network side. It hands the formatter one fully
//! buffered message per request through the [`TransportMessage`] trait and gets
//! a new [`Message`] back for the reply.

pub mod body;
pub mod properties;

use bytes::Bytes;
use uuid::Uuid;

pub use body::{read_raw_body, BinaryBodyWriter, BodyWriter, MessageBody, BINARY_ELEMENT};
pub use properties::{
    BoundVariables, HttpResponseProperty, MessageProperties, PropertyValue, UriTemplateMatch,
    WebContentFormat, HTTP_RESPONSE, URI_MATCH, URI_TEMPLATE_MATCH_RESULTS, WEB_BODY_FORMAT,
};

use crate::protocol::error::DispatchResult;

/// Read-only view of an incoming message
///
/// A message exposes its body either as a buffered blob or as a wrapper
/// element; the formatter picks the decoding path from whichever is present.
pub trait TransportMessage {
    /// The message property bag
    fn properties(&self) -> &MessageProperties;

    /// Raw body bytes, when the implementation keeps them buffered
    fn buffered_body(&self) -> Option<&[u8]> {
        None
    }

    /// The body as a single `<Binary>base64</Binary>` style element
    fn body_element(&self) -> Option<&str> {
        None
    }

    /// Body format reported by the host binding
    fn content_format(&self) -> Option<WebContentFormat> {
        self.properties().body_format()
    }

    /// URI template match results attached by the host
    fn uri_match(&self) -> Option<&UriTemplateMatch> {
        self.properties().uri_match()
    }
}

/// Envelope version token, opaque to the formatter and copied onto replies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MessageVersion {
    /// Plain HTTP, no SOAP envelope
    #[default]
    None,
    Soap11,
    Soap12,
}

/// A buffered transport message
#[derive(Debug, Clone)]
pub struct Message {
    id: Uuid,
    version: MessageVersion,
    action: Option<String>,
    body: MessageBody,
    properties: MessageProperties,
}

impl Message {
    /// Create an empty message
    pub fn new(version: MessageVersion) -> Self {
        Self {
            id: Uuid::now_v7(),
            version,
            action: None,
            body: MessageBody::Empty,
            properties: MessageProperties::new(),
        }
    }

    /// Create an outgoing message whose body is produced by `writer`
    pub fn create(
        version: MessageVersion,
        action: Option<String>,
        writer: &dyn BodyWriter,
    ) -> DispatchResult<Self> {
        let mut element = String::new();
        writer.write_body(&mut element)?;

        let mut message = Self::new(version);
        message.action = action;
        message.body = MessageBody::Element(element);
        Ok(message)
    }

    /// Create a raw-format request carrying URI match results, as a host would
    pub fn request(uri_match: UriTemplateMatch) -> Self {
        Self::new(MessageVersion::None)
            .with_content_format(WebContentFormat::Raw)
            .with_uri_match(uri_match)
    }

    /// Set the body
    pub fn with_body(mut self, body: MessageBody) -> Self {
        self.body = body;
        self
    }

    /// Set a buffered body
    pub fn with_buffered_body(self, body: impl Into<Bytes>) -> Self {
        self.with_body(MessageBody::Buffered(body.into()))
    }

    /// Set the body to `bytes` wrapped in a `<Binary>` element
    pub fn with_binary_body(self, bytes: impl Into<Bytes>) -> DispatchResult<Self> {
        let mut element = String::new();
        BinaryBodyWriter::new(bytes.into()).write_body(&mut element)?;
        Ok(self.with_body(MessageBody::Element(element)))
    }

    /// Set the body format property
    pub fn with_content_format(self, format: WebContentFormat) -> Self {
        self.with_property(WEB_BODY_FORMAT, PropertyValue::BodyFormat(format))
    }

    /// Attach URI match results under the primary key
    pub fn with_uri_match(self, uri_match: UriTemplateMatch) -> Self {
        self.with_property(URI_TEMPLATE_MATCH_RESULTS, PropertyValue::UriMatch(uri_match))
    }

    /// Add a property
    pub fn with_property(mut self, key: impl Into<String>, value: PropertyValue) -> Self {
        self.properties.insert(key, value);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn version(&self) -> MessageVersion {
        self.version
    }

    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    pub fn body(&self) -> &MessageBody {
        &self.body
    }

    pub fn properties_mut(&mut self) -> &mut MessageProperties {
        &mut self.properties
    }

    /// The HTTP response property of a reply
    pub fn http_response(&self) -> Option<&HttpResponseProperty> {
        self.properties.http_response()
    }
}

impl TransportMessage for Message {
    fn properties(&self) -> &MessageProperties {
        &self.properties
    }

    fn buffered_body(&self) -> Option<&[u8]> {
        match &self.body {
            MessageBody::Buffered(bytes) => Some(bytes.as_ref()),
            _ => None,
        }
    }

    fn body_element(&self) -> Option<&str> {
        match &self.body {
            MessageBody::Element(xml) => Some(xml.as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_message() {
        let uri_match = UriTemplateMatch::new(BoundVariables::new().with("id", "7"));
        let message = Message::request(uri_match.clone()).with_buffered_body("{}");

        assert_eq!(message.content_format(), Some(WebContentFormat::Raw));
        assert_eq!(message.uri_match(), Some(&uri_match));
        assert_eq!(message.buffered_body(), Some(&b"{}"[..]));
        assert_eq!(message.body_element(), None);
    }

    #[test]
    fn test_create_from_writer() {
        let writer = BinaryBodyWriter::new(Bytes::from_static(b"null"));
        let message =
            Message::create(MessageVersion::Soap12, Some("reply".into()), &writer).unwrap();

        assert_eq!(message.version(), MessageVersion::Soap12);
        assert_eq!(message.action(), Some("reply"));
        assert_eq!(message.body_element(), Some("<Binary>bnVsbA==</Binary>"));
        assert_eq!(&read_raw_body(&message, BINARY_ELEMENT).unwrap()[..], b"null");
    }

    #[test]
    fn test_messages_get_distinct_ids() {
        let a = Message::new(MessageVersion::None);
        let b = Message::new(MessageVersion::None);
        assert_ne!(a.id(), b.id());
    }
}
