//! Message body representations and body writers

use base64::{engine::general_purpose, Engine as _};
use bytes::Bytes;

use crate::{
    protocol::error::{DispatchError, DispatchResult},
    transport::TransportMessage,
};

/// Default name of the element wrapping base64 bodies
pub const BINARY_ELEMENT: &str = "Binary";

/// Physical body of a [`Message`](super::Message)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MessageBody {
    /// No body
    #[default]
    Empty,

    /// Body as a single XML-style element holding base64 content
    Element(String),

    /// Body already buffered as raw bytes
    Buffered(Bytes),
}

/// Writes the body of an outgoing message
pub trait BodyWriter {
    /// Append the body contents to `out`
    fn write_body(&self, out: &mut String) -> DispatchResult<()>;
}

/// Body writer wrapping raw bytes as `<Binary>base64</Binary>`
#[derive(Debug, Clone)]
pub struct BinaryBodyWriter {
    element: String,
    content: Bytes,
}

impl BinaryBodyWriter {
    /// Wrap `content` in the default `Binary` element
    pub fn new(content: Bytes) -> Self {
        Self::with_element(BINARY_ELEMENT, content)
    }

    /// Wrap `content` in an element named `element`
    pub fn with_element(element: impl Into<String>, content: Bytes) -> Self {
        Self {
            element: element.into(),
            content,
        }
    }
}

impl BodyWriter for BinaryBodyWriter {
    fn write_body(&self, out: &mut String) -> DispatchResult<()> {
        out.push('<');
        out.push_str(&self.element);
        out.push('>');
        general_purpose::STANDARD.encode_string(&self.content, out);
        out.push_str("</");
        out.push_str(&self.element);
        out.push('>');
        Ok(())
    }
}

/// Extract the raw body bytes from whichever representation `message` exposes
///
/// A buffered blob wins over a wrapper element; a message exposing neither has
/// an empty body.
pub fn read_raw_body<M>(message: &M, element: &str) -> DispatchResult<Bytes>
where
    M: TransportMessage + ?Sized,
{
    if let Some(buffered) = message.buffered_body() {
        return Ok(Bytes::copy_from_slice(buffered));
    }

    match message.body_element() {
        Some(xml) => decode_element(xml, element),
        None => Ok(Bytes::new()),
    }
}

/// Decode `<element>base64</element>` (or an empty `<element/>`)
pub fn decode_element(xml: &str, element: &str) -> DispatchResult<Bytes> {
    let not_found = || {
        DispatchError::UnsupportedContentFormat(format!("Expected <{}> element not found", element))
    };

    let xml = xml.trim();
    let tag = xml
        .strip_prefix('<')
        .and_then(|s| s.strip_prefix(element))
        .ok_or_else(not_found)?;

    let open_end = tag.find('>').ok_or_else(not_found)?;
    let attributes = &tag[..open_end];
    if !attributes.is_empty() && !attributes.starts_with(char::is_whitespace) && attributes != "/" {
        // A longer name sharing the prefix, e.g. <BinaryData>
        return Err(not_found());
    }
    if attributes.trim_end().ends_with('/') {
        return if tag[open_end + 1..].trim().is_empty() {
            Ok(Bytes::new())
        } else {
            Err(not_found())
        };
    }

    let closing = format!("</{}>", element);
    let content = tag[open_end + 1..]
        .strip_suffix(closing.as_str())
        .ok_or_else(not_found)?;

    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    general_purpose::STANDARD
        .decode(compact)
        .map(Bytes::from)
        .map_err(|e| DispatchError::body(format!("Invalid base64 body content: {}", e)))
}
