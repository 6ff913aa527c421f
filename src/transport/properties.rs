//! Message property bag and the well-known properties the formatter reads and writes

use std::collections::HashMap;

/// Key of the body format property
pub const WEB_BODY_FORMAT: &str = "WebBodyFormat";

/// Key under which hosts attach URI template match results
pub const URI_TEMPLATE_MATCH_RESULTS: &str = "UriTemplateMatchResults";

/// Alternate key for URI template match results, accepted on read
pub const URI_MATCH: &str = "UriMatch";

/// Key of the HTTP response property on replies
pub const HTTP_RESPONSE: &str = "HttpResponse";

/// Physical format of a message body as seen by the host binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebContentFormat {
    /// Opaque bytes, the only format the formatter accepts
    Raw,
    Json,
    Xml,
    Default,
}

/// Variables bound by the host's URI template matcher
///
/// Values are already URL-decoded. Names are looked up ignoring ASCII case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundVariables(HashMap<String, String>);

impl BoundVariables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `value`, replacing any previous binding
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.0
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    /// Add a binding, builder style
    pub fn with(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(&name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(lowercase name, value)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for BoundVariables {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut vars = Self::new();
        for (name, value) in iter {
            vars.insert(name, value);
        }
        vars
    }
}

/// Result of matching the request URI against the operation's template
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UriTemplateMatch {
    /// The template that matched, when the host reports it
    pub template: Option<String>,

    /// Variables bound by the match
    pub bound_variables: BoundVariables,
}

impl UriTemplateMatch {
    pub fn new(bound_variables: BoundVariables) -> Self {
        Self {
            template: None,
            bound_variables,
        }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }
}

/// HTTP response metadata attached to replies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponseProperty {
    /// Status code (e.g., 200)
    pub status: u16,

    /// Response headers
    pub headers: HashMap<String, String>,
}

impl HttpResponseProperty {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
        }
    }

    /// Add a header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Get a header, ignoring ASCII case of the name
    pub fn header_value(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Check if the status is 2xx
    pub fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// A value in the message property bag
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    BodyFormat(WebContentFormat),
    UriMatch(UriTemplateMatch),
    HttpResponse(HttpResponseProperty),

    /// Anything else the host wants to carry along
    Other(serde_json::Value),
}

/// String-keyed property bag of a message
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageProperties(HashMap<String, PropertyValue>);

impl MessageProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: PropertyValue) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The body format, if the host set one
    pub fn body_format(&self) -> Option<WebContentFormat> {
        match self.get(WEB_BODY_FORMAT)? {
            PropertyValue::BodyFormat(format) => Some(*format),
            _ => None,
        }
    }

    /// URI match results under either accepted key
    pub fn uri_match(&self) -> Option<&UriTemplateMatch> {
        [URI_TEMPLATE_MATCH_RESULTS, URI_MATCH]
            .into_iter()
            .find_map(|key| match self.get(key)? {
                PropertyValue::UriMatch(uri_match) => Some(uri_match),
                _ => None,
            })
    }

    /// The HTTP response property, if present
    pub fn http_response(&self) -> Option<&HttpResponseProperty> {
        match self.get(HTTP_RESPONSE)? {
            PropertyValue::HttpResponse(response) => Some(response),
            _ => None,
        }
    }
}
