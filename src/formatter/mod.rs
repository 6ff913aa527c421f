//! Dispatch formatter
//!
//! Turns an incoming transport message into the parameter array of an
//! operation, and the operation's result into a reply message.

pub mod config;
pub mod state;

use std::{any::Any, sync::Arc};

use bytes::Bytes;
use serde_json::json;
use tracing::{debug, trace};

pub use config::FormatterConfig;
pub use state::{RequestPhase, RequestState};

use crate::{
    binding::ParameterBinder,
    codec::JsonCodec,
    protocol::{
        descriptor::OperationDescriptor,
        error::{DispatchError, DispatchResult},
        types::{ParameterSlots, TypeKind},
    },
    transport::{
        read_raw_body, BinaryBodyWriter, HttpResponseProperty, Message, MessageVersion,
        PropertyValue, TransportMessage, WebContentFormat, HTTP_RESPONSE, WEB_BODY_FORMAT,
    },
};

/// Request/reply formatter for one operation
///
/// Holds only read-only state, so a single instance serves any number of
/// concurrent requests.
#[derive(Debug, Clone)]
pub struct DispatchFormatter {
    descriptor: Arc<OperationDescriptor>,
    binder: ParameterBinder,
    codec: JsonCodec,
    config: FormatterConfig,
}

impl DispatchFormatter {
    /// Create a formatter with the default configuration
    pub fn new(descriptor: Arc<OperationDescriptor>) -> Self {
        Self::with_config(descriptor, FormatterConfig::default())
    }

    /// Create a formatter with a custom configuration
    pub fn with_config(descriptor: Arc<OperationDescriptor>, config: FormatterConfig) -> Self {
        Self {
            descriptor,
            binder: ParameterBinder::new(config.coercion_policy),
            codec: JsonCodec::new(),
            config,
        }
    }

    pub fn descriptor(&self) -> &OperationDescriptor {
        &self.descriptor
    }

    pub fn config(&self) -> &FormatterConfig {
        &self.config
    }

    /// Fill `slots` with the operation parameters carried by `message`
    ///
    /// Operations without parameters return immediately without looking at
    /// the message. On error the slots are left untouched.
    pub fn deserialize_request<M>(&self, message: &M, slots: &mut ParameterSlots) -> DispatchResult<()>
    where
        M: TransportMessage + ?Sized,
    {
        let descriptor = self.descriptor.as_ref();
        if descriptor.parameter_count() == 0 {
            return Ok(());
        }

        if slots.len() != descriptor.parameter_count() {
            return Err(DispatchError::BindingConfiguration(format!(
                "Operation '{}' takes {} parameters but {} slots were supplied",
                descriptor.name(),
                descriptor.parameter_count(),
                slots.len()
            )));
        }

        match message.content_format() {
            Some(WebContentFormat::Raw) => {}
            other => {
                return Err(DispatchError::UnsupportedContentFormat(format!(
                    "Incoming messages must have a body format of Raw, found {:?}; is the host binding mapping every content type to Raw?",
                    other
                )))
            }
        }

        let uri_match = message.uri_match().ok_or(DispatchError::MissingUriMatch)?;
        let bound_variables = &uri_match.bound_variables;
        debug!(
            operation = descriptor.name(),
            bound = bound_variables.len(),
            "request received"
        );

        let plan = self.binder.plan(descriptor, bound_variables)?;
        let body = if plan.needs_body() {
            read_raw_body(message, &self.config.body_element)?
        } else {
            Bytes::new()
        };
        trace!(operation = descriptor.name(), body_len = body.len(), "request body read");

        let values = self
            .binder
            .bind_planned(descriptor, &plan, bound_variables, &body)?;
        slots.fill(values);

        debug!(operation = descriptor.name(), "parameters bound");
        Ok(())
    }

    /// Build the reply message for `result`
    ///
    /// `result` must be a value of the descriptor's return type (pass the
    /// value itself, not a `Box` holding it). Unit results produce an empty body.
    pub fn serialize_reply(
        &self,
        version: MessageVersion,
        parameters: &ParameterSlots,
        result: &(dyn Any + Send + Sync),
    ) -> DispatchResult<Message> {
        let return_type = self.descriptor.return_type();
        let body = if return_type.kind() == TypeKind::Unit {
            Bytes::new()
        } else {
            self.codec.encode(result, return_type)?
        };

        trace!(
            operation = self.descriptor.name(),
            parameters = parameters.len(),
            body_len = body.len(),
            "result encoded"
        );

        let reply = self.reply(version, 200, body)?;
        debug!(operation = self.descriptor.name(), "reply serialized");
        Ok(reply)
    }

    /// Build an error reply for `error`
    ///
    /// The body is `{"code": ..., "message": ...}` and the status comes from
    /// [`DispatchError::status_code`].
    pub fn serialize_fault(
        &self,
        version: MessageVersion,
        error: &DispatchError,
    ) -> DispatchResult<Message> {
        let body = self.codec.encode_value(&json!({
            "code": error.code(),
            "message": error.to_string(),
        }))?;
        self.reply(version, error.status_code(), body)
    }

    fn reply(&self, version: MessageVersion, status: u16, body: Bytes) -> DispatchResult<Message> {
        let writer = BinaryBodyWriter::with_element(self.config.body_element.clone(), body);
        let action = Some(format!("{}Response", self.descriptor.name()));

        let http_response =
            HttpResponseProperty::new(status).header("Content-Type", self.codec.content_type());

        Ok(Message::create(version, action, &writer)?
            .with_property(WEB_BODY_FORMAT, PropertyValue::BodyFormat(WebContentFormat::Raw))
            .with_property(HTTP_RESPONSE, PropertyValue::HttpResponse(http_response)))
    }
}
