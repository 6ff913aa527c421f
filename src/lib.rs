//! # Tower JSON Dispatch
//!
//! Request/reply formatting for operation-style JSON services, exposed as a
//! Tower service.
//!
//! An incoming message carries some operation parameters as URI template
//! variables and the rest in a JSON body. The [`formatter::DispatchFormatter`]
//! binds both into typed parameter slots, and turns the operation's result
//! back into a JSON reply message.
//!
//! ## Features
//!
//! - **Mixed binding**: URI-bound parameters are coerced from text, the body
//!   fills one parameter or a wrapped object of several
//! - **Lenient coercion**: case-insensitive enums and numbers, zero values on
//!   failure (or strict failures, if configured)
//! - **camelCase wire format** with ISO-8601 dates
//! - **Tower integration**: operations registered in an
//!   [`service::OperationTable`] are served by [`service::DispatchService`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use tower_json_dispatch::prelude::*;
//! use tower::ServiceExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let descriptor = OperationDescriptor::builder("Echo")
//!         .parameter("text", TypeRef::string())
//!         .returns(TypeRef::string())
//!         .uri_template("echo/{text}")
//!         .build()?;
//!
//!     let table = OperationTable::new().register(
//!         descriptor,
//!         operation_fn(|params: &ParameterSlots| {
//!             Ok(params.get::<String>(0).cloned().unwrap_or_default())
//!         }),
//!     )?;
//!
//!     let vars = BoundVariables::new().with("text", "hello");
//!     let request = DispatchRequest::new("Echo", Message::request(UriTemplateMatch::new(vars)));
//!
//!     let reply = DispatchService::new(table).oneshot(request).await?;
//!     println!("{:?}", reply.action());
//!
//!     Ok(())
//! }
//! ```

pub mod binding;
pub mod codec;
pub mod formatter;
pub mod protocol;
pub mod service;
pub mod transport;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        binding::CoercionPolicy,
        codec::{JsonCodec, WireDateTime},
        formatter::{DispatchFormatter, FormatterConfig},
        protocol::error::{DispatchError, DispatchResult},
        protocol::{OperationDescriptor, ParameterSlots, TypeRef},
        service::{operation_fn, DispatchRequest, DispatchService, Operation, OperationTable},
        transport::{BoundVariables, Message, MessageVersion, TransportMessage, UriTemplateMatch},
    };
}
