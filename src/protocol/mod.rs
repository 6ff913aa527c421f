//! Core dispatch model: descriptors, type descriptors and errors

pub mod descriptor;
pub mod error;
pub mod template;
pub mod types;

pub use descriptor::{
    OperationDescriptor, OperationDescriptorBuilder, ParameterDescriptor, ParameterSource,
};
pub use error::{DispatchError, DispatchResult};
pub use template::UriTemplate;
pub use types::{BoxedValue, ParameterSlots, TypeKind, TypeRef, WireType};
