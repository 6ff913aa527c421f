//! Tower Service implementations

pub mod core;
pub mod operation;
pub mod request;

pub use core::DispatchService;
pub use operation::{operation_fn, Operation, OperationEntry, OperationTable};
pub use request::DispatchRequest;
