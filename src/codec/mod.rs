//! Serialization codecs for request bodies and replies

pub mod datetime;
pub mod json;
pub mod naming;
pub mod wire;

pub use datetime::WireDateTime;
pub use json::JsonCodec;
