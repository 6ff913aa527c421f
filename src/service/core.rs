//! Core dispatch service implementation

use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use tower_service::Service;
use tracing::{debug, warn};

use crate::{
    formatter::{RequestPhase, RequestState},
    protocol::{
        error::{DispatchError, DispatchResult},
        types::ParameterSlots,
    },
    service::{operation::OperationEntry, DispatchRequest, OperationTable},
    transport::Message,
};

/// Dispatch service over an operation table
///
/// This service implements the Tower `Service` trait. Each call binds the
/// message into parameters, invokes the operation and serializes its result
/// into a reply. Clones share the table.
#[derive(Debug, Clone)]
pub struct DispatchService {
    table: Arc<OperationTable>,
}

impl DispatchService {
    /// Create a new dispatch service
    pub fn new(table: OperationTable) -> Self {
        Self {
            table: Arc::new(table),
        }
    }

    /// The operation table
    pub fn table(&self) -> &OperationTable {
        &self.table
    }

    /// Dispatch `request`, turning failures of a known operation into fault replies
    ///
    /// Requests for unknown operations still fail with
    /// [`DispatchError::UnknownOperation`].
    pub async fn dispatch_or_fault(&self, request: DispatchRequest) -> DispatchResult<Message> {
        let entry = self.entry(&request.operation)?;
        let version = request.version;

        match Self::dispatch(entry.clone(), request).await {
            Ok(reply) => Ok(reply),
            Err(err) => {
                warn!(
                    operation = entry.formatter.descriptor().name(),
                    code = err.code(),
                    error = %err,
                    "dispatch failed"
                );
                entry.formatter.serialize_fault(version, &err)
            }
        }
    }

    fn entry(&self, operation: &str) -> DispatchResult<Arc<OperationEntry>> {
        self.table
            .get(operation)
            .ok_or_else(|| DispatchError::UnknownOperation(operation.to_string()))
    }

    async fn dispatch(entry: Arc<OperationEntry>, request: DispatchRequest) -> DispatchResult<Message> {
        let descriptor = entry.formatter.descriptor();
        let mut state = RequestState::new();
        state.advance(RequestPhase::RequestReceived)?;
        debug!(
            operation = descriptor.name(),
            message_id = %request.message.id(),
            "dispatching"
        );

        let mut parameters = ParameterSlots::with_len(descriptor.parameter_count());
        entry
            .formatter
            .deserialize_request(&request.message, &mut parameters)?;
        state.advance(RequestPhase::ParametersBound)?;

        let result = entry
            .operation
            .invoke(&parameters)
            .await
            .map_err(|err| match err {
                // client errors keep their status
                err @ DispatchError::Operation(_) => err,
                err if err.is_client_error() => err,
                other => DispatchError::Operation(other.to_string()),
            })?;
        state.advance(RequestPhase::ResultReceived)?;

        let reply = entry
            .formatter
            .serialize_reply(request.version, &parameters, &*result)?;
        state.advance(RequestPhase::ReplySerialized)?;

        Ok(reply)
    }
}

impl Service<DispatchRequest> for DispatchService {
    type Response = Message;
    type Error = DispatchError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: DispatchRequest) -> Self::Future {
        let entry = match self.entry(&req.operation) {
            Ok(entry) => entry,
            Err(err) => return Box::pin(async move { Err(err) }),
        };

        Box::pin(Self::dispatch(entry, req))
    }
}
