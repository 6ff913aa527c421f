//! Per-request dispatch phases
//!
//! The formatter itself is stateless. Whoever drives a request through it
//! (see [`DispatchService`](crate::service::DispatchService)) tracks the phase
//! with a [`RequestState`] owned by that request.

use std::fmt;

use crate::protocol::error::{DispatchError, DispatchResult};

/// Phase of one request
///
/// Lifecycle: idle → request-received → parameters-bound → (operation runs) →
/// result-received → reply-serialized
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RequestPhase {
    #[default]
    Idle,
    RequestReceived,
    ParametersBound,
    ResultReceived,
    ReplySerialized,
}

impl RequestPhase {
    /// The phase that legally follows this one
    pub fn next(self) -> Option<RequestPhase> {
        match self {
            RequestPhase::Idle => Some(RequestPhase::RequestReceived),
            RequestPhase::RequestReceived => Some(RequestPhase::ParametersBound),
            RequestPhase::ParametersBound => Some(RequestPhase::ResultReceived),
            RequestPhase::ResultReceived => Some(RequestPhase::ReplySerialized),
            RequestPhase::ReplySerialized => None,
        }
    }

    /// Check if the request is finished
    pub fn is_terminal(self) -> bool {
        self == RequestPhase::ReplySerialized
    }
}

impl fmt::Display for RequestPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestPhase::Idle => "idle",
            RequestPhase::RequestReceived => "request-received",
            RequestPhase::ParametersBound => "parameters-bound",
            RequestPhase::ResultReceived => "result-received",
            RequestPhase::ReplySerialized => "reply-serialized",
        };
        f.write_str(name)
    }
}

/// Phase tracker for one request
#[derive(Debug, Clone, Default)]
pub struct RequestState {
    phase: RequestPhase,
}

impl RequestState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> RequestPhase {
        self.phase
    }

    /// Move to `to`, which must be the phase right after the current one
    pub fn advance(&mut self, to: RequestPhase) -> DispatchResult<()> {
        if self.phase.next() != Some(to) {
            return Err(DispatchError::Other(format!(
                "Illegal request phase transition: {} -> {}",
                self.phase, to
            )));
        }
        tracing::trace!(from = %self.phase, to = %to, "request phase");
        self.phase = to;
        Ok(())
    }
}
