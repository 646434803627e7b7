use crate::{Error, Result};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPhase {
    Received,
    Validated,
    Dispatched,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestEvent {
    Admitted,
    Rejected,
    Dispatched,
    Answered,
    /// Start/chunk/complete could not be delivered.
    DeliveryFailed,
    /// The provider raised; only the image path treats this as failure.
    InferenceFailed,
}

/// Lifecycle of one request id. Each id passes through the table once.
#[derive(Debug, Clone)]
pub struct RequestLifecycle {
    request_id: String,
    phase: RequestPhase,
}

impl RequestLifecycle {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            phase: RequestPhase::Received,
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn phase(&self) -> RequestPhase {
        self.phase
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.phase, RequestPhase::Completed | RequestPhase::Failed)
    }

    pub fn transition(&mut self, event: RequestEvent) -> Result<()> {
        let next = match (self.phase, event) {
            (RequestPhase::Received, RequestEvent::Admitted) => RequestPhase::Validated,
            (RequestPhase::Received, RequestEvent::Rejected) => RequestPhase::Failed,
            (RequestPhase::Validated, RequestEvent::Dispatched) => RequestPhase::Dispatched,
            (RequestPhase::Validated, RequestEvent::DeliveryFailed) => RequestPhase::Failed,
            (RequestPhase::Validated, RequestEvent::Rejected) => RequestPhase::Failed,
            (RequestPhase::Dispatched, RequestEvent::Answered) => RequestPhase::Completed,
            (RequestPhase::Dispatched, RequestEvent::InferenceFailed) => RequestPhase::Failed,
            (RequestPhase::Dispatched, RequestEvent::DeliveryFailed) => RequestPhase::Failed,
            _ => {
                warn!(
                    "Invalid transition for request {} from {:?} with {:?}",
                    self.request_id, self.phase, event
                );
                return Err(Error::InvalidTransition {
                    current: format!("{:?}", self.phase),
                    requested: format!("{:?}", event),
                });
            }
        };

        debug!(
            "Request {}: {:?} -> {:?} ({:?})",
            self.request_id, self.phase, next, event
        );
        self.phase = next;
        Ok(())
    }
}
