//! Process-wide readiness of the Inference Provider.
//!
//! The phase only moves forward: `Unloaded -> Loading -> Ready | Failed`.
//! Leaving `Ready` or `Failed` takes a process restart.

use crate::{Error, Result};
use serde::Serialize;
use std::sync::{PoisonError, RwLock};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadPhase {
    Unloaded,
    Loading,
    Ready,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelStatus {
    pub phase: LoadPhase,
    pub model_id: Option<String>,
    pub last_error: Option<String>,
}

#[derive(Debug)]
pub struct ModelState {
    inner: RwLock<ModelStatus>,
}

impl ModelState {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(ModelStatus {
                phase: LoadPhase::Unloaded,
                model_id: None,
                last_error: None,
            }),
        }
    }

    pub fn snapshot(&self) -> ModelStatus {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn phase(&self) -> LoadPhase {
        self.snapshot().phase
    }

    pub fn is_ready(&self) -> bool {
        self.phase() == LoadPhase::Ready
    }

    pub fn is_loading(&self) -> bool {
        self.phase() == LoadPhase::Loading
    }

    pub fn model_id(&self) -> Option<String> {
        self.snapshot().model_id
    }

    /// Claims the single load attempt. Fails if loading already started.
    pub fn begin_loading(&self) -> Result<()> {
        self.advance(LoadPhase::Loading, |_| {})
    }

    /// Records the id being loaded without changing phase.
    pub fn set_model_id(&self, model_id: impl Into<String>) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.model_id = Some(model_id.into());
    }

    pub fn mark_ready(&self, model_id: impl Into<String>) -> Result<()> {
        let model_id = model_id.into();
        self.advance(LoadPhase::Ready, |status| {
            status.model_id = Some(model_id);
            status.last_error = None;
        })
    }

    pub fn mark_failed(&self, reason: impl Into<String>) -> Result<()> {
        let reason = reason.into();
        self.advance(LoadPhase::Failed, |status| {
            status.last_error = Some(reason);
        })
    }

    fn advance<F>(&self, next: LoadPhase, update: F) -> Result<()>
    where
        F: FnOnce(&mut ModelStatus),
    {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let allowed = matches!(
            (inner.phase, next),
            (LoadPhase::Unloaded, LoadPhase::Loading)
                | (LoadPhase::Loading, LoadPhase::Ready)
                | (LoadPhase::Loading, LoadPhase::Failed)
        );

        if !allowed {
            warn!(
                "Rejected model state transition {:?} -> {:?}",
                inner.phase, next
            );
            return Err(Error::InvalidTransition {
                current: format!("{:?}", inner.phase),
                requested: format!("{:?}", next),
            });
        }

        info!("Model state: {:?} -> {:?}", inner.phase, next);
        inner.phase = next;
        update(&mut inner);
        Ok(())
    }
}

impl Default for ModelState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_starts_unloaded() {
        let state = ModelState::new();
        assert_eq!(state.phase(), LoadPhase::Unloaded);
        assert!(!state.is_ready());
        assert_eq!(state.model_id(), None);
    }

    #[test]
    fn test_load_to_ready() {
        let state = ModelState::new();
        state.begin_loading().unwrap();
        assert!(state.is_loading());

        state.mark_ready("org/model").unwrap();
        assert!(state.is_ready());
        assert_eq!(state.model_id().as_deref(), Some("org/model"));
    }

    #[test]
    fn test_load_to_failed_records_reason() {
        let state = ModelState::new();
        state.begin_loading().unwrap();
        state.mark_failed("out of memory").unwrap();

        let status = state.snapshot();
        assert_eq!(status.phase, LoadPhase::Failed);
        assert_eq!(status.last_error.as_deref(), Some("out of memory"));
    }

    #[test]
    fn test_second_load_attempt_is_rejected() {
        let state = ModelState::new();
        state.begin_loading().unwrap();
        let err = state.begin_loading().unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));
    }

    #[test]
    fn test_terminal_phases_never_move() {
        let state = ModelState::new();
        state.begin_loading().unwrap();
        state.mark_ready("m").unwrap();

        assert!(state.begin_loading().is_err());
        assert!(state.mark_failed("late").is_err());
        assert!(state.is_ready());

        let failed = ModelState::new();
        failed.begin_loading().unwrap();
        failed.mark_failed("boom").unwrap();
        assert!(failed.begin_loading().is_err());
        assert!(failed.mark_ready("m").is_err());
        assert_eq!(failed.phase(), LoadPhase::Failed);
    }

    #[test]
    fn test_ready_requires_loading_first() {
        let state = ModelState::new();
        assert!(state.mark_ready("m").is_err());
        assert_eq!(state.phase(), LoadPhase::Unloaded);
    }
}
