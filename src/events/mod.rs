mod heartbeat;
mod types;

pub use heartbeat::{HeartbeatSchedule, spawn_heartbeat};
pub use types::*;

use crate::{Error, Result, session::SessionRegistry};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Pushes events to registered sessions. Delivery failures are logged and
/// never propagated to the broadcaster's caller.
#[derive(Clone)]
pub struct EventBroadcaster {
    registry: Arc<SessionRegistry>,
}

impl EventBroadcaster {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Sends `event` to every session and returns how many accepted it.
    pub fn notify_all(&self, event: ServerEvent) -> usize {
        let targets = self.registry.broadcast_targets();
        if targets.is_empty() {
            debug!("No clients connected, dropping {} event", event.name());
            return 0;
        }

        let mut delivered = 0;
        for (session_id, sender) in &targets {
            if sender.send(event.clone()).is_ok() {
                delivered += 1;
            } else {
                warn!(
                    "Failed to deliver {} to session {}",
                    event.name(),
                    session_id
                );
            }
        }

        debug!(
            "Broadcast {} to {}/{} clients",
            event.name(),
            delivered,
            targets.len()
        );
        delivered
    }

    /// Sends `event` to one session.
    pub fn send_to(&self, session_id: &str, event: ServerEvent) -> Result<()> {
        let sender = self.registry.sender(session_id).ok_or_else(|| Error::Delivery {
            session_id: session_id.to_string(),
        })?;

        let name = event.name();
        sender.send(event).map_err(|_| Error::Delivery {
            session_id: session_id.to_string(),
        })?;
        debug!("Sent {} to session {}", name, session_id);
        Ok(())
    }

    pub fn loading_status(&self, message: impl Into<String>) -> usize {
        let message = message.into();
        info!("Loading status: {}", message);
        self.notify_all(ServerEvent::loading_status(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc;

    fn broadcaster() -> EventBroadcaster {
        EventBroadcaster::new(Arc::new(SessionRegistry::new()))
    }

    #[test]
    fn test_notify_all_with_no_sessions_is_noop() {
        assert_eq!(broadcaster().loading_status("hello"), 0);
    }

    #[test]
    fn test_notify_all_reaches_every_session() {
        let broadcaster = broadcaster();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        broadcaster.registry().register("a", tx1);
        broadcaster.registry().register("b", tx2);

        assert_eq!(broadcaster.loading_status("Loading..."), 2);

        for rx in [&mut rx1, &mut rx2] {
            match rx.try_recv().unwrap() {
                ServerEvent::ModelLoadingStatus { message, .. } => {
                    assert_eq!(message, "Loading...")
                }
                other => panic!("unexpected event {:?}", other),
            }
        }
    }

    #[test]
    fn test_closed_session_does_not_stop_broadcast() {
        let broadcaster = broadcaster();
        let (dead_tx, dead_rx) = mpsc::unbounded_channel();
        let (live_tx, mut live_rx) = mpsc::unbounded_channel();
        broadcaster.registry().register("dead", dead_tx);
        broadcaster.registry().register("live", live_tx);
        drop(dead_rx);

        assert_eq!(broadcaster.notify_all(ServerEvent::pong("x")), 1);
        assert!(live_rx.try_recv().is_ok());
    }

    #[test]
    fn test_send_to_unknown_session_is_delivery_error() {
        let err = broadcaster()
            .send_to("ghost", ServerEvent::pong("ghost"))
            .unwrap_err();
        assert!(matches!(err, Error::Delivery { .. }));
    }

    #[test]
    fn test_send_to_targets_only_one_session() {
        let broadcaster = broadcaster();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        broadcaster.registry().register("a", tx1);
        broadcaster.registry().register("b", tx2);

        broadcaster.send_to("a", ServerEvent::pong("a")).unwrap();

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_err());
    }
}
