use super::{EventBroadcaster, HeartbeatStatus, ServerEvent};
use crate::{config::HeartbeatConfig, model_state::ModelState};
use std::{sync::Arc, time::Duration};
use tokio::{
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatSchedule {
    pub initial_delay: Duration,
    pub interval: Duration,
}

impl From<&HeartbeatConfig> for HeartbeatSchedule {
    fn from(config: &HeartbeatConfig) -> Self {
        Self {
            initial_delay: Duration::from_secs(config.initial_delay_secs),
            interval: Duration::from_secs(config.interval_secs.max(1)),
        }
    }
}

/// Emits `keep_alive` on a fixed period until `cancel` fires. The task
/// resolves to the number of beats it produced.
pub fn spawn_heartbeat(
    broadcaster: EventBroadcaster,
    model_state: Arc<ModelState>,
    schedule: HeartbeatSchedule,
    cancel: CancellationToken,
) -> JoinHandle<u64> {
    tokio::spawn(async move {
        let mut ticker = time::interval_at(Instant::now() + schedule.initial_delay, schedule.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut beats = 0u64;

        info!(
            "Heartbeat started: first in {:?}, then every {:?}",
            schedule.initial_delay, schedule.interval
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    beats += 1;
                    let connections = broadcaster.registry().count();
                    let status = HeartbeatStatus::from(model_state.phase());
                    if connections == 0 {
                        debug!("Heartbeat {} skipped, no clients", beats);
                        continue;
                    }
                    broadcaster.notify_all(ServerEvent::keep_alive(status, connections));
                }
            }
        }

        info!("Heartbeat stopped after {} beats", beats);
        beats
    })
}
