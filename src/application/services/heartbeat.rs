//! Heartbeat task
//!
//! Sends `Heartbeat {}` on a fixed period for one connection attempt and
//! stops as soon as that connection is gone or reports disconnected.

use std::sync::Weak;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::application::commands;
use crate::application::context::EngineContext;
use crate::application::session::Device;

pub fn spawn(ctx: EngineContext, device: Weak<Device>, connection_id: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = ctx.config.heartbeat_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let Some(device) = device.upgrade() else {
                break;
            };
            let mut state = device.lock().await;
            let Some(connection) = state
                .connection_for(connection_id)
                .filter(|c| c.is_connected)
            else {
                debug!(device_id = device.device_id.as_str(), connection_id, "Heartbeat stopped");
                break;
            };

            if let Err(e) = commands::heartbeat(&ctx.commands, connection) {
                warn!(device_id = device.device_id.as_str(), error = %e, "Heartbeat not sent");
                break;
            }
        }

        debug!(connection_id, "Heartbeat task finished");
    })
}
