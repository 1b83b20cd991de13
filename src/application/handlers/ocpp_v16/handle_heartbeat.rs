//! Heartbeat handler

use std::sync::Arc;

use chrono::Utc;
use rust_ocpp::v1_6::messages::heart_beat::HeartbeatResponse;
use serde_json::Value;
use tracing::debug;

use super::CallOutcome;
use crate::application::session::Device;
use crate::application::OcppHandlerV16;

pub async fn handle_heartbeat(
    _handler: &OcppHandlerV16,
    device: &Arc<Device>,
    _payload: &Value,
) -> CallOutcome {
    debug!(device_id = device.device_id.as_str(), "Heartbeat from central system");

    let response = HeartbeatResponse {
        current_time: Utc::now(),
    };

    CallOutcome::result(serde_json::to_value(&response).unwrap_or_default())
}
