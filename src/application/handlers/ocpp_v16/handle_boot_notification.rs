//! BootNotification handler

use std::sync::Arc;

use chrono::Utc;
use rust_ocpp::v1_6::messages::boot_notification::BootNotificationResponse;
use rust_ocpp::v1_6::types::RegistrationStatus;
use serde_json::Value;
use tracing::info;

use super::CallOutcome;
use crate::application::session::Device;
use crate::application::OcppHandlerV16;

pub async fn handle_boot_notification(
    handler: &OcppHandlerV16,
    device: &Arc<Device>,
    _payload: &Value,
) -> CallOutcome {
    info!(device_id = device.device_id.as_str(), "BootNotification from central system");

    let response = BootNotificationResponse {
        current_time: Utc::now(),
        interval: handler.ctx.config.boot_interval_secs.into(),
        status: RegistrationStatus::Accepted,
    };

    CallOutcome::result(serde_json::to_value(&response).unwrap_or_default())
}
