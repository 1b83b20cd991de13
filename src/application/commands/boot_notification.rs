//! BootNotification call

use rust_ocpp::v1_6::messages::boot_notification::BootNotificationRequest;
use tracing::info;

use crate::application::commands::CommandSender;
use crate::application::session::Connection;
use crate::config::BootInfo;
use crate::domain::Action;
use crate::support::errors::SimResult;

fn optional(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

pub fn boot_notification(
    command_sender: &CommandSender,
    connection: &mut Connection,
    boot: &BootInfo,
) -> SimResult<String> {
    info!(
        device_id = connection.device_id.as_str(),
        vendor = boot.charge_point_vendor.as_str(),
        model = boot.charge_point_model.as_str(),
        "BootNotification"
    );

    let request = BootNotificationRequest {
        charge_box_serial_number: optional(&boot.charge_box_serial_number),
        charge_point_model: boot.charge_point_model.clone(),
        charge_point_serial_number: optional(&boot.charge_point_serial_number),
        charge_point_vendor: boot.charge_point_vendor.clone(),
        firmware_version: optional(&boot.firmware_version),
        iccid: optional(&boot.iccid),
        imsi: optional(&boot.imsi),
        meter_serial_number: optional(&boot.meter_serial_number),
        meter_type: optional(&boot.meter_type),
    };

    command_sender.send_call(
        connection,
        Action::BootNotification,
        serde_json::to_value(&request)?,
    )
}
