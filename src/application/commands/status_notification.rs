//! StatusNotification call

use tracing::info;

use crate::application::commands::CommandSender;
use crate::application::session::Connection;
use crate::domain::ocpp::messages::{StatusNotificationRequest, ERROR_CODE_NO_ERROR};
use crate::domain::{Action, ConnectorStatus};
use crate::support::errors::SimResult;
use crate::support::time;

pub fn status_notification(
    command_sender: &CommandSender,
    connection: &mut Connection,
    connector_id: u32,
    status: ConnectorStatus,
) -> SimResult<String> {
    info!(
        device_id = connection.device_id.as_str(),
        connector_id,
        %status,
        "StatusNotification"
    );

    let request = StatusNotificationRequest {
        connector_id,
        error_code: ERROR_CODE_NO_ERROR.to_string(),
        status,
        timestamp: time::timestamp(),
        info: String::new(),
    };

    command_sender.send_call(
        connection,
        Action::StatusNotification,
        serde_json::to_value(&request)?,
    )
}
