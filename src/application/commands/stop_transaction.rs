//! StopTransaction call

use tracing::info;

use crate::application::commands::CommandSender;
use crate::application::session::Connection;
use crate::domain::ocpp::messages::{StopTransactionRequest, STOP_REASON_POWER_LOSS};
use crate::domain::Action;
use crate::support::errors::SimResult;
use crate::support::time;

pub fn stop_transaction(
    command_sender: &CommandSender,
    connection: &mut Connection,
    transaction_id: i32,
    meter_stop: i32,
    id_tag: &str,
) -> SimResult<String> {
    info!(
        device_id = connection.device_id.as_str(),
        transaction_id,
        meter_stop,
        "StopTransaction"
    );

    let request = StopTransactionRequest {
        transaction_id,
        meter_stop,
        timestamp: time::timestamp(),
        id_tag: id_tag.to_string(),
        stop_reason: STOP_REASON_POWER_LOSS.to_string(),
    };

    command_sender.send_call(
        connection,
        Action::StopTransaction,
        serde_json::to_value(&request)?,
    )
}
