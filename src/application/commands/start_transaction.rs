//! StartTransaction call

use tracing::info;

use crate::application::commands::CommandSender;
use crate::application::session::Connection;
use crate::domain::ocpp::messages::StartTransactionRequest;
use crate::domain::{Action, Transaction};
use crate::support::errors::SimResult;
use crate::support::time;

/// Announce `transaction` on `connector_id`. The call becomes the
/// connection's pending correlation.
pub fn start_transaction(
    command_sender: &CommandSender,
    connection: &mut Connection,
    connector_id: u32,
    transaction: &Transaction,
) -> SimResult<String> {
    info!(
        device_id = connection.device_id.as_str(),
        connector_id,
        id_tag = transaction.id_tag.as_str(),
        meter_start = transaction.meter_start,
        "StartTransaction"
    );

    let request = StartTransactionRequest {
        connector_id,
        id_tag: transaction.id_tag.clone(),
        timestamp: time::format_timestamp(transaction.start_timestamp),
        meter_start: transaction.meter_start,
    };

    command_sender.send_call(
        connection,
        Action::StartTransaction,
        serde_json::to_value(&request)?,
    )
}
