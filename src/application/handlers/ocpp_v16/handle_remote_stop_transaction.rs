//! RemoteStopTransaction handler
//!
//! Always accepted; an unknown or missing `transactionId` is logged by the
//! follow-up and changes nothing.

use std::sync::Arc;

use rust_ocpp::v1_6::messages::remote_stop_transaction::RemoteStopTransactionResponse;
use rust_ocpp::v1_6::types::RemoteStartStopStatus;
use serde_json::Value;
use tracing::info;

use super::{CallOutcome, FollowUp};
use crate::application::session::Device;
use crate::application::OcppHandlerV16;

pub async fn handle_remote_stop_transaction(
    _handler: &OcppHandlerV16,
    device: &Arc<Device>,
    payload: &Value,
) -> CallOutcome {
    let transaction_id = payload
        .get("transactionId")
        .and_then(Value::as_i64)
        .and_then(|id| i32::try_from(id).ok());

    info!(
        device_id = device.device_id.as_str(),
        ?transaction_id,
        "RemoteStopTransaction"
    );

    let response = RemoteStopTransactionResponse {
        status: RemoteStartStopStatus::Accepted,
    };

    CallOutcome::result(serde_json::to_value(&response).unwrap_or_default())
        .then(FollowUp::StopTransaction { transaction_id })
}
