//! RemoteStartTransaction handler
//!
//! Always accepted; the StartTransaction handshake runs after the reply.
//! A missing `idTag` falls back to the configured default tag.

use std::sync::Arc;

use rust_ocpp::v1_6::messages::remote_start_transaction::RemoteStartTransactionResponse;
use rust_ocpp::v1_6::types::RemoteStartStopStatus;
use serde_json::Value;
use tracing::info;

use super::{CallOutcome, FollowUp};
use crate::application::session::Device;
use crate::application::OcppHandlerV16;

pub async fn handle_remote_start_transaction(
    handler: &OcppHandlerV16,
    device: &Arc<Device>,
    payload: &Value,
) -> CallOutcome {
    let connector_id = payload
        .get("connectorId")
        .and_then(Value::as_u64)
        .and_then(|id| u32::try_from(id).ok());
    let id_tag = payload
        .get("idTag")
        .and_then(Value::as_str)
        .unwrap_or(&handler.ctx.config.default_id_tag)
        .to_string();

    info!(
        device_id = device.device_id.as_str(),
        ?connector_id,
        id_tag = id_tag.as_str(),
        "RemoteStartTransaction"
    );

    let response = RemoteStartTransactionResponse {
        status: RemoteStartStopStatus::Accepted,
    };

    CallOutcome::result(serde_json::to_value(&response).unwrap_or_default())
        .then(FollowUp::StartTransaction { connector_id, id_tag })
}
