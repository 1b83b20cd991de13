//! OCPP 1.6 message handler
//!
//! Parses raw OCPP-J frames received by a simulated charge point, answers
//! inbound calls and correlates CallResults with the pending
//! StartTransaction.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::application::context::EngineContext;
use crate::application::handlers::ocpp_v16::{v16_action_matcher, FollowUp};
use crate::application::services::transactions;
use crate::application::session::Device;
use crate::domain::ocpp::messages::StartTransactionResponse;
use crate::support::errors::SimulatorError;
use crate::support::ocpp_frame::OcppFrame;

/// Handler for OCPP 1.6 messages
#[derive(Clone)]
pub struct OcppHandlerV16 {
    pub ctx: EngineContext,
}

impl OcppHandlerV16 {
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// Process one raw frame for `device`. Returns the reply when the frame
    /// was a CALL.
    pub async fn handle(&self, device: &Arc<Device>, text: &str) -> Option<OcppFrame> {
        let device_id = device.device_id.as_str();
        debug!(device_id, "Received raw message: {}", text);

        let value: Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(e) => {
                warn!(device_id, error = %e, raw = text, "Malformed frame dropped");
                return None;
            }
        };
        self.ctx.commands.record_received(device_id, value.clone());

        let frame = match OcppFrame::from_value(&value) {
            Ok(f) => f,
            Err(e) => {
                warn!(device_id, error = %e, raw = text, "Unsupported frame ignored");
                return None;
            }
        };

        match frame {
            OcppFrame::Call {
                unique_id,
                action,
                payload,
            } => Some(self.handle_call(device, &unique_id, &action, payload).await),

            OcppFrame::CallResult { unique_id, payload } => {
                self.handle_call_result(device, &unique_id, payload).await;
                None
            }

            OcppFrame::CallError {
                unique_id,
                error_code,
                error_description,
            } => {
                warn!(
                    device_id,
                    message_id = unique_id.as_str(),
                    error_code = error_code.as_str(),
                    error_description = error_description.as_str(),
                    "Received CallError"
                );
                None
            }
        }
    }

    async fn handle_call(
        &self,
        device: &Arc<Device>,
        unique_id: &str,
        action: &str,
        payload: Value,
    ) -> OcppFrame {
        info!(
            device_id = device.device_id.as_str(),
            action,
            message_id = unique_id,
            "Received Call"
        );

        let outcome = v16_action_matcher(self, device, action, &payload).await;
        let reply = match outcome.reply {
            Ok(payload) => OcppFrame::CallResult {
                unique_id: unique_id.to_string(),
                payload,
            },
            Err(details) => OcppFrame::CallError {
                unique_id: unique_id.to_string(),
                error_code: details.error_code,
                error_description: details.error_description,
            },
        };

        {
            let state = device.lock().await;
            let sent = match state.connection.as_ref() {
                Some(connection) => self.ctx.commands.transmit(connection, reply.clone()),
                None => Err(SimulatorError::NotConnected(device.device_id.clone())),
            };
            if let Err(e) = sent {
                warn!(
                    device_id = device.device_id.as_str(),
                    message_id = unique_id,
                    error = %e,
                    "Reply not sent"
                );
            }
        }

        if let Some(follow_up) = outcome.follow_up {
            self.spawn_follow_up(device.clone(), follow_up);
        }

        reply
    }

    async fn handle_call_result(&self, device: &Arc<Device>, unique_id: &str, payload: Value) {
        let device_id = device.device_id.as_str();
        let mut state = device.lock().await;

        // Any CallResult settles the single pending correlation
        let pending = state
            .connection
            .as_mut()
            .and_then(|connection| connection.pending_start.take());

        match pending {
            Some(pending) if pending.message_id == unique_id => {
                match serde_json::from_value::<StartTransactionResponse>(payload) {
                    Ok(response) => transactions::confirm_start(
                        &self.ctx,
                        device,
                        &mut state,
                        pending.connector_id,
                        response.transaction_id,
                    ),
                    Err(e) => warn!(
                        device_id,
                        message_id = unique_id,
                        error = %e,
                        "Invalid StartTransaction response"
                    ),
                }
            }
            Some(pending) => debug!(
                device_id,
                message_id = unique_id,
                pending = pending.message_id.as_str(),
                "CallResult does not match pending StartTransaction, correlation dropped"
            ),
            None => debug!(device_id, message_id = unique_id, "Received CallResult"),
        }
    }

    fn spawn_follow_up(&self, device: Arc<Device>, follow_up: FollowUp) {
        let ctx = self.ctx.clone();
        tokio::spawn(async move {
            let mut state = device.lock().await;
            let device_id = device.device_id.as_str();

            match follow_up {
                FollowUp::StartTransaction {
                    connector_id,
                    id_tag,
                } => {
                    if !state.is_connected() {
                        warn!(device_id, "Not connected, remote start not simulated");
                        return;
                    }
                    let connector_id = connector_id
                        .or_else(|| state.charge_point.connector_ids().first().copied())
                        .unwrap_or(1);
                    let meter_start = transactions::random_meter_start();
                    if let Err(e) =
                        transactions::start(&ctx, &mut state, connector_id, &id_tag, meter_start)
                    {
                        warn!(device_id, connector_id, error = %e, "Remote start failed");
                    }
                }
                FollowUp::StopTransaction {
                    transaction_id: Some(transaction_id),
                } => {
                    transactions::stop_by_transaction_id(&ctx, &mut state, transaction_id);
                }
                FollowUp::StopTransaction {
                    transaction_id: None,
                } => {
                    info!(device_id, "Transaction not found");
                }
            }
        });
    }
}
