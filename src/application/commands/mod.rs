//! Outbound calls from the simulated charge point to the central system
//!
//! ## Architecture
//!
//! ```text
//! transactions / meter simulator / heartbeat / connection manager
//!                        │
//!            boot_notification::*, status_notification::*, ...
//!                 build typed payload, call CommandSender
//!                        │
//!                  CommandSender ──► Connection (fire-and-forget)
//!                        │
//!                    MessageLog
//! ```
//!
//! - [`CommandSender`] frames `[2, id, action, payload]` with a fresh UUID,
//!   hands it to the device's connection and records it in the message log.
//!   Nothing is queued or retried; a closed connection reports
//!   [`SimulatorError::NotConnected`].
//! - A StartTransaction call is remembered as the connection's single
//!   pending correlation so that its CallResult can bind the transaction id.
//! - Replies to inbound calls go through [`CommandSender::send_call_result`]
//!   and [`CommandSender::send_call_error`].

pub mod boot_notification;
pub mod heartbeat;
pub mod meter_values;
pub mod start_transaction;
pub mod status_notification;
pub mod stop_transaction;

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::application::session::{Connection, MessageDirection, MessageLog, PendingStart};
use crate::domain::ocpp::messages::CallErrorDetails;
use crate::domain::Action;
use crate::support::errors::{SimResult, SimulatorError};
use crate::support::ocpp_frame::OcppFrame;

pub use boot_notification::boot_notification;
pub use heartbeat::heartbeat;
pub use meter_values::meter_values;
pub use start_transaction::start_transaction;
pub use status_notification::status_notification;
pub use stop_transaction::stop_transaction;

/// Frames, transmits and logs OCPP messages for every device.
pub struct CommandSender {
    message_log: Arc<MessageLog>,
}

impl CommandSender {
    pub fn new(message_log: Arc<MessageLog>) -> Self {
        Self { message_log }
    }

    fn generate_message_id() -> String {
        Uuid::new_v4().to_string()
    }

    pub fn message_log(&self) -> &Arc<MessageLog> {
        &self.message_log
    }

    /// Send a CALL over `connection` and return its message id.
    pub fn send_call(
        &self,
        connection: &mut Connection,
        action: Action,
        payload: Value,
    ) -> SimResult<String> {
        let message_id = Self::generate_message_id();
        let connector_id = match action {
            Action::StartTransaction => Some(
                payload
                    .get("connectorId")
                    .and_then(Value::as_u64)
                    .and_then(|id| u32::try_from(id).ok())
                    .ok_or_else(|| {
                        SimulatorError::InvalidConnector(
                            "StartTransaction without connectorId".into(),
                        )
                    })?,
            ),
            _ => None,
        };

        let frame = OcppFrame::Call {
            unique_id: message_id.clone(),
            action: action.as_str().to_string(),
            payload,
        };
        self.transmit(connection, frame)?;

        debug!(
            device_id = connection.device_id.as_str(),
            action = action.as_str(),
            message_id = message_id.as_str(),
            "Call sent"
        );

        if let Some(connector_id) = connector_id {
            connection.pending_start = Some(PendingStart {
                message_id: message_id.clone(),
                device_id: connection.device_id.clone(),
                connector_id,
            });
        }

        Ok(message_id)
    }

    /// Answer an inbound CALL.
    pub fn send_call_result(
        &self,
        connection: &Connection,
        unique_id: &str,
        payload: Value,
    ) -> SimResult<()> {
        self.transmit(
            connection,
            OcppFrame::CallResult {
                unique_id: unique_id.to_string(),
                payload,
            },
        )
    }

    /// Reject an inbound CALL.
    pub fn send_call_error(
        &self,
        connection: &Connection,
        unique_id: &str,
        details: &CallErrorDetails,
    ) -> SimResult<()> {
        self.transmit(
            connection,
            OcppFrame::CallError {
                unique_id: unique_id.to_string(),
                error_code: details.error_code.clone(),
                error_description: details.error_description.clone(),
            },
        )
    }

    /// Send any frame, logging it once the transport accepted it.
    pub fn transmit(&self, connection: &Connection, frame: OcppFrame) -> SimResult<()> {
        let value = frame.to_value();
        connection.send(value.to_string())?;
        self.message_log
            .record(MessageDirection::Sent, &connection.device_id, value);
        Ok(())
    }

    /// Record an inbound frame.
    pub fn record_received(&self, device_id: &str, frame: Value) {
        self.message_log
            .record(MessageDirection::Received, device_id, frame);
    }
}

pub type SharedCommandSender = Arc<CommandSender>;

pub fn create_command_sender(message_log: Arc<MessageLog>) -> SharedCommandSender {
    Arc::new(CommandSender::new(message_log))
}
