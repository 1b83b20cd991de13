//! OCPP 1.6 inbound call handlers
//!
//! Routes the action names the central system may call on a charge point.
//! Each handler reads its payload leniently and replies with a `rust_ocpp::v1_6` type.
//! Anything else is answered with a `NotImplemented` CallError.

use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::application::session::Device;
use crate::application::OcppHandlerV16;
use crate::domain::ocpp::messages::CallErrorDetails;
use crate::domain::Action;

mod handle_boot_notification;
mod handle_heartbeat;
mod handle_remote_start_transaction;
mod handle_remote_stop_transaction;

pub use handle_boot_notification::handle_boot_notification;
pub use handle_heartbeat::handle_heartbeat;
pub use handle_remote_start_transaction::handle_remote_start_transaction;
pub use handle_remote_stop_transaction::handle_remote_stop_transaction;

/// Work that runs only after the reply went out
#[derive(Debug, Clone, PartialEq)]
pub enum FollowUp {
    StartTransaction {
        connector_id: Option<u32>,
        id_tag: String,
    },
    StopTransaction {
        transaction_id: Option<i32>,
    },
}

/// Reply to an inbound call plus any deferred work
#[derive(Debug)]
pub struct CallOutcome {
    pub reply: Result<Value, CallErrorDetails>,
    pub follow_up: Option<FollowUp>,
}

impl CallOutcome {
    pub fn result(payload: Value) -> Self {
        Self {
            reply: Ok(payload),
            follow_up: None,
        }
    }

    pub fn error(details: CallErrorDetails) -> Self {
        Self {
            reply: Err(details),
            follow_up: None,
        }
    }

    pub fn then(mut self, follow_up: FollowUp) -> Self {
        self.follow_up = Some(follow_up);
        self
    }
}

/// Routes OCPP 1.6 actions to their respective handlers.
pub async fn v16_action_matcher(
    handler: &OcppHandlerV16,
    device: &Arc<Device>,
    action: &str,
    payload: &Value,
) -> CallOutcome {
    match Action::from_name(action) {
        Some(Action::Heartbeat) => handle_heartbeat(handler, device, payload).await,
        Some(Action::BootNotification) => handle_boot_notification(handler, device, payload).await,
        Some(Action::RemoteStartTransaction) => {
            handle_remote_start_transaction(handler, device, payload).await
        }
        Some(Action::RemoteStopTransaction) => {
            handle_remote_stop_transaction(handler, device, payload).await
        }
        _ => {
            warn!(
                device_id = device.device_id.as_str(),
                action,
                "Unsupported OCPP 1.6 action"
            );
            CallOutcome::error(CallErrorDetails::not_implemented(action))
        }
    }
}
