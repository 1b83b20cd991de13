//! Heartbeat call

use serde_json::json;
use tracing::debug;

use crate::application::commands::CommandSender;
use crate::application::session::Connection;
use crate::domain::Action;
use crate::support::errors::SimResult;

pub fn heartbeat(command_sender: &CommandSender, connection: &mut Connection) -> SimResult<String> {
    debug!(device_id = connection.device_id.as_str(), "Heartbeat");
    command_sender.send_call(connection, Action::Heartbeat, json!({}))
}
