//! MeterValues call

use tracing::debug;

use crate::application::commands::CommandSender;
use crate::application::session::Connection;
use crate::domain::ocpp::messages::{MeterValue, MeterValuesRequest, SampledValue};
use crate::domain::Action;
use crate::support::errors::SimResult;
use crate::support::time;

pub fn meter_values(
    command_sender: &CommandSender,
    connection: &mut Connection,
    connector_id: u32,
    transaction_id: i32,
    sampled_value: Vec<SampledValue>,
) -> SimResult<String> {
    debug!(
        device_id = connection.device_id.as_str(),
        connector_id,
        transaction_id,
        samples = sampled_value.len(),
        "MeterValues"
    );

    let request = MeterValuesRequest {
        connector_id,
        transaction_id,
        meter_value: vec![MeterValue {
            timestamp: time::timestamp(),
            sampled_value,
        }],
    };

    command_sender.send_call(
        connection,
        Action::MeterValues,
        serde_json::to_value(&request)?,
    )
}
