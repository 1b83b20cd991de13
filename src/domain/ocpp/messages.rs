//! Payloads of the calls this charge point originates
//!
//! BootNotification and the remote-control responses use `rust_ocpp::v1_6`
//! types directly; the shapes below follow the simulator's own wire format
//! (`stopReason`, the extended connector status set, string sampled values).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::charge_point::ConnectorStatus;

pub const ERROR_CODE_NO_ERROR: &str = "NoError";
pub const STOP_REASON_POWER_LOSS: &str = "PowerLoss";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusNotificationRequest {
    pub connector_id: u32,
    pub error_code: String,
    pub status: ConnectorStatus,
    pub timestamp: String,
    pub info: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartTransactionRequest {
    pub connector_id: u32,
    pub id_tag: String,
    pub timestamp: String,
    pub meter_start: i32,
}

/// CallResult payload for StartTransaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartTransactionResponse {
    pub transaction_id: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_tag_info: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopTransactionRequest {
    pub transaction_id: i32,
    pub meter_stop: i32,
    pub timestamp: String,
    pub id_tag: String,
    pub stop_reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeterValuesRequest {
    pub connector_id: u32,
    pub transaction_id: i32,
    pub meter_value: Vec<MeterValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeterValue {
    pub timestamp: String,
    pub sampled_value: Vec<SampledValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampledValue {
    pub value: String,
    pub context: String,
    pub measurand: String,
    pub unit: String,
}

impl SampledValue {
    pub const CONTEXT_PERIODIC: &'static str = "Sample.Periodic";

    pub const SOC: &'static str = "SoC";
    pub const ENERGY_ACTIVE_IMPORT_REGISTER: &'static str = "Energy.Active.Import.Register";
    pub const VOLTAGE: &'static str = "Voltage";
    pub const CURRENT_IMPORT: &'static str = "Current.Import";

    pub fn periodic(measurand: &str, value: i64, unit: &str) -> Self {
        Self {
            value: value.to_string(),
            context: Self::CONTEXT_PERIODIC.to_string(),
            measurand: measurand.to_string(),
            unit: unit.to_string(),
        }
    }
}

/// Error object carried in the third element of a CallError frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallErrorDetails {
    pub error_code: String,
    pub error_description: String,
}

impl CallErrorDetails {
    pub fn not_implemented(action: &str) -> Self {
        Self {
            error_code: "NotImplemented".to_string(),
            error_description: format!("Action {} is not implemented", action),
        }
    }
}
