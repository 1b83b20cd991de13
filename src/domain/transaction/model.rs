//! Transaction domain entity

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Metering record of one charging session on a connector.
///
/// Created when the StartTransaction call goes out; `transaction_id` stays
/// `None` until the central system answers it.
#[derive(Debug, Clone, Serialize)]
pub struct Transaction {
    /// Server-assigned id, bound at most once
    pub transaction_id: Option<i32>,
    /// Meter value at start (Wh)
    pub meter_start: i32,
    /// When the start was requested
    pub start_timestamp: DateTime<Utc>,
    /// ID tag that started the transaction
    pub id_tag: String,
    /// Latest simulated register reading (Wh), never decreases
    pub last_meter_value: Option<f64>,
}

impl Transaction {
    pub fn new(id_tag: impl Into<String>, meter_start: i32) -> Self {
        Self {
            transaction_id: None,
            meter_start,
            start_timestamp: Utc::now(),
            id_tag: id_tag.into(),
            last_meter_value: None,
        }
    }

    /// Bind the server-assigned id. Returns `false` if one was already bound.
    pub fn bind_transaction_id(&mut self, transaction_id: i32) -> bool {
        if self.transaction_id.is_some() {
            return false;
        }
        self.transaction_id = Some(transaction_id);
        true
    }

    /// Register reading the simulator continues from.
    pub fn current_meter_value(&self) -> f64 {
        self.last_meter_value.unwrap_or(self.meter_start as f64)
    }

    /// Record a new register reading; readings below the current one are ignored.
    pub fn record_meter_value(&mut self, value_wh: f64) {
        if value_wh >= self.current_meter_value() {
            self.last_meter_value = Some(value_wh);
        }
    }

    /// `meterStop` for StopTransaction: last reading, or the start value.
    pub fn meter_stop(&self) -> i32 {
        self.current_meter_value().round() as i32
    }
}
