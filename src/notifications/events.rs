//! Simulator events
//!
//! Published by the engine for the control plane; nothing in the protocol
//! core depends on them being consumed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ConnectorStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Event {
    /// Transport opened and the boot sequence was sent
    ConnectionOpened(ConnectionEvent),
    /// Transport closed or failed
    ConnectionClosed(ConnectionClosedEvent),
    /// A connector's status changed
    ConnectorStatusChanged(ConnectorStatusChangedEvent),
    /// StartTransaction was confirmed and the session is charging
    TransactionStarted(TransactionStartedEvent),
    /// A session ended
    TransactionStopped(TransactionStoppedEvent),
    /// A MeterValues sample went out
    MeterValuesSent(MeterValuesSentEvent),
}

impl Event {
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::ConnectionOpened(_) => "connection_opened",
            Event::ConnectionClosed(_) => "connection_closed",
            Event::ConnectorStatusChanged(_) => "connector_status_changed",
            Event::TransactionStarted(_) => "transaction_started",
            Event::TransactionStopped(_) => "transaction_stopped",
            Event::MeterValuesSent(_) => "meter_values_sent",
        }
    }

    pub fn device_id(&self) -> &str {
        match self {
            Event::ConnectionOpened(e) => &e.device_id,
            Event::ConnectionClosed(e) => &e.device_id,
            Event::ConnectorStatusChanged(e) => &e.device_id,
            Event::TransactionStarted(e) => &e.device_id,
            Event::TransactionStopped(e) => &e.device_id,
            Event::MeterValuesSent(e) => &e.device_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionEvent {
    pub device_id: String,
    pub connection_id: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionClosedEvent {
    pub device_id: String,
    pub connection_id: u64,
    pub reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorStatusChangedEvent {
    pub device_id: String,
    pub connector_id: u32,
    pub old_status: ConnectorStatus,
    pub new_status: ConnectorStatus,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionStartedEvent {
    pub device_id: String,
    pub connector_id: u32,
    pub transaction_id: i32,
    pub id_tag: String,
    pub meter_start: i32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionStoppedEvent {
    pub device_id: String,
    pub connector_id: u32,
    pub transaction_id: Option<i32>,
    pub meter_stop: i32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeterValuesSentEvent {
    pub device_id: String,
    pub connector_id: u32,
    pub transaction_id: i32,
    pub energy_wh: i64,
    pub soc: Option<u32>,
    pub timestamp: DateTime<Utc>,
}
