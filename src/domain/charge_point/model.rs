//! Charge Point domain entity

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::transaction::Transaction;
use crate::support::errors::SimulatorError;

/// Connector status as reported in StatusNotification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConnectorStatus {
    #[default]
    Available,
    Occupied,
    Reserved,
    Unavailable,
    Faulted,
    Finishing,
    Preparing,
    Charging,
}

impl ConnectorStatus {
    pub const ALL: &'static [ConnectorStatus] = &[
        Self::Available,
        Self::Occupied,
        Self::Reserved,
        Self::Unavailable,
        Self::Faulted,
        Self::Finishing,
        Self::Preparing,
        Self::Charging,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::Occupied => "Occupied",
            Self::Reserved => "Reserved",
            Self::Unavailable => "Unavailable",
            Self::Faulted => "Faulted",
            Self::Finishing => "Finishing",
            Self::Preparing => "Preparing",
            Self::Charging => "Charging",
        }
    }
}

impl fmt::Display for ConnectorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectorStatus {
    type Err = SimulatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SimulatorError::InvalidStatus(s.to_string()))
    }
}

/// Current type delivered by a connector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectorType {
    #[default]
    AC,
    DC,
}

impl ConnectorType {
    /// Fixed nominal voltage used for meter telemetry.
    pub fn nominal_voltage(&self) -> u32 {
        match self {
            Self::AC => 230,
            Self::DC => 400,
        }
    }
}

/// Static connector definition used when registering a charge point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorSpec {
    pub id: u32,
    /// Rated power in kW
    pub power_kw: f64,
    #[serde(rename = "type", default)]
    pub connector_type: ConnectorType,
}

impl ConnectorSpec {
    pub fn new(id: u32, power_kw: f64, connector_type: ConnectorType) -> Self {
        Self {
            id,
            power_kw,
            connector_type,
        }
    }

    pub fn validate(&self) -> Result<(), SimulatorError> {
        if self.id == 0 {
            return Err(SimulatorError::InvalidConnector(
                "connector id must be a positive integer".into(),
            ));
        }
        if !(self.power_kw.is_finite() && self.power_kw > 0.0) {
            return Err(SimulatorError::InvalidConnector(format!(
                "connector {} power must be positive, got {}",
                self.id, self.power_kw
            )));
        }
        Ok(())
    }
}

/// Connector on a simulated charge point
#[derive(Debug, Clone, Serialize)]
pub struct Connector {
    pub id: u32,
    pub status: ConnectorStatus,
    pub power_kw: f64,
    #[serde(rename = "type")]
    pub connector_type: ConnectorType,
    pub transaction: Option<Transaction>,
}

impl Connector {
    pub fn new(spec: &ConnectorSpec) -> Self {
        Self {
            id: spec.id,
            status: ConnectorStatus::Available,
            power_kw: spec.power_kw,
            connector_type: spec.connector_type,
            transaction: None,
        }
    }

    /// Server-assigned id of the running session, if the start handshake completed.
    pub fn active_transaction_id(&self) -> Option<i32> {
        self.transaction.as_ref().and_then(|tx| tx.transaction_id)
    }

    /// Meter simulation only runs while this holds.
    pub fn is_metering(&self) -> bool {
        self.status == ConnectorStatus::Charging && self.active_transaction_id().is_some()
    }
}

/// Simulated charge point
#[derive(Debug, Clone, Serialize)]
pub struct ChargePoint {
    pub device_id: String,
    pub connectors: BTreeMap<u32, Connector>,
    pub created_at: DateTime<Utc>,
}

impl ChargePoint {
    pub fn new(
        device_id: impl Into<String>,
        specs: &[ConnectorSpec],
    ) -> Result<Self, SimulatorError> {
        let mut connectors = BTreeMap::new();
        for spec in specs {
            spec.validate()?;
            if connectors.insert(spec.id, Connector::new(spec)).is_some() {
                return Err(SimulatorError::InvalidConnector(format!(
                    "duplicate connector id {}",
                    spec.id
                )));
            }
        }

        Ok(Self {
            device_id: device_id.into(),
            connectors,
            created_at: Utc::now(),
        })
    }

    pub fn connector(&self, connector_id: u32) -> Result<&Connector, SimulatorError> {
        self.connectors
            .get(&connector_id)
            .ok_or_else(|| SimulatorError::ConnectorNotFound {
                device_id: self.device_id.clone(),
                connector_id,
            })
    }

    pub fn connector_mut(&mut self, connector_id: u32) -> Result<&mut Connector, SimulatorError> {
        let device_id = &self.device_id;
        self.connectors
            .get_mut(&connector_id)
            .ok_or_else(|| SimulatorError::ConnectorNotFound {
                device_id: device_id.clone(),
                connector_id,
            })
    }

    /// First connector (lowest id) whose transaction carries `transaction_id`.
    pub fn find_transaction(&self, transaction_id: i32) -> Option<u32> {
        self.connectors
            .values()
            .find(|c| c.active_transaction_id() == Some(transaction_id))
            .map(|c| c.id)
    }

    pub fn connector_ids(&self) -> Vec<u32> {
        self.connectors.keys().copied().collect()
    }
}
