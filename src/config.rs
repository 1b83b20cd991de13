//! Configuration module
//!
//! The simulator reads a TOML file (default
//! `~/.config/ocpp-simulator/config.toml`). Every section is optional;
//! missing values fall back to the defaults below.
//!
//! ```toml
//! [server]
//! url = "ws://localhost:9000/ocpp"
//!
//! [logging]
//! level = "info"
//! format = "text"
//!
//! [simulator]
//! heartbeat_interval_secs = 30
//! meter_values_interval_secs = 30
//!
//! [[charge_points]]
//! device_id = "CP-001"
//!
//! [[charge_points.connectors]]
//! id = 1
//! power_kw = 22.0
//! type = "AC"
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::charge_point::{ConnectorSpec, ConnectorType};
use crate::support::errors::{SimResult, SimulatorError};

/// Default location of the configuration file.
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ocpp-simulator")
        .join("config.toml")
}

// ── File sections ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Central system endpoint; the device id is appended as the last path segment
    pub url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:9000/ocpp".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `text` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorSection {
    pub heartbeat_interval_secs: u64,
    pub meter_values_interval_secs: u64,
    /// Interval returned when the central system sends us a BootNotification
    pub boot_interval_secs: u32,
    /// Id tag used for locally started sessions
    pub default_id_tag: String,
}

impl Default for SimulatorSection {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: 30,
            meter_values_interval_secs: 30,
            boot_interval_secs: 30,
            default_id_tag: "SIMULATOR".to_string(),
        }
    }
}

/// Identity reported in BootNotification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootInfo {
    pub charge_point_vendor: String,
    pub charge_point_model: String,
    pub charge_point_serial_number: String,
    pub charge_box_serial_number: String,
    pub firmware_version: String,
    pub iccid: String,
    pub imsi: String,
    pub meter_type: String,
    pub meter_serial_number: String,
}

impl Default for BootInfo {
    fn default() -> Self {
        Self {
            charge_point_vendor: "Simulator".to_string(),
            charge_point_model: "SIM-16J".to_string(),
            charge_point_serial_number: "SIM-CP-0001".to_string(),
            charge_box_serial_number: "SIM-CB-0001".to_string(),
            firmware_version: env!("CARGO_PKG_VERSION").to_string(),
            iccid: String::new(),
            imsi: String::new(),
            meter_type: "SIM-METER".to_string(),
            meter_serial_number: "SIM-MTR-0001".to_string(),
        }
    }
}

/// A charge point registered at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargePointConfig {
    pub device_id: String,
    #[serde(default = "default_true")]
    pub connect_on_start: bool,
    #[serde(default = "default_connectors")]
    pub connectors: Vec<ConnectorSpec>,
}

fn default_true() -> bool {
    true
}

fn default_connectors() -> Vec<ConnectorSpec> {
    vec![ConnectorSpec::new(1, 22.0, ConnectorType::AC)]
}

// ── AppConfig ──────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub simulator: SimulatorSection,
    pub boot: BootInfo,
    pub charge_points: Vec<ChargePointConfig>,
}

impl AppConfig {
    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> SimResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| SimulatorError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> SimResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| SimulatorError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.simulator.heartbeat_interval_secs == 0 {
            return Err(SimulatorError::Config(
                "simulator.heartbeat_interval_secs must be positive".into(),
            ));
        }
        if self.simulator.meter_values_interval_secs == 0 {
            return Err(SimulatorError::Config(
                "simulator.meter_values_interval_secs must be positive".into(),
            ));
        }

        let mut seen = HashSet::new();
        for cp in &self.charge_points {
            if cp.device_id.trim().is_empty() {
                return Err(SimulatorError::Config("device_id must not be empty".into()));
            }
            if !seen.insert(cp.device_id.as_str()) {
                return Err(SimulatorError::Config(format!(
                    "duplicate device_id {}",
                    cp.device_id
                )));
            }
            for connector in &cp.connectors {
                connector
                    .validate()
                    .map_err(|e| SimulatorError::Config(format!("{}: {}", cp.device_id, e)))?;
            }
        }
        Ok(())
    }

    /// Engine settings derived from this file.
    pub fn simulator_config(&self) -> SimulatorConfig {
        SimulatorConfig {
            heartbeat_interval: Duration::from_secs(self.simulator.heartbeat_interval_secs),
            meter_values_interval: Duration::from_secs(self.simulator.meter_values_interval_secs),
            boot_interval_secs: self.simulator.boot_interval_secs,
            default_id_tag: self.simulator.default_id_tag.clone(),
            boot: self.boot.clone(),
        }
    }
}

// ── SimulatorConfig ────────────────────────────────────────────

/// Settings the protocol engine runs with
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    pub heartbeat_interval: Duration,
    pub meter_values_interval: Duration,
    pub boot_interval_secs: u32,
    pub default_id_tag: String,
    pub boot: BootInfo,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        AppConfig::default().simulator_config()
    }
}
