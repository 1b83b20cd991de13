use thiserror::Error;

/// Errors reported to callers of the simulator engine.
///
/// Everything here is recoverable: the engine logs and carries on, the
/// control plane turns these into failed results.
#[derive(Debug, Error)]
pub enum SimulatorError {
    #[error("Charge point {0} not found")]
    DeviceNotFound(String),

    #[error("Charge point {0} already exists")]
    DeviceExists(String),

    #[error("Connector {connector_id} not found on charge point {device_id}")]
    ConnectorNotFound { device_id: String, connector_id: u32 },

    #[error("Invalid connector definition: {0}")]
    InvalidConnector(String),

    #[error("Charge point {0} is not connected")]
    NotConnected(String),

    #[error("No active transaction on connector {connector_id} of charge point {device_id}")]
    NoActiveTransaction { device_id: String, connector_id: u32 },

    #[error("Connector {connector_id} of charge point {device_id} already has a transaction")]
    TransactionInProgress { device_id: String, connector_id: u32 },

    #[error("Unrecognized connector status: {0}")]
    InvalidStatus(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type SimResult<T> = Result<T, SimulatorError>;
