pub mod charge_point;
pub mod ocpp;
pub mod transaction;

// Re-export commonly used types
pub use charge_point::{ChargePoint, Connector, ConnectorSpec, ConnectorStatus, ConnectorType};
pub use ocpp::Action;
pub use transaction::Transaction;
