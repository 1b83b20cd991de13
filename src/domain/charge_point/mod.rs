pub mod model;

pub use model::{ChargePoint, Connector, ConnectorSpec, ConnectorStatus, ConnectorType};
