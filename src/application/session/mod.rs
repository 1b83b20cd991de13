//! Simulated devices, their connections and the registry holding them

pub mod connection;
pub mod device;
pub mod message_log;
pub mod registry;

pub use connection::{Connection, PendingStart};
pub use device::{ChargePointSnapshot, Device, DeviceState};
pub use message_log::{MessageDirection, MessageLog, MessageLogEntry, MESSAGE_LOG_CAPACITY};
pub use registry::{DeviceRegistry, Selection, SharedDeviceRegistry};
