pub mod commands;
pub mod connection_manager;
pub mod context;
pub mod handlers;
pub mod services;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

// Re-export key types for convenience
pub use commands::{create_command_sender, CommandSender, SharedCommandSender};
pub use connection_manager::ConnectionManager;
pub use context::EngineContext;
pub use handlers::OcppHandlerV16;
pub use services::MeterSample;
pub use session::{
    ChargePointSnapshot, DeviceRegistry, MessageDirection, MessageLogEntry, Selection,
    SharedDeviceRegistry,
};
