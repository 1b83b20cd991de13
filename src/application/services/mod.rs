//! Engine services: session state machine and periodic tasks

pub mod heartbeat;
pub mod meter_simulator;
pub mod transactions;

pub use meter_simulator::MeterSample;
