//! # OCPP 1.6J Charge Point Simulator
//!
//! Simulates any number of charge points against a real Central System
//! over OCPP 1.6J (JSON over WebSocket).
//!
//! ## Architecture
//!
//! - **domain**: Charge point, connector and transaction entities, OCPP payloads
//! - **application**: Device registry, connection lifecycle, transaction state
//!   machine, meter simulator, inbound call handlers
//! - **interfaces**: WebSocket transport to the Central System
//! - **notifications**: Event bus for whoever drives the simulator
//! - **support**: OCPP-J frame codec, errors, timestamps

pub mod application;
pub mod bootstrap;
pub mod config;
pub mod domain;
pub mod interfaces;
pub mod notifications;
pub mod support;

pub use application::{DeviceRegistry, EngineContext, SharedDeviceRegistry};
pub use bootstrap::{init_tracing, SimulatorHandle};
pub use config::{default_config_path, AppConfig, SimulatorConfig};
pub use notifications::{create_event_bus, Event, EventBus, SharedEventBus};
pub use support::{OcppFrame, SimResult, SimulatorError};
