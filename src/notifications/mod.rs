//! Simulator notifications
//!
//! Broadcasts engine events (connections, status changes, sessions,
//! telemetry) to whoever drives the simulator.

pub mod event_bus;
pub mod events;

pub use event_bus::{create_event_bus, EventBus, EventSubscriber, SharedEventBus};
pub use events::*;
