//! OCPP 1.6J protocol vocabulary

pub mod action;
pub mod messages;

pub use action::Action;

/// WebSocket subprotocol negotiated with the central system.
pub const OCPP_SUBPROTOCOL: &str = "ocpp1.6";
