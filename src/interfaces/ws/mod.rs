//! WebSocket transport to the central system

pub mod ocpp_client;
pub mod transport;

pub use ocpp_client::WsTransport;
pub use transport::{Transport, TransportEvent, TransportLink};
