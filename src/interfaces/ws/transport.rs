//! Transport seam between the engine and the wire
//!
//! The connection manager only sees text frames going out and
//! [`TransportEvent`]s coming in; the WebSocket client is one implementation.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::support::errors::SimResult;

/// Something that happened on an open transport
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Text frame from the central system
    Message(String),
    /// The transport failed; no further events follow
    Error(String),
    /// The peer closed the transport
    Closed(Option<String>),
}

/// An open transport.
///
/// Dropping `outbound` closes the transport.
pub struct TransportLink {
    pub outbound: mpsc::UnboundedSender<String>,
    pub inbound: mpsc::UnboundedReceiver<TransportEvent>,
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a transport for `device_id`.
    async fn open(&self, device_id: &str) -> SimResult<TransportLink>;
}
