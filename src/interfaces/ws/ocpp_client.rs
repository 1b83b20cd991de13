//! OCPP 1.6J WebSocket client transport
//!
//! Connects to `<server_url>/<device_id>` requesting the `ocpp1.6`
//! sub-protocol, then runs one pump task per connection:
//! - frames from the engine are written to the socket
//! - text frames from the socket are forwarded to the engine
//! - when the engine drops its sender, a Close frame is sent and the pump ends

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use super::transport::{Transport, TransportEvent, TransportLink};
use crate::domain::ocpp::OCPP_SUBPROTOCOL;
use crate::support::errors::{SimResult, SimulatorError};

pub struct WsTransport {
    server_url: String,
}

impl WsTransport {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
        }
    }

    /// `<server_url>/<device_id>`
    pub fn endpoint(&self, device_id: &str) -> String {
        format!("{}/{}", self.server_url.trim_end_matches('/'), device_id)
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn open(&self, device_id: &str) -> SimResult<TransportLink> {
        let url = self.endpoint(device_id);

        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| SimulatorError::Transport(format!("Invalid endpoint {}: {}", url, e)))?;
        request.headers_mut().insert(
            SEC_WEBSOCKET_PROTOCOL,
            HeaderValue::from_static(OCPP_SUBPROTOCOL),
        );

        let (ws_stream, response) = connect_async(request).await.map_err(|e| {
            error!(device_id, url = url.as_str(), error = %e, "WebSocket connection failed");
            SimulatorError::Transport(e.to_string())
        })?;

        let accepted_protocol = response
            .headers()
            .get(SEC_WEBSOCKET_PROTOCOL)
            .and_then(|v| v.to_str().ok());
        if accepted_protocol != Some(OCPP_SUBPROTOCOL) {
            warn!(
                device_id,
                ?accepted_protocol,
                "Central system did not accept the ocpp1.6 sub-protocol"
            );
        }

        info!(device_id, url = url.as_str(), "WebSocket connected");

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<TransportEvent>();
        let (mut ws_tx, mut ws_rx) = ws_stream.split();
        let device_id = device_id.to_string();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    outgoing = outbound_rx.recv() => match outgoing {
                        Some(text) => {
                            debug!(device_id = device_id.as_str(), "Sending: {}", text);
                            if let Err(e) = ws_tx.send(Message::Text(text)).await {
                                let _ = inbound_tx.send(TransportEvent::Error(e.to_string()));
                                break;
                            }
                        }
                        None => {
                            debug!(device_id = device_id.as_str(), "Closing WebSocket");
                            let _ = ws_tx.send(Message::Close(None)).await;
                            let _ = ws_tx.close().await;
                            break;
                        }
                    },

                    incoming = ws_rx.next() => match incoming {
                        Some(Ok(Message::Text(text))) => {
                            if inbound_tx.send(TransportEvent::Message(text)).is_err() {
                                break;
                            }
                        }
                        Some(Ok(Message::Binary(_))) => {
                            warn!(device_id = device_id.as_str(), "Binary frame ignored");
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let reason = frame.map(|f| f.reason.to_string());
                            info!(
                                device_id = device_id.as_str(),
                                ?reason,
                                "WebSocket closed by peer"
                            );
                            let _ = inbound_tx.send(TransportEvent::Closed(reason));
                            break;
                        }
                        // Ping/Pong are answered by tungstenite
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!(device_id = device_id.as_str(), error = %e, "WebSocket error");
                            let _ = inbound_tx.send(TransportEvent::Error(e.to_string()));
                            break;
                        }
                        None => {
                            let _ = inbound_tx.send(TransportEvent::Closed(None));
                            break;
                        }
                    },
                }
            }
        });

        Ok(TransportLink {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}
