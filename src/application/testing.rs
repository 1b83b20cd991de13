//! In-memory transport for engine tests

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::config::SimulatorConfig;
use crate::interfaces::ws::{Transport, TransportEvent, TransportLink};
use crate::support::errors::{SimResult, SimulatorError};

/// Upper bound on how long a test waits for the next frame (virtual time
/// under a paused clock).
const FRAME_TIMEOUT: Duration = Duration::from_secs(600);

pub fn test_config() -> SimulatorConfig {
    SimulatorConfig {
        heartbeat_interval: Duration::from_secs(30),
        meter_values_interval: Duration::from_secs(30),
        boot_interval_secs: 30,
        default_id_tag: "SIMULATOR".to_string(),
        ..SimulatorConfig::default()
    }
}

/// Hands every opened link to the test through a channel.
pub struct MockTransport {
    links: mpsc::UnboundedSender<MockLink>,
    refuse: AtomicBool,
    attempts: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<MockLink>) {
        let (links, rx) = mpsc::unbounded_channel();
        let transport = Arc::new(Self {
            links,
            refuse: AtomicBool::new(false),
            attempts: AtomicUsize::new(0),
        });
        (transport, rx)
    }

    pub fn refuse_connections(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    pub fn open_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn open(&self, device_id: &str) -> SimResult<TransportLink> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.refuse.load(Ordering::SeqCst) {
            return Err(SimulatorError::Transport("connection refused".to_string()));
        }

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let _ = self.links.send(MockLink {
            device_id: device_id.to_string(),
            outbound: outbound_rx,
            inbound: inbound_tx,
        });

        Ok(TransportLink {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}

/// The central system's end of one mock connection
pub struct MockLink {
    pub device_id: String,
    outbound: mpsc::UnboundedReceiver<String>,
    inbound: mpsc::UnboundedSender<TransportEvent>,
}

impl MockLink {
    /// Next frame sent by the charge point; `None` once the engine closed the link.
    pub async fn next_frame(&mut self) -> Option<Value> {
        let text = tokio::time::timeout(FRAME_TIMEOUT, self.outbound.recv())
            .await
            .expect("timed out waiting for a frame")?;
        Some(serde_json::from_str(&text).expect("engine sent invalid JSON"))
    }

    /// Assert the next frame is a CALL for `action`; returns its id and payload.
    pub async fn expect_call(&mut self, action: &str) -> (String, Value) {
        let frame = self.next_frame().await.expect("link closed");
        assert_eq!(frame[0], 2, "expected a CALL, got {}", frame);
        assert_eq!(frame[2], action, "unexpected action in {}", frame);
        let message_id = frame[1].as_str().expect("message id").to_string();
        (message_id, frame[3].clone())
    }

    /// Assert the next frame is the CALLRESULT for `message_id`; returns its payload.
    pub async fn expect_result(&mut self, message_id: &str) -> Value {
        let frame = self.next_frame().await.expect("link closed");
        assert_eq!(frame[0], 3, "expected a CALLRESULT, got {}", frame);
        assert_eq!(frame[1], message_id);
        frame[2].clone()
    }

    /// Actions of every CALL already queued, without waiting.
    pub fn drain_actions(&mut self) -> Vec<String> {
        let mut actions = Vec::new();
        while let Ok(text) = self.outbound.try_recv() {
            let frame: Value = serde_json::from_str(&text).expect("engine sent invalid JSON");
            match frame[2].as_str() {
                Some(action) if frame[0] == 2 => actions.push(action.to_string()),
                _ => actions.push(frame[0].to_string()),
            }
        }
        actions
    }

    pub fn push(&self, frame: Value) {
        self.push_raw(&frame.to_string());
    }

    pub fn push_raw(&self, text: &str) {
        let _ = self.inbound.send(TransportEvent::Message(text.to_string()));
    }

    /// Simulate the central system closing the socket.
    pub fn close(&self) {
        let _ = self.inbound.send(TransportEvent::Closed(Some("server going away".into())));
    }
}
