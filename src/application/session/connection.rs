//! Transport connection held by one simulated charge point

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::support::errors::{SimResult, SimulatorError};

/// StartTransaction call still waiting for its CallResult
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingStart {
    pub message_id: String,
    pub device_id: String,
    pub connector_id: u32,
}

/// One connection attempt to the central system.
///
/// Created as soon as a connect is requested; `is_connected` flips once the
/// transport is open. Dropping it aborts the heartbeat and the supervisor,
/// and releases the outbound sender, which closes the transport.
#[derive(Debug)]
pub struct Connection {
    /// Distinguishes this attempt from earlier ones of the same device
    pub connection_id: u64,
    pub device_id: String,
    sender: Option<mpsc::UnboundedSender<String>>,
    pub is_connected: bool,
    pub connected_at: Option<DateTime<Utc>>,
    heartbeat: Option<JoinHandle<()>>,
    supervisor: Option<JoinHandle<()>>,
    /// At most one outstanding StartTransaction correlation
    pub pending_start: Option<PendingStart>,
}

impl Connection {
    pub fn new(connection_id: u64, device_id: impl Into<String>) -> Self {
        Self {
            connection_id,
            device_id: device_id.into(),
            sender: None,
            is_connected: false,
            connected_at: None,
            heartbeat: None,
            supervisor: None,
            pending_start: None,
        }
    }

    /// Transport is up; frames can flow.
    pub fn open(&mut self, sender: mpsc::UnboundedSender<String>) {
        self.sender = Some(sender);
        self.is_connected = true;
        self.connected_at = Some(Utc::now());
    }

    /// Hand a serialized frame to the transport.
    pub fn send(&self, message: String) -> SimResult<()> {
        match (&self.sender, self.is_connected) {
            (Some(sender), true) => sender
                .send(message)
                .map_err(|e| SimulatorError::Transport(format!("Failed to send message: {}", e))),
            _ => Err(SimulatorError::NotConnected(self.device_id.clone())),
        }
    }

    /// Transport closed or failed. Stops the heartbeat and drops the sender.
    pub fn mark_disconnected(&mut self) {
        self.is_connected = false;
        self.sender = None;
        self.stop_heartbeat();
    }

    pub fn set_heartbeat(&mut self, handle: JoinHandle<()>) {
        if let Some(previous) = self.heartbeat.replace(handle) {
            previous.abort();
        }
    }

    pub fn stop_heartbeat(&mut self) {
        if let Some(handle) = self.heartbeat.take() {
            handle.abort();
        }
    }

    pub fn has_heartbeat(&self) -> bool {
        self.heartbeat
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }

    pub fn set_supervisor(&mut self, handle: JoinHandle<()>) {
        if let Some(previous) = self.supervisor.replace(handle) {
            previous.abort();
        }
    }

    /// Close everything this connection owns.
    pub fn teardown(&mut self) {
        self.mark_disconnected();
        self.pending_start = None;
        if let Some(handle) = self.supervisor.take() {
            handle.abort();
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.teardown();
    }
}

// ── Tests ──────────────────────────────────────────────────────
