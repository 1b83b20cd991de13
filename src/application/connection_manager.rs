//! Connection manager
//!
//! Owns the transport lifecycle of every simulated charge point:
//!
//! ```text
//! connect ──► tear down previous ──► spawn supervisor
//!                                        │ transport.open()
//!                          ┌─────────────┴─────────────┐
//!                        error                         open
//!                 mark disconnected      BootNotification, StatusNotification
//!                                        per connector, heartbeat task
//!                                                      │
//!                                        inbound frames ──► OcppHandlerV16
//!                                                      │
//!                                        close / error ──► mark disconnected
//! ```
//!
//! There is no automatic reconnect; a new `connect` always starts clean.
//! Every step re-checks the connection id so a superseded supervisor can
//! never touch the connection that replaced it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use chrono::Utc;
use tracing::{info, warn};

use crate::application::commands;
use crate::application::context::EngineContext;
use crate::application::handlers::OcppHandlerV16;
use crate::application::services::heartbeat;
use crate::application::session::{Connection, Device, DeviceState};
use crate::domain::ConnectorStatus;
use crate::interfaces::ws::{Transport, TransportEvent, TransportLink};
use crate::notifications::{ConnectionClosedEvent, ConnectionEvent, Event};

pub struct ConnectionManager {
    ctx: EngineContext,
    transport: Arc<dyn Transport>,
    handler: OcppHandlerV16,
    connection_counter: AtomicU64,
}

impl ConnectionManager {
    pub fn new(ctx: EngineContext, transport: Arc<dyn Transport>) -> Self {
        Self {
            handler: OcppHandlerV16::new(ctx.clone()),
            ctx,
            transport,
            connection_counter: AtomicU64::new(1),
        }
    }

    pub fn handler(&self) -> &OcppHandlerV16 {
        &self.handler
    }

    /// Replace any existing connection of `device` with a fresh attempt.
    /// Returns the new connection id.
    pub async fn connect(&self, device: &Arc<Device>) -> u64 {
        let connection_id = self.connection_counter.fetch_add(1, Ordering::SeqCst);
        let mut state = device.lock().await;

        if let Some(mut previous) = state.connection.take() {
            info!(
                device_id = device.device_id.as_str(),
                previous = previous.connection_id,
                "Replacing existing connection"
            );
            previous.teardown();
        }

        let mut connection = Connection::new(connection_id, device.device_id.as_str());
        connection.set_supervisor(tokio::spawn(supervise(
            self.ctx.clone(),
            self.transport.clone(),
            self.handler.clone(),
            Arc::downgrade(device),
            connection_id,
        )));
        state.connection = Some(connection);

        info!(device_id = device.device_id.as_str(), connection_id, "Connecting");
        connection_id
    }

    /// Close the transport and stop the heartbeat. Returns `false` when
    /// there was nothing to close.
    pub async fn disconnect(&self, device: &Device) -> bool {
        let mut state = device.lock().await;
        let Some(mut connection) = state.connection.take() else {
            return false;
        };
        connection.teardown();
        drop(state);

        info!(
            device_id = device.device_id.as_str(),
            connection_id = connection.connection_id,
            "Disconnected"
        );
        self.ctx.events.publish(Event::ConnectionClosed(ConnectionClosedEvent {
            device_id: device.device_id.clone(),
            connection_id: connection.connection_id,
            reason: Some("disconnect requested".to_string()),
            timestamp: Utc::now(),
        }));
        true
    }
}

async fn supervise(
    ctx: EngineContext,
    transport: Arc<dyn Transport>,
    handler: OcppHandlerV16,
    device: Weak<Device>,
    connection_id: u64,
) {
    let Some(device_id) = device.upgrade().map(|d| d.device_id.clone()) else {
        return;
    };

    let TransportLink {
        outbound,
        mut inbound,
    } = match transport.open(&device_id).await {
        Ok(link) => link,
        Err(e) => {
            warn!(device_id = device_id.as_str(), connection_id, error = %e, "Connection failed");
            mark_disconnected(&ctx, &device, connection_id, Some(e.to_string())).await;
            return;
        }
    };

    {
        let Some(device) = device.upgrade() else {
            return;
        };
        let mut state = device.lock().await;
        let Some(connection) = state.connection_for(connection_id) else {
            // Superseded while opening; dropping `outbound` closes the transport
            return;
        };
        connection.open(outbound);
        on_open(&ctx, &device, &mut state, connection_id);
    }

    info!(device_id = device_id.as_str(), connection_id, "Connection open");
    ctx.events.publish(Event::ConnectionOpened(ConnectionEvent {
        device_id: device_id.clone(),
        connection_id,
        timestamp: Utc::now(),
    }));

    let reason = loop {
        match inbound.recv().await {
            Some(TransportEvent::Message(text)) => {
                let Some(device) = device.upgrade() else {
                    return;
                };
                handler.handle(&device, &text).await;
            }
            Some(TransportEvent::Error(e)) => {
                warn!(device_id = device_id.as_str(), connection_id, error = %e, "Transport error");
                break Some(e);
            }
            Some(TransportEvent::Closed(reason)) => {
                info!(device_id = device_id.as_str(), connection_id, ?reason, "Transport closed");
                break reason;
            }
            None => break None,
        }
    };

    mark_disconnected(&ctx, &device, connection_id, reason).await;
}

/// Boot sequence for a freshly opened connection.
fn on_open(ctx: &EngineContext, device: &Arc<Device>, state: &mut DeviceState, connection_id: u64) {
    let DeviceState {
        charge_point,
        connection,
        ..
    } = state;
    let Some(connection) = connection.as_mut() else {
        return;
    };

    if let Err(e) = commands::boot_notification(&ctx.commands, connection, &ctx.config.boot) {
        warn!(device_id = device.device_id.as_str(), error = %e, "BootNotification not sent");
    }
    for connector_id in charge_point.connectors.keys() {
        if let Err(e) = commands::status_notification(
            &ctx.commands,
            connection,
            *connector_id,
            ConnectorStatus::Available,
        ) {
            warn!(
                device_id = device.device_id.as_str(),
                connector_id,
                error = %e,
                "StatusNotification not sent"
            );
        }
    }
    connection.set_heartbeat(heartbeat::spawn(
        ctx.clone(),
        Arc::downgrade(device),
        connection_id,
    ));
}

async fn mark_disconnected(
    ctx: &EngineContext,
    device: &Weak<Device>,
    connection_id: u64,
    reason: Option<String>,
) {
    let Some(device) = device.upgrade() else {
        return;
    };
    {
        let mut state = device.lock().await;
        let Some(connection) = state.connection_for(connection_id) else {
            return;
        };
        connection.mark_disconnected();
    }

    ctx.events.publish(Event::ConnectionClosed(ConnectionClosedEvent {
        device_id: device.device_id.clone(),
        connection_id,
        reason,
        timestamp: Utc::now(),
    }));
}
