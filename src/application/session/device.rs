//! One simulated charge point and everything that runs on its behalf

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;

use crate::domain::{ChargePoint, Connector};

use super::connection::Connection;

/// Mutable state of a device. Every change goes through the device lock.
#[derive(Debug)]
pub struct DeviceState {
    pub charge_point: ChargePoint,
    pub connection: Option<Connection>,
    /// Meter simulator task per connector
    pub meter_tasks: HashMap<u32, JoinHandle<()>>,
}

impl DeviceState {
    pub fn is_connected(&self) -> bool {
        self.connection.as_ref().map_or(false, |c| c.is_connected)
    }

    /// The current connection, provided it is still attempt `connection_id`.
    pub fn connection_for(&mut self, connection_id: u64) -> Option<&mut Connection> {
        self.connection
            .as_mut()
            .filter(|c| c.connection_id == connection_id)
    }

    pub fn set_meter_task(&mut self, connector_id: u32, handle: JoinHandle<()>) {
        if let Some(previous) = self.meter_tasks.insert(connector_id, handle) {
            previous.abort();
        }
    }

    pub fn stop_meter(&mut self, connector_id: u32) {
        if let Some(handle) = self.meter_tasks.remove(&connector_id) {
            handle.abort();
        }
    }

    pub fn stop_all_meters(&mut self) {
        for (_, handle) in self.meter_tasks.drain() {
            handle.abort();
        }
    }

    pub fn running_meters(&self) -> usize {
        self.meter_tasks.values().filter(|h| !h.is_finished()).count()
    }

    /// Stop every task and close the transport.
    pub fn shutdown(&mut self) {
        self.stop_all_meters();
        if let Some(mut connection) = self.connection.take() {
            connection.teardown();
        }
    }
}

pub struct Device {
    pub device_id: String,
    state: Mutex<DeviceState>,
}

impl Device {
    pub fn new(charge_point: ChargePoint) -> Self {
        Self {
            device_id: charge_point.device_id.clone(),
            state: Mutex::new(DeviceState {
                charge_point,
                connection: None,
                meter_tasks: HashMap::new(),
            }),
        }
    }

    pub async fn lock(&self) -> MutexGuard<'_, DeviceState> {
        self.state.lock().await
    }

    pub async fn snapshot(&self) -> ChargePointSnapshot {
        let state = self.lock().await;
        ChargePointSnapshot {
            device_id: self.device_id.clone(),
            is_connected: state.is_connected(),
            connectors: state.charge_point.connectors.values().cloned().collect(),
        }
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        self.state.get_mut().stop_all_meters();
    }
}

/// Point-in-time view handed to the control plane
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargePointSnapshot {
    pub device_id: String,
    pub is_connected: bool,
    pub connectors: Vec<Connector>,
}
