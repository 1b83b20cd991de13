//! Device registry: every simulated charge point and the operations the
//! control plane may request on them

use std::sync::{Arc, RwLock};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::application::commands::CommandSender;
use crate::application::connection_manager::ConnectionManager;
use crate::application::context::EngineContext;
use crate::application::services::transactions;
use crate::domain::{Action, ChargePoint, ConnectorSpec, ConnectorStatus};
use crate::interfaces::ws::Transport;
use crate::notifications::EventSubscriber;
use crate::support::errors::{SimResult, SimulatorError};
use crate::support::ocpp_frame::OcppFrame;

use super::device::{ChargePointSnapshot, Device};
use super::message_log::MessageLogEntry;

/// Charge point and connector the operator is looking at
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub device_id: String,
    pub connector_id: u32,
}

/// Thread-safe registry of simulated charge points
pub struct DeviceRegistry {
    devices: DashMap<String, Arc<Device>>,
    ctx: EngineContext,
    connections: ConnectionManager,
    selection: RwLock<Option<Selection>>,
}

/// Shared, reference-counted device registry
pub type SharedDeviceRegistry = Arc<DeviceRegistry>;

impl DeviceRegistry {
    pub fn new(ctx: EngineContext, transport: Arc<dyn Transport>) -> Self {
        Self {
            devices: DashMap::new(),
            connections: ConnectionManager::new(ctx.clone(), transport),
            ctx,
            selection: RwLock::new(None),
        }
    }

    /// Wrap in `Arc` for shared ownership
    pub fn shared(ctx: EngineContext, transport: Arc<dyn Transport>) -> SharedDeviceRegistry {
        Arc::new(Self::new(ctx, transport))
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    pub fn device(&self, device_id: &str) -> SimResult<Arc<Device>> {
        self.devices
            .get(device_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| SimulatorError::DeviceNotFound(device_id.to_string()))
    }

    // ── Charge points ──────────────────────────────────────────

    pub fn create_charge_point(
        &self,
        device_id: &str,
        connectors: &[ConnectorSpec],
    ) -> SimResult<()> {
        if device_id.trim().is_empty() {
            return Err(SimulatorError::Config("device_id must not be empty".into()));
        }
        let charge_point = ChargePoint::new(device_id, connectors)?;

        match self.devices.entry(device_id.to_string()) {
            Entry::Occupied(_) => Err(SimulatorError::DeviceExists(device_id.to_string())),
            Entry::Vacant(slot) => {
                info!(device_id, connectors = connectors.len(), "Charge point created");
                slot.insert(Arc::new(Device::new(charge_point)));
                Ok(())
            }
        }
    }

    /// Remove a charge point, closing its connection and stopping its tasks.
    pub async fn delete_charge_point(&self, device_id: &str) -> SimResult<()> {
        let (_, device) = self
            .devices
            .remove(device_id)
            .ok_or_else(|| SimulatorError::DeviceNotFound(device_id.to_string()))?;

        self.connections.disconnect(&device).await;
        device.lock().await.shutdown();

        let mut selection = self.selection.write().unwrap_or_else(|e| e.into_inner());
        if selection.as_ref().map_or(false, |s| s.device_id == device_id) {
            *selection = None;
        }

        info!(device_id, "Charge point deleted");
        Ok(())
    }

    /// Snapshots of every charge point, ordered by device id.
    pub async fn list_charge_points(&self) -> Vec<ChargePointSnapshot> {
        let devices: Vec<Arc<Device>> = self.devices.iter().map(|e| e.value().clone()).collect();
        let mut snapshots = Vec::with_capacity(devices.len());
        for device in devices {
            snapshots.push(device.snapshot().await);
        }
        snapshots.sort_by(|a, b| a.device_id.cmp(&b.device_id));
        snapshots
    }

    pub async fn charge_point(&self, device_id: &str) -> SimResult<ChargePointSnapshot> {
        Ok(self.device(device_id)?.snapshot().await)
    }

    pub fn device_ids(&self) -> Vec<String> {
        self.devices.iter().map(|e| e.key().clone()).collect()
    }

    pub fn count(&self) -> usize {
        self.devices.len()
    }

    // ── Selection ──────────────────────────────────────────────

    pub async fn select(&self, device_id: &str, connector_id: u32) -> SimResult<()> {
        let device = self.device(device_id)?;
        device.lock().await.charge_point.connector(connector_id)?;

        *self.selection.write().unwrap_or_else(|e| e.into_inner()) = Some(Selection {
            device_id: device_id.to_string(),
            connector_id,
        });
        Ok(())
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    // ── Connections ────────────────────────────────────────────

    /// Open (or reopen) the transport of `device_id`. Returns once the
    /// attempt is underway; the outcome is reported through events.
    pub async fn connect(&self, device_id: &str) -> SimResult<()> {
        let device = self.device(device_id)?;
        self.connections.connect(&device).await;
        Ok(())
    }

    /// Idempotent.
    pub async fn disconnect(&self, device_id: &str) -> SimResult<()> {
        let device = self.device(device_id)?;
        self.connections.disconnect(&device).await;
        Ok(())
    }

    pub async fn is_connected(&self, device_id: &str) -> SimResult<bool> {
        Ok(self.device(device_id)?.lock().await.is_connected())
    }

    // ── Connector control ──────────────────────────────────────

    /// Manual status change; `status` is matched case-insensitively.
    pub async fn change_status(
        &self,
        device_id: &str,
        connector_id: u32,
        status: &str,
    ) -> SimResult<()> {
        let status: ConnectorStatus = status.parse()?;
        let device = self.device(device_id)?;
        let mut state = device.lock().await;
        transactions::change_status(&self.ctx, &device, &mut state, connector_id, status)
    }

    /// Start a session locally. `id_tag` defaults to the configured tag.
    pub async fn start_charging(
        &self,
        device_id: &str,
        connector_id: u32,
        id_tag: Option<&str>,
    ) -> SimResult<()> {
        let device = self.device(device_id)?;
        let id_tag = id_tag.unwrap_or(&self.ctx.config.default_id_tag);
        let mut state = device.lock().await;
        transactions::start(
            &self.ctx,
            &mut state,
            connector_id,
            id_tag,
            transactions::random_meter_start(),
        )
    }

    /// Stop the session on a connector. Returns `meterStop`.
    pub async fn stop_charging(&self, device_id: &str, connector_id: u32) -> SimResult<i32> {
        let device = self.device(device_id)?;
        let mut state = device.lock().await;
        transactions::stop(&self.ctx, &mut state, connector_id)
    }

    // ── Protocol ───────────────────────────────────────────────

    /// Send a CALL as `device_id`. Fails if the device is not connected.
    pub async fn send(&self, device_id: &str, action: Action, payload: Value) -> SimResult<String> {
        let device = self.device(device_id)?;
        let mut state = device.lock().await;
        let connection = state
            .connection
            .as_mut()
            .ok_or_else(|| SimulatorError::NotConnected(device_id.to_string()))?;
        self.commands().send_call(connection, action, payload)
    }

    /// Feed a raw frame to `device_id` as if it arrived on its transport.
    pub async fn receive(&self, device_id: &str, raw: &str) -> SimResult<Option<OcppFrame>> {
        let device = self.device(device_id)?;
        Ok(self.connections.handler().handle(&device, raw).await)
    }

    pub fn commands(&self) -> &CommandSender {
        &self.ctx.commands
    }

    // ── Observability ──────────────────────────────────────────

    /// Last logged frames, most recent first.
    pub fn messages(&self) -> Vec<MessageLogEntry> {
        self.ctx.message_log.entries()
    }

    pub fn clear_messages(&self) {
        self.ctx.message_log.clear();
    }

    pub fn subscribe(&self) -> EventSubscriber {
        self.ctx.events.subscribe()
    }

    /// Disconnect and drop every charge point.
    pub async fn shutdown(&self) {
        for device_id in self.device_ids() {
            let _ = self.delete_charge_point(&device_id).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use serde_json::json;

    use crate::application::testing::{test_config, MockLink, MockTransport};
    use crate::config::SimulatorConfig;
    use crate::domain::ConnectorType;

    fn registry_with(
        config: SimulatorConfig,
    ) -> (
        SharedDeviceRegistry,
        Arc<MockTransport>,
        tokio::sync::mpsc::UnboundedReceiver<MockLink>,
    ) {
        let (transport, links) = MockTransport::new();
        let registry = DeviceRegistry::shared(EngineContext::new(config), transport.clone());
        (registry, transport, links)
    }

    fn ac(id: u32) -> ConnectorSpec {
        ConnectorSpec::new(id, 22.0, ConnectorType::AC)
    }

    /// Connect and consume BootNotification plus one StatusNotification per connector.
    async fn connect(
        registry: &DeviceRegistry,
        links: &mut tokio::sync::mpsc::UnboundedReceiver<MockLink>,
        device_id: &str,
        connectors: usize,
    ) -> MockLink {
        registry.connect(device_id).await.unwrap();
        let mut link = links.recv().await.expect("transport opened");
        link.expect_call("BootNotification").await;
        for _ in 0..connectors {
            let (_, payload) = link.expect_call("StatusNotification").await;
            assert_eq!(payload["status"], "Available");
        }
        link
    }

    /// Start a session with a fixed meterStart and confirm it with `transaction_id`.
    async fn charging(
        registry: &DeviceRegistry,
        link: &mut MockLink,
        device_id: &str,
        transaction_id: i32,
    ) {
        {
            let device = registry.device(device_id).unwrap();
            let mut state = device.lock().await;
            transactions::start(registry.context(), &mut state, 1, "ABC", 1000).unwrap();
        }
        let (message_id, payload) = link.expect_call("StartTransaction").await;
        assert_eq!(payload["meterStart"], 1000);
        link.push(json!([
            3,
            message_id,
            {"transactionId": transaction_id, "idTagInfo": {"status": "Accepted"}}
        ]));
        let (_, payload) = link.expect_call("StatusNotification").await;
        assert_eq!(payload["status"], "Charging");
    }

    #[tokio::test]
    async fn create_and_delete() {
        let (registry, _transport, _links) = registry_with(test_config());
        registry.create_charge_point("CP001", &[ac(1), ac(2)]).unwrap();

        assert!(matches!(
            registry.create_charge_point("CP001", &[ac(1)]),
            Err(SimulatorError::DeviceExists(_))
        ));
        assert!(matches!(
            registry.create_charge_point("CP002", &[ConnectorSpec::new(1, 0.0, ConnectorType::AC)]),
            Err(SimulatorError::InvalidConnector(_))
        ));

        let listed = registry.list_charge_points().await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].connectors.len(), 2);

        registry.delete_charge_point("CP001").await.unwrap();
        assert!(registry.list_charge_points().await.is_empty());
        assert!(matches!(
            registry.delete_charge_point("CP001").await,
            Err(SimulatorError::DeviceNotFound(_))
        ));
    }

    #[tokio::test]
    async fn selection_requires_known_connector() {
        let (registry, _transport, _links) = registry_with(test_config());
        registry.create_charge_point("CP001", &[ac(1)]).unwrap();

        assert!(matches!(
            registry.select("CP001", 3).await,
            Err(SimulatorError::ConnectorNotFound { connector_id: 3, .. })
        ));
        registry.select("CP001", 1).await.unwrap();
        assert_eq!(
            registry.selection(),
            Some(Selection {
                device_id: "CP001".into(),
                connector_id: 1
            })
        );

        registry.delete_charge_point("CP001").await.unwrap();
        assert!(registry.selection().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn connect_sends_boot_sequence_and_heartbeats() {
        let (registry, _transport, mut links) = registry_with(test_config());
        registry.create_charge_point("CP001", &[ac(1), ac(2)]).unwrap();

        let mut link = connect(&registry, &mut links, "CP001", 2).await;
        assert_eq!(link.device_id, "CP001");
        assert!(registry.is_connected("CP001").await.unwrap());

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(link.drain_actions(), vec!["Heartbeat", "Heartbeat"]);
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_leaves_one_connection_and_one_heartbeat() {
        let (registry, _transport, mut links) = registry_with(test_config());
        registry.create_charge_point("CP001", &[ac(1)]).unwrap();

        let mut first = connect(&registry, &mut links, "CP001", 1).await;
        let mut second = connect(&registry, &mut links, "CP001", 1).await;

        // The first transport was closed by the reconnect
        assert!(first.next_frame().await.is_none());

        tokio::time::sleep(Duration::from_secs(95)).await;
        assert_eq!(second.drain_actions(), vec!["Heartbeat"; 3]);
        assert!(registry.is_connected("CP001").await.unwrap());

        let device = registry.device("CP001").unwrap();
        let state = device.lock().await;
        assert!(state.connection.as_ref().unwrap().has_heartbeat());
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_is_idempotent_and_stops_heartbeat() {
        let (registry, _transport, mut links) = registry_with(test_config());
        registry.create_charge_point("CP001", &[ac(1)]).unwrap();
        let mut link = connect(&registry, &mut links, "CP001", 1).await;

        registry.disconnect("CP001").await.unwrap();
        registry.disconnect("CP001").await.unwrap();
        assert!(!registry.is_connected("CP001").await.unwrap());

        tokio::time::sleep(Duration::from_secs(90)).await;
        assert!(link.next_frame().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn peer_close_marks_disconnected() {
        let (registry, _transport, mut links) = registry_with(test_config());
        registry.create_charge_point("CP001", &[ac(1)]).unwrap();
        let mut link = connect(&registry, &mut links, "CP001", 1).await;

        link.close();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!registry.is_connected("CP001").await.unwrap());

        tokio::time::sleep(Duration::from_secs(90)).await;
        assert!(link.drain_actions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_connect_is_reported_not_retried() {
        let (registry, transport, mut links) = registry_with(test_config());
        registry.create_charge_point("CP001", &[ac(1)]).unwrap();
        transport.refuse_connections(true);

        let mut events = registry.subscribe();
        registry.connect("CP001").await.unwrap();

        let event = events.recv().await.unwrap();
        assert_eq!(event.event_type(), "connection_closed");
        assert!(!registry.is_connected("CP001").await.unwrap());

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(links.try_recv().is_err());
        assert_eq!(transport.open_attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn start_waits_for_matching_call_result() {
        let (registry, _transport, mut links) = registry_with(test_config());
        registry.create_charge_point("CP001", &[ac(1)]).unwrap();
        let mut link = connect(&registry, &mut links, "CP001", 1).await;

        registry.start_charging("CP001", 1, Some("ABC")).await.unwrap();
        let (_, payload) = link.expect_call("StartTransaction").await;
        assert_eq!(payload["connectorId"], 1);
        assert_eq!(payload["idTag"], "ABC");

        let snapshot = registry.charge_point("CP001").await.unwrap();
        assert_eq!(snapshot.connectors[0].status, ConnectorStatus::Available);
        assert!(snapshot.connectors[0].transaction.as_ref().unwrap().transaction_id.is_none());

        // Unrelated result: no transition, pending correlation dropped
        link.push(json!([3, "not-the-start", {"transactionId": 99}]));
        link.push(json!([2, "ping", "Heartbeat", {}]));
        link.expect_result("ping").await;

        let snapshot = registry.charge_point("CP001").await.unwrap();
        assert_eq!(snapshot.connectors[0].status, ConnectorStatus::Available);
        assert!(snapshot.connectors[0].active_transaction_id().is_none());
        let device = registry.device("CP001").unwrap();
        assert!(device.lock().await.connection.as_ref().unwrap().pending_start.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn unanswered_start_stays_pending() {
        let (registry, _transport, mut links) = registry_with(test_config());
        registry.create_charge_point("CP001", &[ac(1)]).unwrap();
        let mut link = connect(&registry, &mut links, "CP001", 1).await;

        registry.start_charging("CP001", 1, None).await.unwrap();
        let (message_id, payload) = link.expect_call("StartTransaction").await;
        assert_eq!(payload["idTag"], "SIMULATOR");

        tokio::time::sleep(Duration::from_secs(600)).await;
        let device = registry.device("CP001").unwrap();
        let state = device.lock().await;
        assert_eq!(
            state.connection.as_ref().unwrap().pending_start.as_ref().unwrap().message_id,
            message_id
        );
        assert_eq!(
            state.charge_point.connector(1).unwrap().status,
            ConnectorStatus::Available
        );
    }

    #[tokio::test(start_paused = true)]
    async fn charging_session_meters_and_stops() {
        let config = SimulatorConfig {
            heartbeat_interval: Duration::from_secs(3600),
            ..test_config()
        };
        let (registry, _transport, mut links) = registry_with(config);
        registry.create_charge_point("CP001", &[ac(1)]).unwrap();
        let mut link = connect(&registry, &mut links, "CP001", 1).await;
        charging(&registry, &mut link, "CP001", 42).await;

        let (_, first) = link.expect_call("MeterValues").await;
        assert_eq!(first["transactionId"], 42);
        assert_eq!(first["meterValue"][0]["sampledValue"][0]["value"], "1183");

        let (_, second) = link.expect_call("MeterValues").await;
        let sampled = &second["meterValue"][0]["sampledValue"];
        assert_eq!(sampled[0]["measurand"], "Energy.Active.Import.Register");
        assert_eq!(sampled[0]["value"], "1367");
        assert_eq!(sampled[1]["value"], "230");
        assert_eq!(sampled[2]["value"], "96");

        let meter_stop = registry.stop_charging("CP001", 1).await.unwrap();
        assert_eq!(meter_stop, 1367);

        let (_, stop) = link.expect_call("StopTransaction").await;
        assert_eq!(stop["transactionId"], 42);
        assert_eq!(stop["meterStop"], 1367);
        assert_eq!(stop["stopReason"], "PowerLoss");
        let (_, status) = link.expect_call("StatusNotification").await;
        assert_eq!(status["status"], "Available");

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(link.drain_actions().is_empty());

        let snapshot = registry.charge_point("CP001").await.unwrap();
        assert!(snapshot.connectors[0].transaction.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn meter_task_ends_itself_after_status_change() {
        let config = SimulatorConfig {
            heartbeat_interval: Duration::from_secs(3600),
            ..test_config()
        };
        let (registry, _transport, mut links) = registry_with(config);
        registry.create_charge_point("CP001", &[ac(1)]).unwrap();
        let mut link = connect(&registry, &mut links, "CP001", 1).await;
        charging(&registry, &mut link, "CP001", 7).await;

        registry.change_status("CP001", 1, "Finishing").await.unwrap();
        let (_, status) = link.expect_call("StatusNotification").await;
        assert_eq!(status["status"], "Finishing");

        tokio::time::sleep(Duration::from_secs(90)).await;
        assert!(link.drain_actions().is_empty());
        let device = registry.device("CP001").unwrap();
        assert_eq!(device.lock().await.running_meters(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn available_override_clears_transaction_without_stop() {
        let config = SimulatorConfig {
            heartbeat_interval: Duration::from_secs(3600),
            ..test_config()
        };
        let (registry, _transport, mut links) = registry_with(config);
        registry.create_charge_point("CP001", &[ac(1)]).unwrap();
        let mut link = connect(&registry, &mut links, "CP001", 1).await;
        charging(&registry, &mut link, "CP001", 7).await;

        registry.change_status("CP001", 1, "available").await.unwrap();
        assert_eq!(link.drain_actions(), vec!["StatusNotification"]);

        let snapshot = registry.charge_point("CP001").await.unwrap();
        assert!(snapshot.connectors[0].transaction.is_none());
        assert_eq!(snapshot.connectors[0].status, ConnectorStatus::Available);
    }

    #[tokio::test]
    async fn invalid_requests_leave_state_untouched() {
        let (registry, _transport, _links) = registry_with(test_config());
        registry.create_charge_point("CP001", &[ac(1)]).unwrap();
        let before = registry.charge_point("CP001").await.unwrap();

        assert!(matches!(
            registry.stop_charging("CP001", 1).await,
            Err(SimulatorError::NoActiveTransaction { connector_id: 1, .. })
        ));
        assert!(matches!(
            registry.change_status("CP001", 1, "Exploded").await,
            Err(SimulatorError::InvalidStatus(_))
        ));
        assert!(matches!(
            registry.change_status("CP001", 9, "Occupied").await,
            Err(SimulatorError::ConnectorNotFound { .. })
        ));
        assert!(matches!(
            registry.start_charging("CP001", 1, None).await,
            Err(SimulatorError::NotConnected(_))
        ));
        assert!(matches!(
            registry.connect("CP404").await,
            Err(SimulatorError::DeviceNotFound(_))
        ));

        let after = registry.charge_point("CP001").await.unwrap();
        assert_eq!(after.connectors[0].status, before.connectors[0].status);
        assert!(after.connectors[0].transaction.is_none());
        assert!(registry.messages().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn remote_start_on_disconnected_device_is_accepted_but_not_started() {
        let (registry, _transport, _links) = registry_with(test_config());
        registry.create_charge_point("CP001", &[ac(1)]).unwrap();

        let reply = registry
            .receive(
                "CP001",
                r#"[2,"rs-1","RemoteStartTransaction",{"connectorId":1,"idTag":"ABC"}]"#,
            )
            .await
            .unwrap();
        assert_eq!(
            reply,
            Some(OcppFrame::CallResult {
                unique_id: "rs-1".into(),
                payload: json!({"status": "Accepted"}),
            })
        );

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(registry
            .messages()
            .iter()
            .all(|entry| entry.action.as_deref() != Some("StartTransaction")));
        let snapshot = registry.charge_point("CP001").await.unwrap();
        assert!(snapshot.connectors[0].transaction.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn remote_start_and_stop_round_trip() {
        let config = SimulatorConfig {
            heartbeat_interval: Duration::from_secs(3600),
            ..test_config()
        };
        let (registry, _transport, mut links) = registry_with(config);
        registry.create_charge_point("CP001", &[ac(1), ac(2)]).unwrap();
        let mut link = connect(&registry, &mut links, "CP001", 2).await;

        link.push(json!([2, "rs-1", "RemoteStartTransaction", {"connectorId": 2, "idTag": "ABC"}]));
        let reply = link.expect_result("rs-1").await;
        assert_eq!(reply["status"], "Accepted");

        let (message_id, start) = link.expect_call("StartTransaction").await;
        assert_eq!(start["connectorId"], 2);
        assert_eq!(start["idTag"], "ABC");
        let meter_start = start["meterStart"].as_i64().unwrap();
        assert!((1000..5000).contains(&meter_start));

        link.push(json!([3, message_id, {"transactionId": 77}]));
        link.expect_call("StatusNotification").await;

        link.push(json!([2, "rst-1", "RemoteStopTransaction", {"transactionId": 77}]));
        let reply = link.expect_result("rst-1").await;
        assert_eq!(reply["status"], "Accepted");

        let (_, stop) = link.expect_call("StopTransaction").await;
        assert_eq!(stop["transactionId"], 77);
        assert!(stop["meterStop"].as_i64().unwrap() >= meter_start);
        let (_, status) = link.expect_call("StatusNotification").await;
        assert_eq!(status["connectorId"], 2);
        assert_eq!(status["status"], "Available");
    }

    #[tokio::test(start_paused = true)]
    async fn remote_stop_for_unknown_transaction_is_a_no_op() {
        let (registry, _transport, mut links) = registry_with(test_config());
        registry.create_charge_point("CP001", &[ac(1)]).unwrap();
        let mut link = connect(&registry, &mut links, "CP001", 1).await;

        link.push(json!([2, "rst-1", "RemoteStopTransaction", {"transactionId": 5}]));
        assert_eq!(link.expect_result("rst-1").await["status"], "Accepted");

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(link.drain_actions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn incomplete_remote_calls_are_still_accepted() {
        let config = SimulatorConfig {
            heartbeat_interval: Duration::from_secs(3600),
            ..test_config()
        };
        let (registry, _transport, mut links) = registry_with(config);
        registry.create_charge_point("CP001", &[ac(1)]).unwrap();
        let mut link = connect(&registry, &mut links, "CP001", 1).await;

        link.push(json!([2, "rs-1", "RemoteStartTransaction", {"connectorId": 1}]));
        assert_eq!(link.expect_result("rs-1").await["status"], "Accepted");
        let (message_id, start) = link.expect_call("StartTransaction").await;
        assert_eq!(start["connectorId"], 1);
        assert_eq!(start["idTag"], "SIMULATOR");
        link.push(json!([3, message_id, {"transactionId": 9}]));
        link.expect_call("StatusNotification").await;

        link.push(json!([2, "rs-2", "RemoteStopTransaction", {}]));
        assert_eq!(link.expect_result("rs-2").await["status"], "Accepted");

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(link.drain_actions().is_empty());
        let snapshot = registry.charge_point("CP001").await.unwrap();
        let tx = snapshot.connectors[0].transaction.as_ref().unwrap();
        assert_eq!(tx.transaction_id, Some(9));
    }

    #[tokio::test(start_paused = true)]
    async fn inbound_calls_are_answered() {
        let (registry, _transport, mut links) = registry_with(test_config());
        registry.create_charge_point("CP001", &[ac(1)]).unwrap();
        let mut link = connect(&registry, &mut links, "CP001", 1).await;

        link.push(json!([2, "hb", "Heartbeat", {}]));
        assert!(link.expect_result("hb").await["currentTime"].is_string());

        link.push(json!([
            2,
            "boot",
            "BootNotification",
            {"chargePointVendor": "X", "chargePointModel": "Y"}
        ]));
        let boot = link.expect_result("boot").await;
        assert_eq!(boot["status"], "Accepted");
        assert_eq!(boot["interval"], 30);

        link.push(json!([2, "rst", "Reset", {"type": "Soft"}]));
        let frame = link.next_frame().await.unwrap();
        assert_eq!(frame[0], 4);
        assert_eq!(frame[1], "rst");
        assert_eq!(frame[2]["errorCode"], "NotImplemented");
        assert!(frame[2]["errorDescription"].as_str().unwrap().contains("Reset"));
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_frames_are_dropped() {
        let (registry, _transport, mut links) = registry_with(test_config());
        registry.create_charge_point("CP001", &[ac(1)]).unwrap();
        let mut link = connect(&registry, &mut links, "CP001", 1).await;

        link.push_raw("this is not json");
        link.push(json!([9, "x", {}]));
        link.push(json!([4, "x", {"errorCode": "InternalError", "errorDescription": "boom"}]));
        link.push(json!([2, "hb", "Heartbeat", {}]));

        link.expect_result("hb").await;
        assert!(registry.is_connected("CP001").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn delete_mid_session_stops_everything() {
        let config = SimulatorConfig {
            heartbeat_interval: Duration::from_secs(3600),
            ..test_config()
        };
        let (registry, _transport, mut links) = registry_with(config);
        registry.create_charge_point("CP001", &[ac(1)]).unwrap();
        let mut link = connect(&registry, &mut links, "CP001", 1).await;
        charging(&registry, &mut link, "CP001", 3).await;

        let device = Arc::downgrade(&registry.device("CP001").unwrap());
        registry.delete_charge_point("CP001").await.unwrap();

        assert!(link.next_frame().await.is_none());
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(device.upgrade().is_none());
        assert!(registry.list_charge_points().await.is_empty());
        assert!(matches!(
            registry.charge_point("CP001").await,
            Err(SimulatorError::DeviceNotFound(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn frames_are_logged_in_both_directions() {
        let (registry, _transport, mut links) = registry_with(test_config());
        registry.create_charge_point("CP001", &[ac(1)]).unwrap();
        let mut link = connect(&registry, &mut links, "CP001", 1).await;

        link.push(json!([2, "hb", "Heartbeat", {}]));
        link.expect_result("hb").await;

        let messages = registry.messages();
        // Boot, status, inbound heartbeat, reply
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].message[0], 3);
        assert_eq!(messages[1].action.as_deref(), Some("Heartbeat"));
        assert_eq!(messages[3].action.as_deref(), Some("BootNotification"));
        assert!(messages.iter().all(|m| m.device_id == "CP001"));

        registry.clear_messages();
        assert!(registry.messages().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn send_requires_connection() {
        let (registry, _transport, mut links) = registry_with(test_config());
        registry.create_charge_point("CP001", &[ac(1)]).unwrap();

        assert!(matches!(
            registry.send("CP001", Action::Heartbeat, json!({})).await,
            Err(SimulatorError::NotConnected(_))
        ));

        let mut link = connect(&registry, &mut links, "CP001", 1).await;
        let id = registry.send("CP001", Action::Heartbeat, json!({})).await.unwrap();
        let frame = link.next_frame().await.unwrap();
        assert_eq!(frame[1], id.as_str());
    }
}
