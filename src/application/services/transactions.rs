//! Connector / transaction state machine
//!
//! ```text
//! Available/Preparing ──start──► pending (transactionId = None)
//!        ▲                              │ matching CallResult
//!        │                              ▼
//!        └──────stop / override──── Charging
//! ```
//!
//! All functions take the device state already locked, so a start response
//! and a control-plane request for the same device never interleave.

use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use tracing::{info, warn};

use crate::application::commands;
use crate::application::context::EngineContext;
use crate::application::services::meter_simulator;
use crate::application::session::{Device, DeviceState};
use crate::domain::{ConnectorStatus, Transaction};
use crate::notifications::{
    ConnectorStatusChangedEvent, Event, TransactionStartedEvent, TransactionStoppedEvent,
};
use crate::support::errors::{SimResult, SimulatorError};

/// Range of synthesized `meterStart` readings (Wh)
pub const METER_START_RANGE: std::ops::Range<i32> = 1000..5000;

pub fn random_meter_start() -> i32 {
    rand::thread_rng().gen_range(METER_START_RANGE)
}

/// Begin the two-phase start: store an unbound transaction and send
/// StartTransaction. The status stays as it is until the response arrives.
pub fn start(
    ctx: &EngineContext,
    state: &mut DeviceState,
    connector_id: u32,
    id_tag: &str,
    meter_start: i32,
) -> SimResult<()> {
    let DeviceState {
        charge_point,
        connection,
        ..
    } = state;
    let device_id = charge_point.device_id.clone();

    let connector = charge_point.connector_mut(connector_id)?;
    if connector.transaction.is_some() {
        return Err(SimulatorError::TransactionInProgress {
            device_id,
            connector_id,
        });
    }
    let connection = connection
        .as_mut()
        .filter(|c| c.is_connected)
        .ok_or_else(|| SimulatorError::NotConnected(device_id.clone()))?;

    let transaction = Transaction::new(id_tag, meter_start);
    commands::start_transaction(&ctx.commands, connection, connector_id, &transaction)?;
    connector.transaction = Some(transaction);

    info!(
        device_id = device_id.as_str(),
        connector_id,
        id_tag,
        meter_start,
        "Transaction requested, awaiting transactionId"
    );
    Ok(())
}

/// Bind the id from a StartTransaction CallResult and start charging.
pub fn confirm_start(
    ctx: &EngineContext,
    device: &Arc<Device>,
    state: &mut DeviceState,
    connector_id: u32,
    transaction_id: i32,
) {
    let device_id = device.device_id.as_str();
    let Ok(connector) = state.charge_point.connector_mut(connector_id) else {
        warn!(device_id, connector_id, "StartTransaction confirmed for unknown connector");
        return;
    };
    let Some(transaction) = connector.transaction.as_mut() else {
        warn!(
            device_id,
            connector_id,
            transaction_id,
            "StartTransaction confirmed but the connector has no transaction"
        );
        return;
    };
    if !transaction.bind_transaction_id(transaction_id) {
        warn!(
            device_id,
            connector_id,
            transaction_id,
            "Transaction already bound, ignoring second id"
        );
        return;
    }

    let id_tag = transaction.id_tag.clone();
    let meter_start = transaction.meter_start;
    info!(device_id, connector_id, transaction_id, "Transaction started");

    set_status(ctx, device_id, state, connector_id, ConnectorStatus::Charging);
    ctx.events.publish(Event::TransactionStarted(TransactionStartedEvent {
        device_id: device_id.to_string(),
        connector_id,
        transaction_id,
        id_tag,
        meter_start,
        timestamp: Utc::now(),
    }));
    meter_simulator::start(ctx, device, state, connector_id);
}

/// End the session on `connector_id`. Fails without touching anything when
/// the connector holds no confirmed transaction. Returns `meterStop`.
pub fn stop(
    ctx: &EngineContext,
    state: &mut DeviceState,
    connector_id: u32,
) -> SimResult<i32> {
    let device_id = state.charge_point.device_id.clone();
    let connector = state.charge_point.connector(connector_id)?;
    let (transaction_id, meter_stop, id_tag) = match &connector.transaction {
        Some(tx) => match tx.transaction_id {
            Some(id) => (id, tx.meter_stop(), tx.id_tag.clone()),
            None => {
                return Err(SimulatorError::NoActiveTransaction {
                    device_id,
                    connector_id,
                })
            }
        },
        None => {
            return Err(SimulatorError::NoActiveTransaction {
                device_id,
                connector_id,
            })
        }
    };

    match state.connection.as_mut() {
        Some(connection) => {
            if let Err(e) = commands::stop_transaction(
                &ctx.commands,
                connection,
                transaction_id,
                meter_stop,
                &id_tag,
            ) {
                warn!(device_id = device_id.as_str(), error = %e, "StopTransaction not sent");
            }
        }
        None => warn!(
            device_id = device_id.as_str(),
            transaction_id,
            "No connection, StopTransaction not sent"
        ),
    }

    state.stop_meter(connector_id);
    set_status(ctx, &device_id, state, connector_id, ConnectorStatus::Available);
    if let Ok(connector) = state.charge_point.connector_mut(connector_id) {
        connector.transaction = None;
    }

    info!(
        device_id = device_id.as_str(),
        connector_id,
        transaction_id,
        meter_stop,
        "Transaction stopped"
    );
    ctx.events.publish(Event::TransactionStopped(TransactionStoppedEvent {
        device_id,
        connector_id,
        transaction_id: Some(transaction_id),
        meter_stop,
        timestamp: Utc::now(),
    }));
    Ok(meter_stop)
}

/// Stop whichever connector of this device holds `transaction_id`.
pub fn stop_by_transaction_id(
    ctx: &EngineContext,
    state: &mut DeviceState,
    transaction_id: i32,
) -> Option<i32> {
    let Some(connector_id) = state.charge_point.find_transaction(transaction_id) else {
        info!(
            device_id = state.charge_point.device_id.as_str(),
            transaction_id,
            "Transaction not found"
        );
        return None;
    };
    stop(ctx, state, connector_id).ok()
}

/// Status change requested by the control plane.
///
/// `Charging` on an idle connector starts a local session instead.
/// `Available` on a connector with a transaction drops the transaction
/// without a StopTransaction.
pub fn change_status(
    ctx: &EngineContext,
    device: &Arc<Device>,
    state: &mut DeviceState,
    connector_id: u32,
    status: ConnectorStatus,
) -> SimResult<()> {
    let connector = state.charge_point.connector(connector_id)?;
    let has_transaction = connector.transaction.is_some();

    if status == ConnectorStatus::Charging && !has_transaction {
        let id_tag = ctx.config.default_id_tag.clone();
        return start(ctx, state, connector_id, &id_tag, random_meter_start());
    }

    if status == ConnectorStatus::Available && has_transaction {
        state.stop_meter(connector_id);
        if let Ok(connector) = state.charge_point.connector_mut(connector_id) {
            let cleared = connector.transaction.take();
            warn!(
                device_id = device.device_id.as_str(),
                connector_id,
                transaction_id = ?cleared.as_ref().and_then(|tx| tx.transaction_id),
                "Transaction cleared by manual override"
            );
            ctx.events.publish(Event::TransactionStopped(TransactionStoppedEvent {
                device_id: device.device_id.clone(),
                connector_id,
                transaction_id: cleared.as_ref().and_then(|tx| tx.transaction_id),
                meter_stop: cleared.as_ref().map_or(0, |tx| tx.meter_stop()),
                timestamp: Utc::now(),
            }));
        }
    }

    set_status(ctx, &device.device_id, state, connector_id, status);

    let metering = state
        .charge_point
        .connector(connector_id)
        .map_or(false, |c| c.is_metering());
    if metering && !state.meter_tasks.get(&connector_id).map_or(false, |h| !h.is_finished()) {
        meter_simulator::start(ctx, device, state, connector_id);
    }
    Ok(())
}

/// Set the status and report it. A missing connection only skips the report.
fn set_status(
    ctx: &EngineContext,
    device_id: &str,
    state: &mut DeviceState,
    connector_id: u32,
    status: ConnectorStatus,
) {
    let Ok(connector) = state.charge_point.connector_mut(connector_id) else {
        return;
    };
    let old_status = std::mem::replace(&mut connector.status, status);

    match state.connection.as_mut().filter(|c| c.is_connected) {
        Some(connection) => {
            if let Err(e) =
                commands::status_notification(&ctx.commands, connection, connector_id, status)
            {
                warn!(device_id, connector_id, error = %e, "StatusNotification not sent");
            }
        }
        None => warn!(
            device_id,
            connector_id,
            %status,
            "Not connected, StatusNotification not sent"
        ),
    }

    if old_status != status {
        ctx.events
            .publish(Event::ConnectorStatusChanged(ConnectorStatusChangedEvent {
                device_id: device_id.to_string(),
                connector_id,
                old_status,
                new_status: status,
                timestamp: Utc::now(),
            }));
    }
}
