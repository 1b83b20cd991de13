//! Meter simulator
//!
//! One periodic task per (device, connector) while the connector is charging.
//! Each tick adds `power_kw * period / 3600 * 1000` Wh to the register and
//! reports SoC (DC only), energy, voltage and current as MeterValues.
//!
//! The task checks the connector on every tick and ends itself once the
//! connector stops charging or loses its transaction, so a stop that races
//! a tick needs no extra signalling.

use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::application::commands;
use crate::application::context::EngineContext;
use crate::application::session::{Device, DeviceState};
use crate::domain::ocpp::messages::SampledValue;
use crate::domain::ConnectorType;
use crate::notifications::{Event, MeterValuesSentEvent};

/// Nominal battery used for DC state of charge (kWh)
pub const BATTERY_CAPACITY_KWH: f64 = 50.0;
pub const INITIAL_SOC_PERCENT: f64 = 20.0;
pub const MAX_SOC_PERCENT: f64 = 95.0;

/// Energy delivered at `power_kw` over `period` (Wh).
pub fn energy_increment_wh(power_kw: f64, period: Duration) -> f64 {
    power_kw * period.as_secs_f64() / 3600.0 * 1000.0
}

/// SoC after `energy_wh` was delivered into the nominal battery, in whole percent.
pub fn state_of_charge(energy_wh: f64) -> u32 {
    let consumed_kwh = (energy_wh / 1000.0).max(0.0);
    let soc = INITIAL_SOC_PERCENT + consumed_kwh / BATTERY_CAPACITY_KWH * 100.0;
    soc.min(MAX_SOC_PERCENT) as u32
}

/// `power_kw * 1000 / voltage`, rounded to whole amperes.
pub fn current_amps(power_kw: f64, voltage: u32) -> i64 {
    (power_kw * 1000.0 / voltage as f64).round() as i64
}

/// One tick's readings
#[derive(Debug, Clone, PartialEq)]
pub struct MeterSample {
    /// Register value after this tick (Wh, unrounded)
    pub energy_wh: f64,
    pub soc: Option<u32>,
    pub voltage: u32,
    pub current: i64,
}

impl MeterSample {
    pub fn next(
        power_kw: f64,
        connector_type: ConnectorType,
        meter_start: i32,
        current_value_wh: f64,
        period: Duration,
    ) -> Self {
        let energy_wh = current_value_wh + energy_increment_wh(power_kw, period);
        let voltage = connector_type.nominal_voltage();
        let soc = match connector_type {
            ConnectorType::DC => Some(state_of_charge(energy_wh - meter_start as f64)),
            ConnectorType::AC => None,
        };

        Self {
            energy_wh,
            soc,
            voltage,
            current: current_amps(power_kw, voltage),
        }
    }

    pub fn energy_register(&self) -> i64 {
        self.energy_wh.round() as i64
    }

    pub fn sampled_values(&self) -> Vec<SampledValue> {
        let mut values = Vec::with_capacity(4);
        if let Some(soc) = self.soc {
            values.push(SampledValue::periodic(SampledValue::SOC, soc as i64, "Percent"));
        }
        values.push(SampledValue::periodic(
            SampledValue::ENERGY_ACTIVE_IMPORT_REGISTER,
            self.energy_register(),
            "Wh",
        ));
        values.push(SampledValue::periodic(
            SampledValue::VOLTAGE,
            self.voltage as i64,
            "V",
        ));
        values.push(SampledValue::periodic(
            SampledValue::CURRENT_IMPORT,
            self.current,
            "A",
        ));
        values
    }
}

/// Start (or restart) the simulator for `connector_id`.
pub fn start(
    ctx: &EngineContext,
    device: &Arc<Device>,
    state: &mut DeviceState,
    connector_id: u32,
) {
    info!(device_id = device.device_id.as_str(), connector_id, "Meter simulator started");
    let handle = tokio::spawn(run(ctx.clone(), Arc::downgrade(device), connector_id));
    state.set_meter_task(connector_id, handle);
}

async fn run(ctx: EngineContext, device: Weak<Device>, connector_id: u32) {
    let period = ctx.config.meter_values_interval;
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let Some(device) = device.upgrade() else {
            break;
        };
        if !tick(&ctx, &device, connector_id, period).await {
            debug!(
                device_id = device.device_id.as_str(),
                connector_id,
                "Connector no longer charging, meter simulator stopped"
            );
            break;
        }
    }
}

/// Returns `false` once the connector is no longer metering.
async fn tick(ctx: &EngineContext, device: &Device, connector_id: u32, period: Duration) -> bool {
    let mut state = device.lock().await;
    let DeviceState {
        charge_point,
        connection,
        ..
    } = &mut *state;

    let Ok(connector) = charge_point.connector_mut(connector_id) else {
        return false;
    };
    if !connector.is_metering() {
        return false;
    }
    let (power_kw, connector_type) = (connector.power_kw, connector.connector_type);
    let Some(transaction) = connector.transaction.as_mut() else {
        return false;
    };
    let Some(transaction_id) = transaction.transaction_id else {
        return false;
    };

    let sample = MeterSample::next(
        power_kw,
        connector_type,
        transaction.meter_start,
        transaction.current_meter_value(),
        period,
    );
    transaction.record_meter_value(sample.energy_wh);

    let Some(connection) = connection.as_mut() else {
        debug!(
            device_id = device.device_id.as_str(),
            connector_id,
            "No connection, sample not sent"
        );
        return true;
    };
    match commands::meter_values(
        &ctx.commands,
        connection,
        connector_id,
        transaction_id,
        sample.sampled_values(),
    ) {
        Ok(_) => ctx.events.publish(Event::MeterValuesSent(MeterValuesSentEvent {
            device_id: device.device_id.clone(),
            connector_id,
            transaction_id,
            energy_wh: sample.energy_register(),
            soc: sample.soc,
            timestamp: Utc::now(),
        })),
        Err(e) => warn!(
            device_id = device.device_id.as_str(),
            connector_id,
            error = %e,
            "MeterValues not sent"
        ),
    }
    true
}
