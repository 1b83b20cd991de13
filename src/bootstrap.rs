//! Reusable simulator bootstrap
//!
//! Wires the engine from an [`AppConfig`]: WebSocket transport, device
//! registry, the charge points listed in the config file and their
//! initial connections. Used by the CLI runner and by embedding hosts.

use std::sync::Arc;

use tracing::info;

use crate::application::context::EngineContext;
use crate::application::session::{DeviceRegistry, SharedDeviceRegistry};
use crate::config::AppConfig;
use crate::interfaces::ws::{Transport, WsTransport};
use crate::support::errors::SimResult;

/// Initialize tracing (logging) from the application config.
///
/// `RUST_LOG` takes precedence over `logging.level`. Call once at startup.
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    match config.logging.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
}

/// A running simulator
pub struct SimulatorHandle {
    pub registry: SharedDeviceRegistry,
}

impl SimulatorHandle {
    /// Build the engine over the WebSocket transport and bring up the
    /// configured charge points.
    pub async fn start(config: &AppConfig) -> SimResult<Self> {
        let transport = Arc::new(WsTransport::new(config.server.url.clone()));
        Self::start_with_transport(config, transport).await
    }

    pub async fn start_with_transport(
        config: &AppConfig,
        transport: Arc<dyn Transport>,
    ) -> SimResult<Self> {
        config.validate()?;
        let ctx = EngineContext::new(config.simulator_config());
        let registry = DeviceRegistry::shared(ctx, transport);

        for cp in &config.charge_points {
            registry.create_charge_point(&cp.device_id, &cp.connectors)?;
            if cp.connect_on_start {
                registry.connect(&cp.device_id).await?;
            }
        }

        info!(
            server_url = config.server.url.as_str(),
            charge_points = registry.count(),
            "Simulator started"
        );
        Ok(Self { registry })
    }

    /// Disconnect every charge point and stop all tasks.
    pub async fn shutdown(&self) {
        let count = self.registry.count();
        self.registry.shutdown().await;
        info!(charge_points = count, "Simulator stopped");
    }
}
