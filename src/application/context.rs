//! Shared handles every engine component works with

use std::sync::Arc;

use crate::application::commands::{create_command_sender, SharedCommandSender};
use crate::application::session::MessageLog;
use crate::config::SimulatorConfig;
use crate::notifications::{create_event_bus, SharedEventBus};

#[derive(Clone)]
pub struct EngineContext {
    pub commands: SharedCommandSender,
    pub events: SharedEventBus,
    pub config: Arc<SimulatorConfig>,
    pub message_log: Arc<MessageLog>,
}

impl EngineContext {
    pub fn new(config: SimulatorConfig) -> Self {
        let message_log = Arc::new(MessageLog::new());
        Self {
            commands: create_command_sender(message_log.clone()),
            events: create_event_bus(),
            config: Arc::new(config),
            message_log,
        }
    }
}
