// Command dispatcher - Fire-and-forget writes to the device bridge
use crate::application::device_bridge::{DeviceBridge, SetpointCommand};
use std::sync::Arc;

#[derive(Clone)]
pub struct CommandDispatcher {
    bridge: Arc<dyn DeviceBridge>,
}

impl CommandDispatcher {
    pub fn new(bridge: Arc<dyn DeviceBridge>) -> Self {
        Self { bridge }
    }

    pub fn send_setpoint(&self, command: SetpointCommand) {
        if command.is_empty() {
            return;
        }
        let bridge = self.bridge.clone();
        tokio::spawn(async move {
            if let Err(e) = bridge.set(command).await {
                tracing::debug!("Setpoint push failed (ignored): {:#}", e);
            }
        });
    }

    pub fn toggle_output(&self, on: bool) {
        let bridge = self.bridge.clone();
        tokio::spawn(async move {
            if let Err(e) = bridge.toggle(on).await {
                tracing::debug!("Output toggle failed (ignored): {:#}", e);
            }
        });
    }

    pub fn request_feedback(&self) {
        let bridge = self.bridge.clone();
        tokio::spawn(async move {
            if let Err(e) = bridge.feedback().await {
                tracing::debug!("Feedback request failed (ignored): {:#}", e);
            }
        });
    }
}
