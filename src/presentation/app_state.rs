// Application state for HTTP handlers
use crate::application::coordinator::CoordinatorHandle;
use crate::application::sources::push_listener::PushChannel;
use crate::infrastructure::device_log::DeviceLog;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub coordinator: CoordinatorHandle,
    pub push_channel: PushChannel,
    pub device_log: Arc<DeviceLog>,
}
