// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod device_log;
pub mod http_bridge;
