// Domain layer - Telemetry samples, output modes, connection state and history buffers
pub mod connection;
pub mod metrics;
pub mod output_mode;
pub mod ring_buffer;
pub mod telemetry;
