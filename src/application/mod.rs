// Application layer - Coordinator, arbitration and telemetry sources
pub mod command_dispatcher;
pub mod coordinator;
pub mod device_bridge;
pub mod freshness_gate;
pub mod log_sink;
pub mod mode_arbiter;
pub mod ramp_engine;
pub mod scheduler;
pub mod sources;
