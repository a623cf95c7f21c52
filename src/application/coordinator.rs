// Telemetry coordinator - Composition root and single writer of telemetry state
//
// The coordinator runs as one task and handles one event at a time: timer
// ticks, device payloads, connection changes, operator commands and queries.
use crate::application::command_dispatcher::CommandDispatcher;
use crate::application::device_bridge::{DeviceBridge, SetpointCommand};
use crate::application::freshness_gate::{DEFAULT_FRESHNESS_WINDOW, FreshnessGate};
use crate::application::log_sink::LogSink;
use crate::application::mode_arbiter::{ModeArbiter, ModeConflict};
use crate::application::ramp_engine::{RampEngine, RampStep};
use crate::application::scheduler::{Scheduler, TimerHandle};
use crate::application::sources::payload::decode_payload;
use crate::application::sources::poller::Poller;
use crate::application::sources::push_listener::{PushChannel, PushListener};
use crate::application::sources::simulator::Simulator;
use crate::application::sources::{Arrival, Ingress};
use crate::domain::connection::{ConnectionPhase, ConnectionReport, Transport};
use crate::domain::metrics::{
    Channel, ChannelHistory, DisplayedMetrics, HistorySnapshot, ModeFlags, TelemetrySnapshot,
    TimerStatus,
};
use crate::domain::output_mode::{InvalidSetpoint, ModeKind, OutputMode, Setpoint};
use crate::domain::telemetry::{LastKnown, Origin, Sample};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

const EVENT_QUEUE_DEPTH: usize = 256;

#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    pub history_depth: usize,
    pub freshness_window: Duration,
    pub simulator_interval: Duration,
    pub poll_interval: Duration,
    pub ramp_steps: u32,
    pub ramp_step_interval: Duration,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            history_depth: 60,
            freshness_window: DEFAULT_FRESHNESS_WINDOW,
            simulator_interval: Duration::from_secs(1),
            poll_interval: Duration::from_secs(2),
            ramp_steps: 12,
            ramp_step_interval: Duration::from_millis(60),
        }
    }
}

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    ModeConflict(#[from] ModeConflict),
    #[error(transparent)]
    InvalidSetpoint(#[from] InvalidSetpoint),
    #[error("telemetry coordinator is not running")]
    Stopped,
}

/// Operator commands.
#[derive(Debug)]
pub enum Command {
    StartMode {
        mode: OutputMode,
        reply: oneshot::Sender<Result<(), ModeConflict>>,
    },
    StopMode {
        reply: oneshot::Sender<OutputMode>,
    },
    UpdateSetpoint {
        voltage: Option<f64>,
        current: Option<f64>,
        reply: oneshot::Sender<Result<Option<Setpoint>, InvalidSetpoint>>,
    },
    SetOutput {
        on: bool,
    },
    RequestFeedback,
}

#[derive(Debug)]
pub enum CoordinatorEvent {
    Connection(ConnectionReport),
    SimulatorTick,
    Telemetry(Arrival),
    RampStep(RampStep),
    Command(Command),
    Snapshot(oneshot::Sender<TelemetrySnapshot>),
    History(oneshot::Sender<HistorySnapshot>),
    Shutdown,
}

impl From<Arrival> for CoordinatorEvent {
    fn from(arrival: Arrival) -> Self {
        CoordinatorEvent::Telemetry(arrival)
    }
}

impl From<RampStep> for CoordinatorEvent {
    fn from(step: RampStep) -> Self {
        CoordinatorEvent::RampStep(step)
    }
}

/// Cloneable front door to a running coordinator.
#[derive(Clone)]
pub struct CoordinatorHandle {
    events: mpsc::Sender<CoordinatorEvent>,
}

impl CoordinatorHandle {
    async fn send(&self, event: CoordinatorEvent) -> Result<(), CoordinatorError> {
        self.events
            .send(event)
            .await
            .map_err(|_| CoordinatorError::Stopped)
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> CoordinatorEvent,
    ) -> Result<T, CoordinatorError> {
        let (tx, rx) = oneshot::channel();
        self.send(make(tx)).await?;
        rx.await.map_err(|_| CoordinatorError::Stopped)
    }

    pub async fn report_connection(&self, report: ConnectionReport) -> Result<(), CoordinatorError> {
        self.send(CoordinatorEvent::Connection(report)).await
    }

    pub async fn start_mode(&self, mode: OutputMode) -> Result<(), CoordinatorError> {
        Ok(self
            .request(|reply| CoordinatorEvent::Command(Command::StartMode { mode, reply }))
            .await??)
    }

    pub async fn stop_mode(&self) -> Result<OutputMode, CoordinatorError> {
        self.request(|reply| CoordinatorEvent::Command(Command::StopMode { reply }))
            .await
    }

    pub async fn update_setpoint(
        &self,
        voltage: Option<f64>,
        current: Option<f64>,
    ) -> Result<Option<Setpoint>, CoordinatorError> {
        Ok(self
            .request(|reply| {
                CoordinatorEvent::Command(Command::UpdateSetpoint {
                    voltage,
                    current,
                    reply,
                })
            })
            .await??)
    }

    pub async fn set_output(&self, on: bool) -> Result<(), CoordinatorError> {
        self.send(CoordinatorEvent::Command(Command::SetOutput { on }))
            .await
    }

    pub async fn request_feedback(&self) -> Result<(), CoordinatorError> {
        self.send(CoordinatorEvent::Command(Command::RequestFeedback))
            .await
    }

    pub async fn snapshot(&self) -> Result<TelemetrySnapshot, CoordinatorError> {
        self.request(CoordinatorEvent::Snapshot).await
    }

    pub async fn history(&self) -> Result<HistorySnapshot, CoordinatorError> {
        self.request(CoordinatorEvent::History).await
    }

    pub async fn shutdown(&self) {
        let _ = self.events.send(CoordinatorEvent::Shutdown).await;
    }
}

#[derive(Debug, Default)]
struct ActiveTimers {
    simulator: Option<TimerHandle>,
    poller: Option<TimerHandle>,
    push_listener: Option<TimerHandle>,
}

impl ActiveTimers {
    fn cancel_all(&mut self) {
        self.simulator = None;
        self.poller = None;
        self.push_listener = None;
    }
}

struct CoordinatorState {
    connection: ConnectionPhase,
    /// One-way gate: once set, simulator samples are never folded until the
    /// transport leaves the device.
    first_real_received: bool,
    last_input_value: f64,
    last_known: LastKnown,
    latest_sample: Option<Sample>,
    latest_real: Option<Sample>,
    last_raw: Option<serde_json::Value>,
    device_output_on: Option<bool>,
    output_enabled: bool,
    flags: ModeFlags,
    history: ChannelHistory,
    timers: ActiveTimers,
}

impl CoordinatorState {
    fn new(history_depth: usize) -> Self {
        Self {
            connection: ConnectionPhase::Disconnected,
            first_real_received: false,
            last_input_value: 0.0,
            last_known: LastKnown::default(),
            latest_sample: None,
            latest_real: None,
            last_raw: None,
            device_output_on: None,
            output_enabled: false,
            flags: ModeFlags::default(),
            history: ChannelHistory::new(history_depth),
            timers: ActiveTimers::default(),
        }
    }
}

pub struct Coordinator {
    events: mpsc::Receiver<CoordinatorEvent>,
    scheduler: Scheduler<CoordinatorEvent>,
    settings: CoordinatorSettings,
    state: CoordinatorState,
    arbiter: ModeArbiter,
    gate: FreshnessGate,
    ramps: RampEngine,
    simulator: Simulator,
    poller: Poller,
    push_listener: PushListener,
    dispatcher: CommandDispatcher,
    log: Arc<dyn LogSink>,
}

impl Coordinator {
    pub fn new(
        settings: CoordinatorSettings,
        bridge: Arc<dyn DeviceBridge>,
        push_channel: PushChannel,
        log: Arc<dyn LogSink>,
    ) -> (Self, CoordinatorHandle) {
        let (tx, rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
        let handle = CoordinatorHandle { events: tx.clone() };

        let coordinator = Self {
            events: rx,
            scheduler: Scheduler::new(tx),
            state: CoordinatorState::new(settings.history_depth),
            arbiter: ModeArbiter::new(),
            gate: FreshnessGate::new(settings.freshness_window),
            ramps: RampEngine::new(settings.ramp_steps, settings.ramp_step_interval),
            simulator: Simulator::new(),
            poller: Poller::new(bridge.clone(), settings.poll_interval),
            push_listener: PushListener::new(push_channel),
            dispatcher: CommandDispatcher::new(bridge),
            log,
            settings,
        };
        (coordinator, handle)
    }

    pub fn with_simulator(mut self, simulator: Simulator) -> Self {
        self.simulator = simulator;
        self
    }

    /// Process events until shutdown, then cancel everything still scheduled.
    pub async fn run(mut self) {
        self.ensure_simulator();
        tracing::info!(
            "Telemetry coordinator running (history depth {}, freshness window {:?})",
            self.settings.history_depth,
            self.gate.window()
        );

        while let Some(event) = self.events.recv().await {
            if !self.handle(event) {
                break;
            }
        }

        self.state.timers.cancel_all();
        self.ramps.cancel_all();
        tracing::info!("Telemetry coordinator stopped");
    }

    /// Returns false once the coordinator should stop.
    fn handle(&mut self, event: CoordinatorEvent) -> bool {
        match event {
            CoordinatorEvent::Connection(report) => self.on_connection(report),
            CoordinatorEvent::SimulatorTick => self.on_simulator_tick(),
            CoordinatorEvent::Telemetry(arrival) => self.on_telemetry(arrival),
            CoordinatorEvent::RampStep(step) => self.on_ramp_step(step),
            CoordinatorEvent::Command(command) => self.on_command(command),
            CoordinatorEvent::Snapshot(reply) => {
                let _ = reply.send(self.snapshot(Utc::now()));
            }
            CoordinatorEvent::History(reply) => {
                let _ = reply.send(self.state.history.snapshot());
            }
            CoordinatorEvent::Shutdown => return false,
        }
        true
    }

    fn device_transport(&self) -> Option<Transport> {
        self.state.connection.device_transport()
    }

    // --- connection lifecycle ---

    fn on_connection(&mut self, report: ConnectionReport) {
        let next = ConnectionPhase::from_report(report);
        if next == self.state.connection {
            return;
        }
        let previous = std::mem::replace(&mut self.state.connection, next);
        self.log.info(&format!("Connection {} -> {}", previous, next));

        self.state.first_real_received = false;
        self.state.latest_real = None;

        if next.device_transport().is_some() {
            self.ensure_simulator();
            self.start_poller();
            self.start_push_listener();
        } else {
            self.stop_poller();
            self.state.timers.push_listener = None;
            self.state.device_output_on = None;
            self.ensure_simulator();
        }
    }

    fn ensure_simulator(&mut self) {
        if self.state.first_real_received || self.state.timers.simulator.is_some() {
            return;
        }
        let timer = self
            .scheduler
            .every(self.settings.simulator_interval, || CoordinatorEvent::SimulatorTick);
        self.state.timers.simulator = Some(timer);
    }

    fn start_poller(&mut self) {
        if self.state.timers.poller.is_none() {
            self.state.timers.poller = Some(self.poller.start(&self.scheduler));
        }
    }

    fn stop_poller(&mut self) {
        self.state.timers.poller = None;
    }

    fn start_push_listener(&mut self) {
        if self.state.timers.push_listener.is_none() {
            self.state.timers.push_listener = Some(self.push_listener.start(&self.scheduler));
        }
    }

    // --- telemetry ingestion ---

    fn on_simulator_tick(&mut self) {
        if self.state.first_real_received {
            tracing::debug!("Simulator tick after device hand-off ignored");
            return;
        }
        let sample = self.simulator.sample(Utc::now(), self.arbiter.active());
        self.fold(sample);
    }

    fn on_telemetry(&mut self, arrival: Arrival) {
        let Some(transport) = self.device_transport() else {
            tracing::debug!("Dropping {} payload, no device connected", arrival.via);
            return;
        };

        let decoded = decode_payload(&arrival.body, &self.state.last_known, arrival.received_at);
        self.state.last_raw = Some(arrival.body);
        if let Some(on) = decoded.device_output_on {
            self.state.device_output_on = Some(on);
        }
        let sample = decoded.sample;

        if sample.origin == Origin::Simulated {
            tracing::debug!("Bridge reports simulated data; keeping local simulator trace");
            return;
        }

        // Poll and push may deliver the same stream; never step backwards in time.
        if let Some(latest) = &self.state.latest_real {
            if sample.timestamp < latest.timestamp {
                tracing::debug!(
                    "Dropping out-of-order {} sample ({} < {})",
                    arrival.via,
                    sample.timestamp,
                    latest.timestamp
                );
                return;
            }
        }

        self.state.last_known.remember(&sample);

        if !self.gate.is_trusted(&sample, Utc::now()) {
            tracing::debug!("Stale {} sample from {}", arrival.via, sample.timestamp);
            if self.state.first_real_received {
                self.fold(sample);
            }
            return;
        }

        self.state.latest_real = Some(sample.clone());
        if self.state.first_real_received {
            self.fold(sample);
        } else {
            self.hand_off(sample, arrival.via, transport);
        }
    }

    /// First trusted device sample: stop the simulator and re-seed every
    /// channel so simulated history leaves the chart window.
    fn hand_off(&mut self, sample: Sample, via: Ingress, transport: Transport) {
        self.state.first_real_received = true;
        self.state.timers.simulator = None;
        self.state.history.reset_to(&sample);
        self.state.last_input_value = sample.input_channel_value();
        self.log.info(&format!(
            "First device sample received via {} over {}; simulator stopped",
            via, transport
        ));
        self.state.latest_sample = Some(sample);
    }

    fn fold(&mut self, sample: Sample) {
        self.state.history.push_outputs(&sample);
        if !self.ramps.is_active(Channel::InputPower) {
            let input = sample.input_voltage.unwrap_or(self.state.last_input_value);
            self.state.last_input_value = input;
            self.state.history.push(Channel::InputPower, input);
        }
        self.state.latest_sample = Some(sample);
    }

    fn on_ramp_step(&mut self, step: RampStep) {
        if let Some(value) = self.ramps.advance(step) {
            self.state.history.push(step.channel, value);
            if step.channel == Channel::InputPower {
                self.state.last_input_value = value;
            }
        }
    }

    // --- operator commands ---

    fn on_command(&mut self, command: Command) {
        match command {
            Command::StartMode { mode, reply } => {
                let _ = reply.send(self.start_mode(mode));
            }
            Command::StopMode { reply } => {
                let _ = reply.send(self.stop_mode());
            }
            Command::UpdateSetpoint {
                voltage,
                current,
                reply,
            } => {
                let _ = reply.send(self.update_setpoint(voltage, current));
            }
            Command::SetOutput { on: true } => self.enable_output(),
            Command::SetOutput { on: false } => self.disable_output(),
            Command::RequestFeedback => {
                if self.device_transport().is_some() {
                    self.dispatcher.request_feedback();
                }
            }
        }
    }

    fn start_mode(&mut self, mode: OutputMode) -> Result<(), ModeConflict> {
        let Some(kind) = mode.kind() else {
            return Ok(());
        };
        if let Err(conflict) = self.arbiter.request_start(mode) {
            self.log.warn(&conflict.to_string());
            return Err(conflict);
        }

        self.state.flags = ModeFlags::for_kind(kind);
        if let Some(setpoint) = self.arbiter.active().setpoint() {
            self.log.info(&format!(
                "{} mode started at {:.2} V / {:.3} A",
                kind, setpoint.voltage, setpoint.current
            ));
            if self.device_transport().is_some() {
                self.dispatcher
                    .send_setpoint(SetpointCommand::from_setpoint(setpoint));
            }
        }
        self.enable_output();
        Ok(())
    }

    fn stop_mode(&mut self) -> OutputMode {
        let previous = self.arbiter.stop();
        if let Some(kind) = previous.kind() {
            self.state.flags = ModeFlags::default();
            self.disable_output();
            self.log.info(&format!("{} mode stopped", kind));
        }
        previous
    }

    fn update_setpoint(
        &mut self,
        voltage: Option<f64>,
        current: Option<f64>,
    ) -> Result<Option<Setpoint>, InvalidSetpoint> {
        let on_device = self.device_transport().is_some();
        match self.arbiter.update_setpoint(voltage, current)? {
            Some(setpoint) => {
                if self.arbiter.active().kind() == Some(ModeKind::Load) && self.state.output_enabled {
                    self.ramps.start(
                        &self.scheduler,
                        Channel::InputPower,
                        self.state.last_input_value,
                        setpoint.power(),
                    );
                }
                if on_device {
                    self.dispatcher
                        .send_setpoint(SetpointCommand::from_setpoint(setpoint));
                }
                Ok(Some(setpoint))
            }
            None => {
                let command = SetpointCommand::partial(voltage, current)?;
                if on_device {
                    self.dispatcher.send_setpoint(command);
                }
                Ok(None)
            }
        }
    }

    fn enable_output(&mut self) {
        let from = if self.state.output_enabled {
            self.state.last_input_value
        } else {
            0.0
        };
        let target = self.arbiter.compute_setpoint_power();
        self.state.output_enabled = true;
        self.ramps
            .start(&self.scheduler, Channel::InputPower, from, target);

        if self.device_transport().is_some() {
            self.dispatcher.toggle_output(true);
            self.start_poller();
        }
    }

    fn disable_output(&mut self) {
        self.state.output_enabled = false;
        self.ramps.start(
            &self.scheduler,
            Channel::InputPower,
            self.state.last_input_value,
            0.0,
        );
        self.stop_poller();
        if self.device_transport().is_some() {
            self.dispatcher.toggle_output(false);
        }
    }

    // --- projections ---

    fn snapshot(&self, now: DateTime<Utc>) -> TelemetrySnapshot {
        let temperature = self.state.latest_sample.as_ref().map(|s| s.temperature);
        let live = self
            .state
            .latest_real
            .as_ref()
            .filter(|sample| self.gate.is_trusted(sample, now));

        let active = self.arbiter.active();
        let metrics = match (live, active.kind(), active.setpoint()) {
            (Some(sample), _, _) => DisplayedMetrics::live(sample, self.state.last_input_value),
            (None, Some(kind), Some(setpoint)) => DisplayedMetrics::from_setpoint(
                setpoint,
                kind,
                self.state.last_input_value,
                temperature,
            ),
            _ => DisplayedMetrics::idle(temperature),
        };

        TelemetrySnapshot {
            metrics,
            flags: self.state.flags,
            active_mode: active.clone(),
            connection: self.state.connection,
            output_enabled: self.state.output_enabled,
            first_real_received: self.state.first_real_received,
            device_output_on: self.state.device_output_on,
            last_raw: self.state.last_raw.clone(),
            timers: TimerStatus {
                simulator: self.state.timers.simulator.is_some(),
                poller: self.state.timers.poller.is_some(),
                push_listener: self.state.timers.push_listener.is_some(),
                input_ramp: self.ramps.is_active(Channel::InputPower),
            },
        }
    }
}
