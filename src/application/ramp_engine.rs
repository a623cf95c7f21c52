// Ramp engine - Time-bounded linear interpolation per channel
use crate::application::scheduler::{Scheduler, TimerHandle};
use crate::domain::metrics::Channel;
use std::collections::HashMap;
use std::time::Duration;

pub type RampId = u64;

/// A linear interpolation from `from` to `to` over a fixed number of steps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RampPlan {
    pub from: f64,
    pub to: f64,
    pub steps: u32,
}

impl RampPlan {
    pub fn new(from: f64, to: f64, steps: u32) -> Self {
        Self {
            from,
            to,
            steps: steps.max(1),
        }
    }

    /// Value emitted at step `i` (1-based); `i >= steps` yields `to`.
    pub fn value_at(&self, i: u32) -> f64 {
        let progress = (f64::from(i) / f64::from(self.steps)).min(1.0);
        self.from + (self.to - self.from) * progress
    }
}

/// Tick for step `n` of an in-flight ramp, identified so that ticks from a
/// preempted ramp can be discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RampStep {
    pub channel: Channel,
    pub ramp: RampId,
}

#[derive(Debug)]
struct ActiveRamp {
    id: RampId,
    plan: RampPlan,
    emitted: u32,
    _timer: TimerHandle,
}

/// Owns at most one in-flight ramp per channel. The engine only computes
/// values; the caller decides where they are written.
#[derive(Debug)]
pub struct RampEngine {
    steps: u32,
    step_interval: Duration,
    next_id: RampId,
    active: HashMap<Channel, ActiveRamp>,
}

impl RampEngine {
    pub fn new(steps: u32, step_interval: Duration) -> Self {
        Self {
            steps: steps.max(1),
            step_interval,
            next_id: 0,
            active: HashMap::new(),
        }
    }

    /// Start a ramp on `channel`, replacing any ramp already running there.
    pub fn start<E>(&mut self, scheduler: &Scheduler<E>, channel: Channel, from: f64, to: f64) -> RampId
    where
        E: From<RampStep> + Send + 'static,
    {
        self.next_id += 1;
        let id = self.next_id;
        let step = RampStep { channel, ramp: id };
        let timer = scheduler.repeat(self.step_interval, self.steps, move || E::from(step));

        let previous = self.active.insert(
            channel,
            ActiveRamp {
                id,
                plan: RampPlan::new(from, to, self.steps),
                emitted: 0,
                _timer: timer,
            },
        );
        if let Some(previous) = previous {
            tracing::debug!("Ramp {} on {:?} preempted by ramp {}", previous.id, channel, id);
        }
        id
    }

    /// Advance the ramp named by `step` and return the value to emit, or `None`
    /// if that ramp is no longer current.
    pub fn advance(&mut self, step: RampStep) -> Option<f64> {
        let ramp = self.active.get_mut(&step.channel)?;
        if ramp.id != step.ramp {
            return None;
        }
        ramp.emitted += 1;
        let value = ramp.plan.value_at(ramp.emitted);
        if ramp.emitted >= ramp.plan.steps {
            self.active.remove(&step.channel);
        }
        Some(value)
    }

    pub fn is_active(&self, channel: Channel) -> bool {
        self.active.contains_key(&channel)
    }

    pub fn cancel_all(&mut self) {
        self.active.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;
    use tokio::time;

    async fn run_to_quiet(
        engine: &mut RampEngine,
        rx: &mut mpsc::Receiver<RampStep>,
    ) -> Vec<f64> {
        let mut values = Vec::new();
        while let Ok(Some(step)) = time::timeout(Duration::from_secs(2), rx.recv()).await {
            if let Some(value) = engine.advance(step) {
                values.push(value);
            }
        }
        values
    }

    #[test]
    fn test_plan_interpolates_linearly_and_saturates() {
        let plan = RampPlan::new(2.0, 8.0, 3);
        assert_eq!(plan.value_at(0), 2.0);
        assert_eq!(plan.value_at(1), 4.0);
        assert_eq!(plan.value_at(3), 8.0);
        assert_eq!(plan.value_at(10), 8.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ramp_emits_exactly_steps_values() {
        let (tx, mut rx) = mpsc::channel::<RampStep>(32);
        let scheduler = Scheduler::new(tx);
        let mut engine = RampEngine::new(12, Duration::from_millis(60));

        engine.start(&scheduler, Channel::InputPower, 0.0, 10.0);
        assert!(engine.is_active(Channel::InputPower));

        let values = run_to_quiet(&mut engine, &mut rx).await;
        assert_eq!(values.len(), 12);
        assert!(values.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(values.last().copied(), Some(10.0));
        assert!(!engine.is_active(Channel::InputPower));
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_ramp_preempts_old_one() {
        let (tx, mut rx) = mpsc::channel::<RampStep>(32);
        let scheduler = Scheduler::new(tx);
        let mut engine = RampEngine::new(4, Duration::from_millis(60));

        let first = engine.start(&scheduler, Channel::InputPower, 0.0, 8.0);
        let step = rx.recv().await.unwrap();
        assert_eq!(step.ramp, first);
        assert_eq!(engine.advance(step), Some(2.0));

        let second = engine.start(&scheduler, Channel::InputPower, 2.0, 0.0);
        assert_ne!(first, second);
        assert_eq!(engine.advance(RampStep { channel: Channel::InputPower, ramp: first }), None);

        let values = run_to_quiet(&mut engine, &mut rx).await;
        assert_eq!(values, vec![1.5, 1.0, 0.5, 0.0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_discards_pending_steps() {
        let (tx, mut rx) = mpsc::channel::<RampStep>(32);
        let scheduler = Scheduler::new(tx);
        let mut engine = RampEngine::new(12, Duration::from_millis(60));

        engine.start(&scheduler, Channel::InputPower, 0.0, 10.0);
        engine.cancel_all();
        engine.cancel_all();

        let values = run_to_quiet(&mut engine, &mut rx).await;
        assert!(values.is_empty());
    }
}
