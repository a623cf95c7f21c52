// Scheduler - Cancellable periodic timers feeding an event channel
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Shortest period any timer runs at; zero would panic inside the task.
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Handle to a scheduled task. Cancelling is idempotent and dropping the handle
/// cancels the task.
#[derive(Debug)]
pub struct TimerHandle {
    task: AbortHandle,
}

impl TimerHandle {
    pub fn cancel(&self) {
        self.task.abort();
    }

    #[cfg(test)]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Spawns timers whose ticks are delivered as events on a single channel, so
/// the receiver handles them one at a time.
pub struct Scheduler<E> {
    events: mpsc::Sender<E>,
}

impl<E> Clone for Scheduler<E> {
    fn clone(&self) -> Self {
        Self {
            events: self.events.clone(),
        }
    }
}

impl<E: Send + 'static> Scheduler<E> {
    pub fn new(events: mpsc::Sender<E>) -> Self {
        Self { events }
    }

    pub fn sender(&self) -> mpsc::Sender<E> {
        self.events.clone()
    }

    /// Emit `make()` every `period`, first after one full period.
    pub fn every<F>(&self, period: Duration, make: F) -> TimerHandle
    where
        F: Fn() -> E + Send + 'static,
    {
        self.tick_loop(period, None, make)
    }

    /// Emit `make()` every `period`, `count` times.
    pub fn repeat<F>(&self, period: Duration, count: u32, make: F) -> TimerHandle
    where
        F: Fn() -> E + Send + 'static,
    {
        self.tick_loop(period, Some(count), make)
    }

    /// Run an arbitrary task under a cancellable handle.
    pub fn spawn<Fut>(&self, task: Fut) -> TimerHandle
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        TimerHandle {
            task: tokio::spawn(task).abort_handle(),
        }
    }

    fn tick_loop<F>(&self, period: Duration, count: Option<u32>, make: F) -> TimerHandle
    where
        F: Fn() -> E + Send + 'static,
    {
        let events = self.events.clone();
        let period = period.max(MIN_PERIOD);
        self.spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut emitted = 0u32;
            while count.is_none_or(|limit| emitted < limit) {
                ticker.tick().await;
                if events.send(make()).await.is_err() {
                    break;
                }
                emitted += 1;
            }
        })
    }
}
