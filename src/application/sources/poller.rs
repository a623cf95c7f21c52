// Poller - Periodic reads against the device bridge
use crate::application::device_bridge::DeviceBridge;
use crate::application::scheduler::{Scheduler, TimerHandle, MIN_PERIOD};
use crate::application::sources::{Arrival, Ingress};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};

pub struct Poller {
    bridge: Arc<dyn DeviceBridge>,
    interval: Duration,
}

impl Poller {
    pub fn new(bridge: Arc<dyn DeviceBridge>, interval: Duration) -> Self {
        Self { bridge, interval }
    }

    /// Start polling, first read immediately. Each read completes before the
    /// next tick is awaited, so ticks never overlap. Failed reads are dropped
    /// and retried on the next tick.
    pub fn start<E>(&self, scheduler: &Scheduler<E>) -> TimerHandle
    where
        E: From<Arrival> + Send + 'static,
    {
        let bridge = self.bridge.clone();
        let events = scheduler.sender();
        let period = self.interval.max(MIN_PERIOD);

        scheduler.spawn(async move {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                match bridge.read().await {
                    Ok(body) => {
                        if events.send(E::from(Arrival::new(Ingress::Poll, body))).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::debug!("Bridge poll failed, retrying next tick: {:#}", e),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::device_bridge::SetpointCommand;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    /// Fails every other read.
    struct FlakyBridge {
        reads: AtomicUsize,
    }

    #[async_trait]
    impl DeviceBridge for FlakyBridge {
        async fn read(&self) -> anyhow::Result<Value> {
            let n = self.reads.fetch_add(1, Ordering::SeqCst);
            if n % 2 == 1 {
                anyhow::bail!("connection refused");
            }
            Ok(json!({ "voltage": n as f64 }))
        }

        async fn set(&self, _command: SetpointCommand) -> anyhow::Result<()> {
            Ok(())
        }

        async fn toggle(&self, _on: bool) -> anyhow::Result<()> {
            Ok(())
        }

        async fn feedback(&self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_polls_are_swallowed_and_polling_continues() {
        let bridge = Arc::new(FlakyBridge {
            reads: AtomicUsize::new(0),
        });
        let (tx, mut rx) = mpsc::channel::<Arrival>(16);
        let scheduler = Scheduler::new(tx);
        let poller = Poller::new(bridge.clone(), Duration::from_secs(2));

        let handle = poller.start(&scheduler);
        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        handle.cancel();

        assert_eq!(first.via, Ingress::Poll);
        assert_eq!(first.body, json!({"voltage": 0.0}));
        assert_eq!(second.body, json!({"voltage": 2.0}));
        assert!(bridge.reads.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_still_polls() {
        let bridge = Arc::new(FlakyBridge {
            reads: AtomicUsize::new(0),
        });
        let (tx, mut rx) = mpsc::channel::<Arrival>(16);
        let scheduler = Scheduler::new(tx);
        let handle = Poller::new(bridge, Duration::ZERO).start(&scheduler);

        rx.recv().await.unwrap();
        rx.recv().await.unwrap();
        assert!(!handle.is_finished());
    }
}
