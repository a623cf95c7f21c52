// Push listener - Device-originated payloads delivered asynchronously
use crate::application::scheduler::{Scheduler, TimerHandle};
use crate::application::sources::{Arrival, Ingress};
use serde_json::Value;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Publishing side of the push-telemetry channel.
#[derive(Clone)]
pub struct PushChannel {
    tx: broadcast::Sender<Value>,
}

impl PushChannel {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish a payload. Returns false when no listener is running, in which
    /// case the payload is dropped.
    pub fn publish(&self, body: Value) -> bool {
        self.tx.send(body).is_ok()
    }

    fn subscribe(&self) -> broadcast::Receiver<Value> {
        self.tx.subscribe()
    }
}

pub struct PushListener {
    channel: PushChannel,
}

impl PushListener {
    pub fn new(channel: PushChannel) -> Self {
        Self { channel }
    }

    /// Forward pushed payloads to the scheduler's event channel until cancelled.
    pub fn start<E>(&self, scheduler: &Scheduler<E>) -> TimerHandle
    where
        E: From<Arrival> + Send + 'static,
    {
        let mut stream = BroadcastStream::new(self.channel.subscribe());
        let events = scheduler.sender();

        scheduler.spawn(async move {
            while let Some(item) = stream.next().await {
                match item {
                    Ok(body) => {
                        if events.send(E::from(Arrival::new(Ingress::Push, body))).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::warn!("Push listener fell behind: {}", e),
                }
            }
        })
    }
}
