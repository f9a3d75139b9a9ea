use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::info;

use crate::application::events::{EventPublisher, PublishError};
use crate::infra::cache::mutex_lock;

const SOURCE: &str = "infra::events::memory";

#[derive(Debug, Clone, PartialEq)]
pub struct BusMessage {
    /// Monotonic sequence number within this process.
    pub epoch: u64,
    pub topic: String,
    pub payload: Value,
}

/// Fan-out broker for single-process deployments and tests.
///
/// Publishing with no subscriber still succeeds. The most recent messages are
/// retained up to the configured capacity.
pub struct InProcessEventBus {
    sender: broadcast::Sender<BusMessage>,
    epoch_counter: AtomicU64,
    history: Mutex<VecDeque<BusMessage>>,
    capacity: usize,
}

impl InProcessEventBus {
    pub fn new(capacity: NonZeroUsize) -> Self {
        let (sender, _) = broadcast::channel(capacity.get());
        Self {
            sender,
            epoch_counter: AtomicU64::new(0),
            history: Mutex::new(VecDeque::with_capacity(capacity.get())),
            capacity: capacity.get(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BusMessage> {
        self.sender.subscribe()
    }

    /// Messages published so far, oldest first.
    pub fn published(&self) -> Vec<BusMessage> {
        mutex_lock(&self.history, SOURCE, "published")
            .iter()
            .cloned()
            .collect()
    }

    fn next_epoch(&self) -> u64 {
        self.epoch_counter.fetch_add(1, Ordering::SeqCst)
    }
}

#[async_trait]
impl EventPublisher for InProcessEventBus {
    async fn publish(&self, topic: &str, payload: &Value) -> Result<(), PublishError> {
        let message = BusMessage {
            epoch: self.next_epoch(),
            topic: topic.to_string(),
            payload: payload.clone(),
        };

        {
            let mut history = mutex_lock(&self.history, SOURCE, "publish");
            if history.len() == self.capacity {
                history.pop_front();
            }
            history.push_back(message.clone());
        }

        // No receivers is not a failure.
        let delivered = self.sender.send(message.clone()).unwrap_or(0);

        info!(
            topic,
            event_epoch = message.epoch,
            subscribers = delivered,
            "client event published"
        );
        Ok(())
    }
}
