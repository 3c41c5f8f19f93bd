use std::time::Duration;
use serde_json::json;
use strum_macros::Display;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, trace};
use crate::broker::{with_deadline, SubscriptionSource};
use crate::consumer::model::{ConsumedRecord, Delivery, DeliveryError};
use crate::error::BrokerError;
use crate::events::{EventBus, EventKind};
use crate::types::SubscriptionTarget;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ConsumerState {
    Active,
    Paused,
    Closed,
}

pub(crate) struct DeliverySettings {
    pub poll_interval: Duration,
    pub request_timeout: Duration,
}

/// Handle on a running delivery task. Dropping it stops the task.
pub(crate) struct Subscription {
    control: watch::Sender<ConsumerState>,
    task: JoinHandle<()>,
}

impl Subscription {
    pub(crate) fn spawn(
        consumer_id: String,
        target: SubscriptionTarget,
        source: Box<dyn SubscriptionSource>,
        sink: mpsc::Sender<Delivery>,
        settings: DeliverySettings,
        events: EventBus,
    ) -> Self {
        let (control, state) = watch::channel(ConsumerState::Active);
        let worker = DeliveryWorker {
            consumer_id,
            target,
            source,
            sink,
            state,
            settings,
            events,
        };
        let task = tokio::spawn(worker.run());
        Self { control, task }
    }

    pub(crate) fn state(&self) -> ConsumerState {
        *self.control.borrow()
    }

    pub(crate) fn set_state(&self, state: ConsumerState) {
        self.control.send_replace(state);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.control.send_replace(ConsumerState::Closed);
        self.task.abort();
    }
}

enum Step {
    Delivered,
    Idle,
    Stop,
}

struct DeliveryWorker {
    consumer_id: String,
    target: SubscriptionTarget,
    source: Box<dyn SubscriptionSource>,
    sink: mpsc::Sender<Delivery>,
    state: watch::Receiver<ConsumerState>,
    settings: DeliverySettings,
    events: EventBus,
}

impl DeliveryWorker {
    async fn run(mut self) {
        debug!(consumer = %self.consumer_id, topic = %self.target.topic, "delivery started");
        loop {
            let current = *self.state.borrow_and_update();
            match current {
                ConsumerState::Closed => break,
                ConsumerState::Paused => {
                    if self.state.changed().await.is_err() {
                        break;
                    }
                    continue;
                }
                ConsumerState::Active => {}
            }

            match self.poll_once().await {
                Step::Delivered => continue,
                Step::Stop => break,
                Step::Idle => {}
            }

            tokio::select! {
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
                changed = self.state.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        debug!(consumer = %self.consumer_id, "delivery stopped");
    }

    async fn poll_once(&mut self) -> Step {
        let timeout = self.settings.request_timeout;
        let record = match with_deadline(timeout, self.source.fetch()).await {
            Ok(Some(record)) => record,
            Ok(None) => return Step::Idle,
            Err(e) => return self.fail(e).await,
        };

        // paused or closed while the fetch was in flight: leave the offset alone
        if *self.state.borrow() != ConsumerState::Active {
            trace!(consumer = %self.consumer_id, offset = record.offset, "dropping in-flight record");
            return Step::Idle;
        }

        let offset = record.offset;
        let delivered = ConsumedRecord {
            consumer_id: self.consumer_id.clone(),
            topic: self.target.topic.clone(),
            message: record.value,
            partition: self.target.partition,
            key: record.key,
            offset,
        };
        if self.sink.send(Ok(delivered)).await.is_err() {
            debug!(consumer = %self.consumer_id, "delivery sink closed");
            return Step::Stop;
        }
        self.events.emit(
            EventKind::ConsumerMessage,
            json!({
                "consumerId": self.consumer_id,
                "topic": self.target.topic,
                "partition": self.target.partition,
                "offset": offset,
            }),
        );

        match with_deadline(timeout, self.source.commit(offset + 1)).await {
            Ok(()) => Step::Delivered,
            Err(e) => self.fail(e).await,
        }
    }

    async fn fail(&mut self, source: BrokerError) -> Step {
        let error = DeliveryError {
            consumer_id: self.consumer_id.clone(),
            source,
        };
        self.events
            .emit(EventKind::Error, json!(error.to_string()));
        match self.sink.send(Err(error)).await {
            Ok(()) => Step::Idle,
            Err(_) => Step::Stop,
        }
    }
}
