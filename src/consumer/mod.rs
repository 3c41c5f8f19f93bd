//! Registry of live consumer subscriptions.
//!
//! Every entry owns one delivery task. An id is reserved under the registry lock
//! before the subscription is opened, so concurrent registrations never share an
//! id and a slow subscribe never blocks lookups.

use std::sync::Arc;
use std::time::Duration;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::info;
use crate::config::ConsumerSettings;
use crate::error::Result;
use crate::events::{EventBus, EventKind};
use crate::topics::TopicRegistrar;
use crate::types::SubscriptionTarget;

mod ids;
mod model;
mod subscription;

pub use ids::IdMatch;
pub use model::{ConsumeRequest, ConsumedRecord, ConsumerRegistration, Delivery, DeliveryError};
pub use subscription::ConsumerState;

use subscription::{DeliverySettings, Subscription};

struct ConsumerEntry {
    id: String,
    topic: String,
    partition: u32,
    group_id: String,
    subscription: Subscription,
}

#[derive(Default)]
struct Registry {
    // insertion order is the lookup order
    entries: Vec<ConsumerEntry>,
    // ids whose subscription is still being opened
    reserved: Vec<String>,
}

impl Registry {
    fn position(&self, rule: IdMatch, id: &str) -> Option<usize> {
        self.entries.iter().position(|e| rule.matches(&e.id, id))
    }

    fn collides(&self, rule: IdMatch, candidate: &str) -> bool {
        self.ids().any(|id| rule.collides(id, candidate))
    }

    /// A generated id no registered or reserved id answers to.
    fn fresh_id(&self, rule: IdMatch) -> String {
        loop {
            let id = ids::generate_id();
            if self.ids().all(|existing| existing != id && !rule.matches(existing, &id)) {
                return id;
            }
        }
    }

    fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .map(|e| e.id.as_str())
            .chain(self.reserved.iter().map(String::as_str))
    }
}

/// Releases a reserved id unless the registration completed.
struct Reservation<'a> {
    registry: &'a Mutex<Registry>,
    id: String,
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        self.registry.lock().reserved.retain(|r| r != &self.id);
    }
}

pub struct ConsumerRegistry {
    topics: Arc<TopicRegistrar>,
    events: EventBus,
    settings: ConsumerSettings,
    request_timeout: Duration,
    registry: Mutex<Registry>,
}

impl ConsumerRegistry {
    pub fn new(
        topics: Arc<TopicRegistrar>,
        events: EventBus,
        settings: ConsumerSettings,
        request_timeout: Duration,
    ) -> Self {
        Self {
            topics,
            events,
            settings,
            request_timeout,
            registry: Mutex::new(Registry::default()),
        }
    }

    /// A channel sized by `deliveryBuffer`, ready to be used as a sink.
    pub fn delivery_channel(&self) -> (mpsc::Sender<Delivery>, mpsc::Receiver<Delivery>) {
        mpsc::channel(self.settings.delivery_buffer())
    }

    /// Registers a consumer and starts delivering records of (topic, partition, group)
    /// into `sink`. Subscription failures arrive in the sink too.
    pub async fn consume_on_topic(
        &self,
        req: ConsumeRequest,
        sink: mpsc::Sender<Delivery>,
    ) -> Result<ConsumerRegistration> {
        let result = self.register(req, sink).await;
        self.events.observe(result)
    }

    pub async fn list_consumers(&self) -> Vec<String> {
        let ids: Vec<String> = self.registry.lock().entries.iter().map(|e| e.id.clone()).collect();
        self.events.emit(EventKind::ConsumerListId, json!(ids));
        ids
    }

    pub async fn pause_consumer(&self, id: &str) -> bool {
        self.transition(id, ConsumerState::Paused, EventKind::ConsumerPause, EventKind::ConsumerNotPause)
            .await
    }

    pub async fn resume_consumer(&self, id: &str) -> bool {
        self.transition(id, ConsumerState::Active, EventKind::ConsumerResume, EventKind::ConsumerNotResume)
            .await
    }

    /// Stops delivery and evicts the first matching entry.
    pub async fn close_consumer(&self, id: &str) -> bool {
        let removed = {
            let mut registry = self.registry.lock();
            registry
                .position(self.settings.id_match, id)
                .map(|pos| registry.entries.remove(pos))
        };
        let Some(entry) = removed else {
            self.events.emit(EventKind::ConsumerNotClose, Value::String(id.to_string()));
            return false;
        };

        entry.subscription.set_state(ConsumerState::Closed);
        self.events.emit(
            EventKind::ConsumerClose,
            json!({ "consumerId": entry.id, "topic": entry.topic }),
        );
        info!(consumer = %entry.id, topic = %entry.topic, "consumer closed");
        true
    }

    /// State of the consumer registered under exactly `id`.
    pub async fn consumer_state(&self, id: &str) -> Option<ConsumerState> {
        self.registry
            .lock()
            .entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.subscription.state())
    }

    pub async fn len(&self) -> usize {
        self.registry.lock().entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn register(&self, req: ConsumeRequest, sink: mpsc::Sender<Delivery>) -> Result<ConsumerRegistration> {
        let session = self
            .topics
            .require_topic(&req.topic, EventKind::ConsumerNotATopic)
            .await?;

        let requested_id = req.consumer_id.filter(|id| !id.is_empty());
        let group_id = req
            .group_id
            .filter(|g| !g.is_empty())
            .unwrap_or_else(|| self.settings.default_group_id.clone());

        let rule = self.settings.id_match;
        let reservation = {
            let mut registry = self.registry.lock();
            let id = match &requested_id {
                Some(requested) if !registry.collides(rule, requested) => requested.clone(),
                Some(requested) => {
                    let assigned = registry.fresh_id(rule);
                    self.events.emit(
                        EventKind::ConsumerId,
                        json!({ "requested": requested, "assigned": assigned }),
                    );
                    assigned
                }
                None => registry.fresh_id(rule),
            };
            registry.reserved.push(id.clone());
            Reservation {
                registry: &self.registry,
                id,
            }
        };
        let id = reservation.id.clone();

        let target = SubscriptionTarget {
            topic: req.topic,
            partition: req.partition,
            group_id,
        };
        let source = session.bounded(session.client().subscribe(&target)).await?;
        let subscription = Subscription::spawn(
            id.clone(),
            target.clone(),
            source,
            sink,
            DeliverySettings {
                poll_interval: self.settings.poll_interval(),
                request_timeout: self.request_timeout,
            },
            self.events.clone(),
        );

        {
            let mut registry = self.registry.lock();
            registry.reserved.retain(|r| r != &id);
            registry.entries.push(ConsumerEntry {
                id: id.clone(),
                topic: target.topic.clone(),
                partition: target.partition,
                group_id: target.group_id.clone(),
                subscription,
            });
        }
        drop(reservation);

        info!(consumer = %id, topic = %target.topic, partition = target.partition, group = %target.group_id, "consumer registered");
        self.events.emit(
            EventKind::ConsumerStart,
            json!({
                "consumerId": id,
                "topic": target.topic,
                "partition": target.partition,
                "groupId": target.group_id,
            }),
        );
        Ok(ConsumerRegistration { id, requested_id })
    }

    async fn transition(&self, id: &str, to: ConsumerState, ok: EventKind, not_found: EventKind) -> bool {
        let found = {
            let registry = self.registry.lock();
            registry.position(self.settings.id_match, id).map(|pos| {
                let entry = &registry.entries[pos];
                entry.subscription.set_state(to);
                json!({
                    "consumerId": entry.id,
                    "topic": entry.topic,
                    "partition": entry.partition,
                    "groupId": entry.group_id,
                })
            })
        };
        match found {
            Some(payload) => {
                self.events.emit(ok, payload);
                true
            }
            None => {
                self.events.emit(not_found, Value::String(id.to_string()));
                false
            }
        }
    }
}
