use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;
use crate::broker::offset_tracker::OffsetTracker;
use crate::broker::{AdminHandle, BrokerClient, Connector, ProducerHandle, SubscriptionSource};
use crate::config::ClientConfig;
use crate::error::{BrokerError, BrokerResult};
use crate::types::{
    Envelope, FetchedRecord, PartitionMetadata, ProduceAck, SubscriptionTarget,
    TopicMetadata, TopicSpec,
};

#[derive(Debug, Clone)]
struct StoredRecord {
    key: Option<String>,
    value: String,
    timestamp: u64,
}

#[derive(Debug)]
struct MemoryTopic {
    partitions: Vec<Vec<StoredRecord>>,
}

#[derive(Debug, Default)]
struct BrokerState {
    topics: BTreeMap<String, MemoryTopic>,
    offsets: OffsetTracker,
}

#[derive(Debug, Default)]
struct Counters {
    envelopes: AtomicU64,
    admin_handles: AtomicU64,
    producer_handles: AtomicU64,
    subscriptions: AtomicU64,
}

#[derive(Debug)]
struct Inner {
    state: Mutex<BrokerState>,
    available: AtomicBool,
    counters: Counters,
}

/// A process-local broker: topics with partitioned append-only logs and per-group
/// committed offsets. Cloning shares the same broker.
#[derive(Debug, Clone)]
pub struct MemoryBroker {
    inner: Arc<Inner>,
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBroker {
    pub fn new() -> Self {
        MemoryBroker {
            inner: Arc::new(Inner {
                state: Mutex::new(BrokerState::default()),
                available: AtomicBool::new(true),
                counters: Counters::default(),
            }),
        }
    }

    /// While unavailable, connecting and every request fail with `Unavailable`.
    pub fn set_available(&self, available: bool) {
        self.inner.available.store(available, Ordering::SeqCst);
    }

    pub fn is_available(&self) -> bool {
        self.inner.available.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> BrokerResult<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(BrokerError::Unavailable("memory broker is down".into()))
        }
    }

    pub fn metadata(&self, topics: &[String]) -> BrokerResult<Vec<TopicMetadata>> {
        self.check_available()?;
        let state = self.inner.state.lock();
        let describe = |name: &String, topic: &MemoryTopic| TopicMetadata {
            name: name.clone(),
            partitions: topic
                .partitions
                .iter()
                .enumerate()
                .map(|(id, log)| PartitionMetadata {
                    partition: id as u32,
                    high_watermark: log.len() as u64,
                })
                .collect(),
        };

        if topics.is_empty() {
            return Ok(state.topics.iter().map(|(n, t)| describe(n, t)).collect());
        }
        Ok(topics
            .iter()
            .filter_map(|name| state.topics.get(name).map(|t| describe(name, t)))
            .collect())
    }

    pub fn missing_topics(&self, topics: &[String]) -> BrokerResult<Vec<String>> {
        self.check_available()?;
        let state = self.inner.state.lock();
        Ok(topics
            .iter()
            .filter(|name| !state.topics.contains_key(*name))
            .cloned()
            .collect())
    }

    pub fn create_topics(&self, specs: &[TopicSpec]) -> BrokerResult<()> {
        self.check_available()?;
        let mut state = self.inner.state.lock();

        for (i, spec) in specs.iter().enumerate() {
            if spec.partitions == 0 || spec.replication_factor == 0 {
                return Err(BrokerError::Rejected(format!(
                    "topic {} needs at least one partition and one replica",
                    spec.name
                )));
            }
            let repeated = specs[..i].iter().any(|s| s.name == spec.name);
            if repeated || state.topics.contains_key(&spec.name) {
                return Err(BrokerError::TopicAlreadyExists(spec.name.clone()));
            }
        }

        for spec in specs {
            debug!(topic = %spec.name, partitions = spec.partitions, "creating topic");
            state.topics.insert(
                spec.name.clone(),
                MemoryTopic {
                    partitions: vec![Vec::new(); spec.partitions as usize],
                },
            );
        }
        Ok(())
    }

    pub fn append(&self, envelope: &Envelope) -> BrokerResult<ProduceAck> {
        self.check_available()?;
        let mut state = self.inner.state.lock();
        let topic = state
            .topics
            .get_mut(&envelope.topic)
            .ok_or_else(|| BrokerError::UnknownTopic(envelope.topic.clone()))?;
        let log = topic
            .partitions
            .get_mut(envelope.partition as usize)
            .ok_or_else(|| BrokerError::UnknownPartition {
                topic: envelope.topic.clone(),
                partition: envelope.partition,
            })?;

        let offset = log.len() as u64;
        log.push(StoredRecord {
            key: None,
            value: envelope.payload.clone(),
            timestamp: envelope.timestamp,
        });
        self.inner.counters.envelopes.fetch_add(1, Ordering::SeqCst);

        debug!(topic = %envelope.topic, partition = envelope.partition, offset, "appended envelope");
        Ok(ProduceAck {
            partition: envelope.partition,
            offset,
        })
    }

    /// Record at the group's committed offset (0 when the group never committed).
    pub fn fetch(&self, topic: &str, partition: u32, group: &str) -> BrokerResult<Option<FetchedRecord>> {
        self.check_available()?;
        let state = self.inner.state.lock();
        let log = Self::partition_log(&state, topic, partition)?;
        let offset = state.offsets.fetch(group, topic, partition).unwrap_or(0);

        Ok(log.get(offset as usize).map(|record| FetchedRecord {
            offset,
            key: record.key.clone(),
            value: record.value.clone(),
            timestamp: record.timestamp,
        }))
    }

    pub fn commit(&self, topic: &str, partition: u32, group: &str, next_offset: u64) -> BrokerResult<()> {
        self.check_available()?;
        let mut state = self.inner.state.lock();
        Self::partition_log(&state, topic, partition)?;
        state.offsets.commit(group, topic, partition, next_offset);
        Ok(())
    }

    pub fn committed(&self, group: &str, topic: &str, partition: u32) -> Option<u64> {
        self.inner.state.lock().offsets.fetch(group, topic, partition)
    }

    /// Payloads stored on a topic-partition, oldest first.
    pub fn payloads(&self, topic: &str, partition: u32) -> Vec<String> {
        let state = self.inner.state.lock();
        Self::partition_log(&state, topic, partition)
            .map(|log| log.iter().map(|r| r.value.clone()).collect())
            .unwrap_or_default()
    }

    /// Envelopes accepted since the broker was created.
    pub fn envelopes_received(&self) -> u64 {
        self.inner.counters.envelopes.load(Ordering::SeqCst)
    }

    pub fn admin_handles_created(&self) -> u64 {
        self.inner.counters.admin_handles.load(Ordering::SeqCst)
    }

    pub fn producer_handles_created(&self) -> u64 {
        self.inner.counters.producer_handles.load(Ordering::SeqCst)
    }

    pub fn subscriptions_opened(&self) -> u64 {
        self.inner.counters.subscriptions.load(Ordering::SeqCst)
    }

    fn partition_log<'a>(
        state: &'a BrokerState,
        topic: &str,
        partition: u32,
    ) -> BrokerResult<&'a Vec<StoredRecord>> {
        let t = state
            .topics
            .get(topic)
            .ok_or_else(|| BrokerError::UnknownTopic(topic.to_string()))?;
        t.partitions
            .get(partition as usize)
            .ok_or_else(|| BrokerError::UnknownPartition {
                topic: topic.to_string(),
                partition,
            })
    }
}

/// Resolves clients bound to one shared [`MemoryBroker`].
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    broker: MemoryBroker,
}

impl MemoryConnector {
    pub fn new(broker: MemoryBroker) -> Self {
        Self { broker }
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, config: &ClientConfig) -> BrokerResult<Arc<dyn BrokerClient>> {
        self.broker.check_available()?;
        debug!(node = %config.name, "resolved in-memory client");
        Ok(Arc::new(MemoryClient {
            broker: self.broker.clone(),
        }))
    }
}

struct MemoryClient {
    broker: MemoryBroker,
}

#[async_trait]
impl BrokerClient for MemoryClient {
    fn is_live(&self) -> bool {
        self.broker.is_available()
    }

    async fn load_metadata(&self) -> BrokerResult<()> {
        self.broker.metadata(&[]).map(|_| ())
    }

    async fn missing_topics(&self, topics: &[String]) -> BrokerResult<Vec<String>> {
        self.broker.missing_topics(topics)
    }

    async fn admin(&self) -> BrokerResult<Arc<dyn AdminHandle>> {
        self.broker.check_available()?;
        self.broker.inner.counters.admin_handles.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(self.broker.clone()))
    }

    async fn producer(&self) -> BrokerResult<Arc<dyn ProducerHandle>> {
        self.broker.check_available()?;
        self.broker.inner.counters.producer_handles.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(self.broker.clone()))
    }

    async fn subscribe(&self, target: &SubscriptionTarget) -> BrokerResult<Box<dyn SubscriptionSource>> {
        self.broker.check_available()?;
        self.broker.inner.counters.subscriptions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemorySubscription {
            broker: self.broker.clone(),
            target: target.clone(),
        }))
    }
}

#[async_trait]
impl AdminHandle for MemoryBroker {
    async fn list_topics(&self) -> BrokerResult<BTreeMap<String, TopicMetadata>> {
        Ok(self
            .metadata(&[])?
            .into_iter()
            .map(|meta| (meta.name.clone(), meta))
            .collect())
    }

    async fn create_topics(&self, specs: &[TopicSpec]) -> BrokerResult<()> {
        MemoryBroker::create_topics(self, specs)
    }
}

#[async_trait]
impl ProducerHandle for MemoryBroker {
    async fn send(&self, envelope: &Envelope) -> BrokerResult<ProduceAck> {
        self.append(envelope)
    }
}

struct MemorySubscription {
    broker: MemoryBroker,
    target: SubscriptionTarget,
}

#[async_trait]
impl SubscriptionSource for MemorySubscription {
    async fn fetch(&mut self) -> BrokerResult<Option<FetchedRecord>> {
        self.broker
            .fetch(&self.target.topic, self.target.partition, &self.target.group_id)
    }

    async fn commit(&mut self, next_offset: u64) -> BrokerResult<()> {
        self.broker.commit(
            &self.target.topic,
            self.target.partition,
            &self.target.group_id,
            next_offset,
        )
    }
}
