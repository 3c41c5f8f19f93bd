use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use crate::broker::{Connector, MemoryBroker, MemoryConnector, WireConnector};
use crate::config::ClientConfig;
use crate::connection::{ConnectionManager, ConnectionState};
use crate::consumer::{ConsumeRequest, ConsumerRegistration, ConsumerRegistry, ConsumerState, Delivery};
use crate::error::Result;
use crate::events::{EventBus, EventObserver};
use crate::producer::{ProduceManyRequest, ProduceRequest, ProducerDispatcher};
use crate::topics::TopicRegistrar;
use crate::types::{ProduceAck, TopicMetadata, TopicSpec};

/// Entry point: one broker connection with its topic, producer and consumer
/// components wired together. `connect` must succeed before anything else does.
pub struct KafkaNode {
    events: EventBus,
    connection: Arc<ConnectionManager>,
    topics: Arc<TopicRegistrar>,
    producer: ProducerDispatcher,
    consumers: ConsumerRegistry,
}

impl KafkaNode {
    /// Events are logged through `tracing`.
    pub fn new(config: ClientConfig, connector: Arc<dyn Connector>) -> Self {
        let events = EventBus::with_tracing(config.name.clone());
        Self::with_events(config, connector, events)
    }

    pub fn with_observers(
        config: ClientConfig,
        connector: Arc<dyn Connector>,
        observers: Vec<Arc<dyn EventObserver>>,
    ) -> Self {
        Self::with_events(config, connector, EventBus::new(observers))
    }

    pub fn with_events(config: ClientConfig, connector: Arc<dyn Connector>, events: EventBus) -> Self {
        let settings = config.consumer.clone();
        let request_timeout = config.request_timeout();
        let config = Arc::new(config);

        let connection = Arc::new(ConnectionManager::new(config, connector, events.clone()));
        let topics = Arc::new(TopicRegistrar::new(connection.clone(), events.clone()));
        let producer = ProducerDispatcher::new(topics.clone(), events.clone());
        let consumers = ConsumerRegistry::new(topics.clone(), events.clone(), settings, request_timeout);

        Self {
            events,
            connection,
            topics,
            producer,
            consumers,
        }
    }

    /// Talks to `config.host` over TCP.
    pub fn wire(config: ClientConfig) -> Self {
        Self::new(config, Arc::new(WireConnector::new()))
    }

    pub fn in_memory(config: ClientConfig, broker: MemoryBroker) -> Self {
        Self::new(config, Arc::new(MemoryConnector::new(broker)))
    }

    pub fn config(&self) -> &ClientConfig {
        self.connection.config()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub async fn connect(&self) -> bool {
        self.connection.connect().await
    }

    pub async fn topics_exist<S: AsRef<str>>(&self, names: &[S]) -> Result<bool> {
        self.topics.topics_exist(names).await
    }

    pub async fn list_topics(&self) -> Result<BTreeMap<String, TopicMetadata>> {
        self.topics.list_topics().await
    }

    pub async fn create_topics(&self, specs: &[TopicSpec]) -> Result<bool> {
        self.topics.create_topics(specs).await
    }

    pub async fn produce_on_topic(&self, req: ProduceRequest) -> Result<ProduceAck> {
        self.producer.produce_on_topic(req).await
    }

    pub async fn produce_many_on_topic(&self, req: ProduceManyRequest) -> Result<ProduceAck> {
        self.producer.produce_many_on_topic(req).await
    }

    pub fn delivery_channel(&self) -> (mpsc::Sender<Delivery>, mpsc::Receiver<Delivery>) {
        self.consumers.delivery_channel()
    }

    pub async fn consume_on_topic(
        &self,
        req: ConsumeRequest,
        sink: mpsc::Sender<Delivery>,
    ) -> Result<ConsumerRegistration> {
        self.consumers.consume_on_topic(req, sink).await
    }

    pub async fn list_consumers(&self) -> Vec<String> {
        self.consumers.list_consumers().await
    }

    pub async fn pause_consumer(&self, id: &str) -> bool {
        self.consumers.pause_consumer(id).await
    }

    pub async fn resume_consumer(&self, id: &str) -> bool {
        self.consumers.resume_consumer(id).await
    }

    pub async fn close_consumer(&self, id: &str) -> bool {
        self.consumers.close_consumer(id).await
    }

    pub async fn consumer_state(&self, id: &str) -> Option<ConsumerState> {
        self.consumers.consumer_state(id).await
    }

    pub fn consumers(&self) -> &ConsumerRegistry {
        &self.consumers
    }
}
