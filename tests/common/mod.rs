#![allow(dead_code)]

pub mod server;

use std::time::Duration;
use kafkanode::broker::MemoryBroker;
use kafkanode::{
    ChannelObserver, ClientConfig, ConsumedRecord, Delivery, Event, EventKind, EventObserver,
    KafkaNode, TopicSpec,
};
use std::sync::Arc;
use tokio::sync::mpsc;

pub const WAIT: Duration = Duration::from_secs(3);

pub fn test_config() -> ClientConfig {
    let mut config = ClientConfig::default();
    config.name = "test-node".to_string();
    config.connection_timeout_ms = 1_000;
    config.request_timeout_ms = 2_000;
    config.consumer.poll_interval_ms = 10;
    config
}

/// A node over an in-memory broker, with every event captured.
pub struct Harness {
    pub node: KafkaNode,
    pub broker: MemoryBroker,
    pub events: mpsc::UnboundedReceiver<Event>,
}

impl Harness {
    pub fn new(config: ClientConfig) -> Self {
        let broker = MemoryBroker::new();
        let (observer, events) = ChannelObserver::new();
        let observers: Vec<Arc<dyn EventObserver>> = vec![Arc::new(observer)];
        let node = KafkaNode::with_observers(
            config,
            Arc::new(kafkanode::MemoryConnector::new(broker.clone())),
            observers,
        );
        Harness { node, broker, events }
    }

    /// Connected, with `topics` already created.
    pub async fn connected(topics: &[TopicSpec]) -> Self {
        let mut harness = Self::new(test_config());
        assert!(harness.node.connect().await);
        if !topics.is_empty() {
            assert!(harness.node.create_topics(topics).await.unwrap());
        }
        harness.drain_events();
        harness
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        let mut seen = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            seen.push(event);
        }
        seen
    }

    pub fn drain_kinds(&mut self) -> Vec<EventKind> {
        self.drain_events().into_iter().map(|e| e.kind).collect()
    }
}

pub async fn next_record(rx: &mut mpsc::Receiver<Delivery>) -> ConsumedRecord {
    match tokio::time::timeout(WAIT, rx.recv()).await {
        Ok(Some(Ok(record))) => record,
        Ok(Some(Err(e))) => panic!("delivery failed: {}", e),
        Ok(None) => panic!("delivery channel closed"),
        Err(_) => panic!("no record within {:?}", WAIT),
    }
}

pub async fn next_delivery(rx: &mut mpsc::Receiver<Delivery>) -> Delivery {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("no delivery in time")
        .expect("delivery channel closed")
}

/// Nothing arrives for `quiet`.
pub async fn assert_quiet(rx: &mut mpsc::Receiver<Delivery>, quiet: Duration) {
    if let Ok(Some(delivery)) = tokio::time::timeout(quiet, rx.recv()).await {
        panic!("unexpected delivery: {:?}", delivery.map(|r| r.message));
    }
}

/// Polls `check` until it holds or [`WAIT`] runs out.
pub async fn eventually<F: FnMut() -> bool>(mut check: F) -> bool {
    let deadline = tokio::time::Instant::now() + WAIT;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
