//! Backend seam. The façade never talks to a broker directly; it resolves a
//! [`BrokerClient`] through a [`Connector`] and asks it for admin, producer and
//! subscription handles.
//!
//! - **memory**: process-local broker, used for tests and embedding
//! - **wire**: TCP client speaking the `kafkanode-protocol` frames

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use crate::config::ClientConfig;
use crate::error::{BrokerError, BrokerResult};
use crate::types::{Envelope, FetchedRecord, ProduceAck, SubscriptionTarget, TopicMetadata, TopicSpec};

pub mod memory;
mod offset_tracker;
pub mod wire;

pub use memory::{MemoryBroker, MemoryConnector};
pub use wire::WireConnector;

/// Resolves a live client from configuration.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, config: &ClientConfig) -> BrokerResult<Arc<dyn BrokerClient>>;
}

/// A live broker session.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    fn is_live(&self) -> bool;

    /// One-time metadata synchronization right after connecting.
    async fn load_metadata(&self) -> BrokerResult<()>;

    /// Names from `topics` the broker does not know, in request order.
    async fn missing_topics(&self, topics: &[String]) -> BrokerResult<Vec<String>>;

    async fn admin(&self) -> BrokerResult<Arc<dyn AdminHandle>>;

    async fn producer(&self) -> BrokerResult<Arc<dyn ProducerHandle>>;

    async fn subscribe(&self, target: &SubscriptionTarget) -> BrokerResult<Box<dyn SubscriptionSource>>;
}

#[async_trait]
pub trait AdminHandle: Send + Sync {
    async fn list_topics(&self) -> BrokerResult<BTreeMap<String, TopicMetadata>>;

    /// All-or-nothing: either every descriptor is created or none is.
    async fn create_topics(&self, specs: &[TopicSpec]) -> BrokerResult<()>;
}

#[async_trait]
pub trait ProducerHandle: Send + Sync {
    /// Resolves once the broker acknowledged the envelope.
    async fn send(&self, envelope: &Envelope) -> BrokerResult<ProduceAck>;
}

/// Broker side of one consumer subscription, owned by its delivery task.
#[async_trait]
pub trait SubscriptionSource: Send {
    /// Next record at the group's committed offset, `None` when caught up.
    async fn fetch(&mut self) -> BrokerResult<Option<FetchedRecord>>;

    /// Stores `next_offset` as the group's position.
    async fn commit(&mut self, next_offset: u64) -> BrokerResult<()>;
}

pub(crate) async fn with_deadline<T, F>(deadline: Duration, fut: F) -> BrokerResult<T>
where
    F: Future<Output = BrokerResult<T>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(BrokerError::Timeout(deadline)),
    }
}
