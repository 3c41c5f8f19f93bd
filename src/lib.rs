//! Façade over a publish/subscribe broker: connection lifecycle, topic
//! provisioning, message production and a registry of named consumer
//! subscriptions with pause/resume/close control.

pub mod bootstrap;
pub mod broker;
pub mod config;
pub mod connection;
pub mod consumer;
pub mod error;
pub mod events;
pub mod node;
pub mod producer;
pub mod topics;
pub mod types;

pub use bootstrap::{bootstrap, BootstrapReport};
pub use broker::{MemoryBroker, MemoryConnector, WireConnector};
pub use config::{ClientConfig, ConsumerSettings};
pub use connection::ConnectionState;
pub use consumer::{
    ConsumeRequest, ConsumedRecord, ConsumerRegistration, ConsumerState, Delivery, DeliveryError,
    IdMatch,
};
pub use error::{BrokerError, Error, Result};
pub use events::{ChannelObserver, Event, EventBus, EventKind, EventObserver, TracingObserver};
pub use node::KafkaNode;
pub use producer::{ProduceManyRequest, ProduceRequest};
pub use types::{Compression, ConfigEntry, ProduceAck, TopicMetadata, TopicSpec};
