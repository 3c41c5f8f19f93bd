use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};
use crate::error::BrokerError;

pub use kafkanode_protocol::ProduceAck;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub name: String,
    pub value: String,
}

impl ConfigEntry {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Topic descriptor submitted for creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicSpec {
    #[serde(rename = "topic")]
    pub name: String,
    pub partitions: u32,
    pub replication_factor: u16,
    #[serde(default)]
    pub config_entries: Vec<ConfigEntry>,
}

impl TopicSpec {
    pub fn new(name: impl Into<String>, partitions: u32) -> Self {
        Self {
            name: name.into(),
            partitions,
            replication_factor: 1,
            config_entries: Vec::new(),
        }
    }

    pub fn replication_factor(mut self, factor: u16) -> Self {
        self.replication_factor = factor;
        self
    }

    pub fn config_entry(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config_entries.push(ConfigEntry::new(name, value));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionMetadata {
    pub partition: u32,
    pub high_watermark: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicMetadata {
    pub name: String,
    pub partitions: Vec<PartitionMetadata>,
}

/// Compression attribute carried by every envelope.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize_repr, Deserialize_repr, clap::ValueEnum,
)]
#[repr(i8)]
pub enum Compression {
    #[default]
    None = 0,
    Gzip = 1,
    Snappy = 2,
}

impl TryFrom<i8> for Compression {
    type Error = BrokerError;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Compression::None),
            1 => Ok(Compression::Gzip),
            2 => Ok(Compression::Snappy),
            other => Err(BrokerError::Rejected(format!("unknown compression attribute {}", other))),
        }
    }
}

/// One publish call on the wire: a single text payload for one topic-partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub topic: String,
    pub partition: u32,
    pub payload: String,
    pub compression: Compression,
    /// Unix epoch millis.
    pub timestamp: u64,
}

impl Envelope {
    pub fn new(topic: impl Into<String>, partition: u32, payload: String, compression: Compression) -> Self {
        Self {
            topic: topic.into(),
            partition,
            payload,
            compression,
            timestamp: Utc::now().timestamp_millis() as u64,
        }
    }
}

/// Where a subscription reads from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionTarget {
    pub topic: String,
    pub partition: u32,
    pub group_id: String,
}

/// A record read by a subscription, before it is tagged with a consumer id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedRecord {
    pub offset: u64,
    pub key: Option<String>,
    pub value: String,
    pub timestamp: u64,
}
