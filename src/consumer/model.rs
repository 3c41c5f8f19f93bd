use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use crate::error::{BrokerError, Error, Result};

/// Where and under which id to consume. Without a consumer id a fresh one is
/// generated; without a group the configured default group is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumeRequest {
    pub topic: String,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub partition: u32,
    #[serde(default)]
    pub consumer_id: Option<String>,
}

impl ConsumeRequest {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            group_id: None,
            partition: 0,
            consumer_id: None,
        }
    }

    pub fn group_id(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    pub fn partition(mut self, partition: u32) -> Self {
        self.partition = partition;
        self
    }

    pub fn consumer_id(mut self, consumer_id: impl Into<String>) -> Self {
        self.consumer_id = Some(consumer_id.into());
        self
    }

    /// Builds a request from its JSON shape `{topic, groupId, partition, consumerId?}`.
    pub fn from_value(value: Value) -> Result<Self> {
        match value.get("consumerId") {
            None | Some(Value::Null) | Some(Value::String(_)) => {}
            Some(_) => return Err(Error::ConsumerIdNotString),
        }
        serde_json::from_value(value).map_err(|e| Error::InvalidRequest(e.to_string()))
    }
}

/// One inbound message, tagged with the id of the consumer that received it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumedRecord {
    pub consumer_id: String,
    pub topic: String,
    pub message: String,
    pub partition: u32,
    pub key: Option<String>,
    pub offset: u64,
}

#[derive(Debug, Error)]
#[error("consumer {consumer_id}: {source}")]
pub struct DeliveryError {
    pub consumer_id: String,
    pub source: BrokerError,
}

/// What a subscription hands to its sink: a record, or the failure that prevented one.
pub type Delivery = std::result::Result<ConsumedRecord, DeliveryError>;

/// Result of a registration. `id` is the id actually in use, which differs from
/// `requested_id` when the requested one collided with a registered consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerRegistration {
    pub id: String,
    pub requested_id: Option<String>,
}

impl ConsumerRegistration {
    pub fn renamed(&self) -> bool {
        self.requested_id.as_ref().is_some_and(|r| r != &self.id)
    }
}
