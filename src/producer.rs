use std::sync::Arc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;
use crate::connection::Session;
use crate::error::{Error, Result};
use crate::events::{EventBus, EventKind};
use crate::topics::TopicRegistrar;
use crate::types::{Compression, Envelope, ProduceAck};

/// One message for one topic-partition. A string message is sent as is; any other
/// value goes out as its JSON text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProduceRequest {
    pub topic: String,
    #[serde(default)]
    pub partition: u32,
    pub message: Value,
    #[serde(default)]
    pub compression: Compression,
}

impl ProduceRequest {
    pub fn new(topic: impl Into<String>, message: impl Into<Value>) -> Self {
        Self {
            topic: topic.into(),
            partition: 0,
            message: message.into(),
            compression: Compression::None,
        }
    }

    pub fn partition(mut self, partition: u32) -> Self {
        self.partition = partition;
        self
    }

    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }
}

/// A batch sent as a single envelope whose payload is a JSON array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProduceManyRequest {
    pub topic: String,
    #[serde(default)]
    pub partition: u32,
    pub messages: Value,
    #[serde(default)]
    pub compression: Compression,
}

impl ProduceManyRequest {
    pub fn new(topic: impl Into<String>, messages: impl Into<Value>) -> Self {
        Self {
            topic: topic.into(),
            partition: 0,
            messages: messages.into(),
            compression: Compression::None,
        }
    }

    pub fn partition(mut self, partition: u32) -> Self {
        self.partition = partition;
        self
    }

    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }
}

pub struct ProducerDispatcher {
    topics: Arc<TopicRegistrar>,
    events: EventBus,
}

impl ProducerDispatcher {
    pub fn new(topics: Arc<TopicRegistrar>, events: EventBus) -> Self {
        Self { topics, events }
    }

    /// Resolves once the broker acknowledged the envelope.
    pub async fn produce_on_topic(&self, req: ProduceRequest) -> Result<ProduceAck> {
        let result = self.produce_one(req).await;
        self.events.observe(result)
    }

    pub async fn produce_many_on_topic(&self, req: ProduceManyRequest) -> Result<ProduceAck> {
        let result = self.produce_batch(req).await;
        self.events.observe(result)
    }

    async fn produce_one(&self, req: ProduceRequest) -> Result<ProduceAck> {
        if req.message.is_array() {
            return Err(Error::MessageNotObject);
        }
        let payload = encode_message(&req.message)?;
        let session = self
            .topics
            .require_topic(&req.topic, EventKind::ProducerNotATopic)
            .await?;

        self.events.emit(
            EventKind::ProducerStart,
            json!({ "topic": req.topic, "partition": req.partition }),
        );
        let envelope = Envelope::new(req.topic, req.partition, payload, req.compression);
        self.send(&session, envelope).await
    }

    async fn produce_batch(&self, req: ProduceManyRequest) -> Result<ProduceAck> {
        let Value::Array(messages) = req.messages else {
            return Err(Error::MessagesNotArray);
        };
        let batch = flatten_one_level(messages);
        let count = batch.len();
        let payload = serde_json::to_string(&Value::Array(batch))?;
        let session = self
            .topics
            .require_topic(&req.topic, EventKind::ProducerNotATopic)
            .await?;

        self.events.emit(
            EventKind::ProducerManyStart,
            json!({ "topic": req.topic, "partition": req.partition, "count": count }),
        );
        let envelope = Envelope::new(req.topic, req.partition, payload, req.compression);
        self.send(&session, envelope).await
    }

    async fn send(&self, session: &Session, envelope: Envelope) -> Result<ProduceAck> {
        let producer = session.producer().await?;
        let ack = session.bounded(producer.send(&envelope)).await?;
        debug!(
            topic = %envelope.topic,
            partition = ack.partition,
            offset = ack.offset,
            bytes = envelope.payload.len(),
            "envelope acknowledged"
        );
        Ok(ack)
    }
}

pub(crate) fn encode_message(message: &Value) -> Result<String> {
    match message {
        Value::String(text) => Ok(text.clone()),
        other => Ok(serde_json::to_string(other)?),
    }
}

/// `[a, [b, c], [[d]]]` becomes `[a, b, c, [d]]`.
pub(crate) fn flatten_one_level(messages: Vec<Value>) -> Vec<Value> {
    let mut flat = Vec::with_capacity(messages.len());
    for message in messages {
        match message {
            Value::Array(inner) => flat.extend(inner),
            other => flat.push(other),
        }
    }
    flat
}
