use std::collections::BTreeMap;
use std::sync::Arc;
use serde_json::{json, Value};
use tracing::debug;
use crate::connection::{ConnectionManager, Session};
use crate::error::{Error, Result};
use crate::events::{EventBus, EventKind};
use crate::types::{TopicMetadata, TopicSpec};

/// Topic existence checks, listing and creation. Nothing about topics is cached:
/// every call asks the broker.
pub struct TopicRegistrar {
    connection: Arc<ConnectionManager>,
    events: EventBus,
}

impl TopicRegistrar {
    pub fn new(connection: Arc<ConnectionManager>, events: EventBus) -> Self {
        Self { connection, events }
    }

    /// True only if every name exists.
    pub async fn topics_exist<S: AsRef<str>>(&self, names: &[S]) -> Result<bool> {
        let names: Vec<String> = names.iter().map(|n| n.as_ref().to_string()).collect();
        let result = self.check_exist(&names).await;
        self.events.observe(result)
    }

    pub async fn list_topics(&self) -> Result<BTreeMap<String, TopicMetadata>> {
        let result = self.list().await;
        self.events.observe(result)
    }

    /// Creates every descriptor in one batch, or nothing at all when any of the named
    /// topics already exists (returns `false` then).
    pub async fn create_topics(&self, specs: &[TopicSpec]) -> Result<bool> {
        let result = self.create(specs).await;
        self.events.observe(result)
    }

    /// Session for an operation on `topic`; emits `missing` and fails with `NoTopic`
    /// when the broker does not know the topic.
    pub(crate) async fn require_topic(&self, topic: &str, missing: EventKind) -> Result<Arc<Session>> {
        let session = self.connection.session()?;
        let unknown = session
            .bounded(session.client().missing_topics(&[topic.to_string()]))
            .await?;
        if !unknown.is_empty() {
            self.events.emit(missing, Value::String(topic.to_string()));
            return Err(Error::NoTopic(topic.to_string()));
        }
        Ok(session)
    }

    async fn check_exist(&self, names: &[String]) -> Result<bool> {
        let session = self.connection.session()?;
        let missing = session
            .bounded(session.client().missing_topics(names))
            .await?;

        if missing.is_empty() {
            self.events.emit(EventKind::TopicsExist, json!(names));
            Ok(true)
        } else {
            self.events.emit(EventKind::TopicsNotExist, json!(missing));
            Ok(false)
        }
    }

    async fn list(&self) -> Result<BTreeMap<String, TopicMetadata>> {
        let session = self.connection.session()?;
        let admin = session.admin().await?;
        let topics = session.bounded(admin.list_topics()).await?;
        self.events.emit(
            EventKind::TopicsList,
            json!(topics.keys().collect::<Vec<_>>()),
        );
        Ok(topics)
    }

    async fn create(&self, specs: &[TopicSpec]) -> Result<bool> {
        specs.iter().try_for_each(validate)?;
        let session = self.connection.session()?;
        if specs.is_empty() {
            return Ok(false);
        }

        let names: Vec<String> = specs.iter().map(|s| s.name.clone()).collect();
        let missing = session
            .bounded(session.client().missing_topics(&names))
            .await?;
        if missing.len() != names.len() {
            let existing: Vec<&String> = names.iter().filter(|n| !missing.contains(n)).collect();
            debug!(?existing, "skipping topic creation");
            self.events.emit(EventKind::TopicsExist, json!(existing));
            return Ok(false);
        }

        self.events.emit(EventKind::TopicsCreate, json!(names));
        let admin = session.admin().await?;
        session.bounded(admin.create_topics(specs)).await?;
        Ok(true)
    }
}

fn validate(spec: &TopicSpec) -> Result<()> {
    let reason = if spec.name.trim().is_empty() {
        "topic name is empty"
    } else if spec.partitions < 1 {
        "partitions must be at least 1"
    } else if spec.replication_factor < 1 {
        "replication factor must be at least 1"
    } else {
        return Ok(());
    };
    Err(Error::InvalidTopicSpec {
        topic: spec.name.clone(),
        reason,
    })
}
