use std::collections::BTreeMap;
use tracing::{info, warn};
use crate::node::KafkaNode;
use crate::types::{TopicMetadata, TopicSpec};

/// Outcome of [`bootstrap`]. Steps that did not run stay `None`.
#[derive(Debug, Default)]
pub struct BootstrapReport {
    pub connected: bool,
    pub topics_before: Option<BTreeMap<String, TopicMetadata>>,
    pub created: Option<bool>,
    pub topics_after: Option<BTreeMap<String, TopicMetadata>>,
    pub errors: Vec<String>,
}

/// Connects, lists topics, creates `topics` and lists again. A failing step is
/// recorded in the report and the remaining steps still run.
pub async fn bootstrap(node: &KafkaNode, topics: &[TopicSpec]) -> BootstrapReport {
    let mut report = BootstrapReport {
        connected: node.connect().await,
        ..BootstrapReport::default()
    };
    if !report.connected {
        warn!(host = %node.config().host, "bootstrap stopped, not connected");
        report.errors.push(format!("could not connect to {}", node.config().host));
        return report;
    }

    match node.list_topics().await {
        Ok(listed) => report.topics_before = Some(listed),
        Err(e) => report.errors.push(e.to_string()),
    }

    if !topics.is_empty() {
        match node.create_topics(topics).await {
            Ok(created) => report.created = Some(created),
            Err(e) => report.errors.push(e.to_string()),
        }
    }

    match node.list_topics().await {
        Ok(listed) => report.topics_after = Some(listed),
        Err(e) => report.errors.push(e.to_string()),
    }

    info!(
        created = ?report.created,
        topics = report.topics_after.as_ref().map(|t| t.len()),
        errors = report.errors.len(),
        "bootstrap finished"
    );
    report
}
