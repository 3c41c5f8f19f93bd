use std::fmt;
use std::sync::Arc;
use serde_json::Value;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use crate::error::Error;

/// Every state transition the façade reports. The name table is closed: parsing an
/// unknown name with `EventKind::from_str` fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    WaitResolve,
    ConnectOk,
    ConnectNotOk,
    MetadataOk,
    NoClient,
    TopicsList,
    TopicsCreate,
    TopicsExist,
    TopicsNotExist,
    ConsumerStart,
    ConsumerMessage,
    #[strum(serialize = "CONSUMER_NOT_A_TOPIC")]
    ConsumerNotATopic,
    ConsumerId,
    ConsumerListId,
    ConsumerPause,
    ConsumerNotPause,
    ConsumerResume,
    ConsumerNotResume,
    ConsumerClose,
    ConsumerNotClose,
    ProducerStart,
    ProducerManyStart,
    #[strum(serialize = "PRODUCER_NOT_A_TOPIC")]
    ProducerNotATopic,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

impl EventKind {
    pub fn message(self) -> &'static str {
        match self {
            EventKind::WaitResolve => "===> Waiting to resolve...",
            EventKind::ConnectOk => "===> Connected to Kafka",
            EventKind::ConnectNotOk => "===> Error connecting to Kafka",
            EventKind::MetadataOk => "===> Metadata loaded",
            EventKind::NoClient => "===> Error: No client available",
            EventKind::TopicsList => "===> Listing topics...",
            EventKind::TopicsCreate => "===> Creating topics...",
            EventKind::TopicsExist => "===> Topics already exist",
            EventKind::TopicsNotExist => "===> Topics not exist",
            EventKind::ConsumerStart => "===> Listening on topic",
            EventKind::ConsumerMessage => "===> Message received on topic",
            EventKind::ConsumerNotATopic => "===> Can't listen on topic, doesn't exist:",
            EventKind::ConsumerId => "===> Consumer id already in use, assigned:",
            EventKind::ConsumerListId => "===> Listing consumers",
            EventKind::ConsumerPause => "===> Consumer paused",
            EventKind::ConsumerNotPause => "===> Can't pause consumer, not found:",
            EventKind::ConsumerResume => "===> Consumer resumed",
            EventKind::ConsumerNotResume => "===> Can't resume consumer, not found:",
            EventKind::ConsumerClose => "===> Consumer closed",
            EventKind::ConsumerNotClose => "===> Can't close consumer, not found:",
            EventKind::ProducerStart => "===> Sending message to topic",
            EventKind::ProducerManyStart => "===> Sending messages to topic",
            EventKind::ProducerNotATopic => "===> Can't send to topic, doesn't exist:",
            EventKind::Error => "===> Unexpected error:",
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            EventKind::ConnectNotOk | EventKind::NoClient | EventKind::Error => Severity::Error,
            EventKind::TopicsNotExist
            | EventKind::ConsumerNotATopic
            | EventKind::ConsumerId
            | EventKind::ConsumerNotPause
            | EventKind::ConsumerNotResume
            | EventKind::ConsumerNotClose
            | EventKind::ProducerNotATopic => Severity::Warn,
            _ => Severity::Info,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    pub payload: Value,
}

impl Event {
    pub fn message(&self) -> &'static str {
        self.kind.message()
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.payload.is_null() {
            write!(f, "{}", self.message())
        } else {
            write!(f, "{} {}", self.message(), self.payload)
        }
    }
}

/// Receives every emitted event. Implementations must not block.
pub trait EventObserver: Send + Sync {
    fn on_event(&self, event: &Event);
}

/// Renders events through `tracing`, tagged with the node's display name.
#[derive(Debug, Clone)]
pub struct TracingObserver {
    node: String,
}

impl TracingObserver {
    pub fn new(node: impl Into<String>) -> Self {
        Self { node: node.into() }
    }
}

impl EventObserver for TracingObserver {
    fn on_event(&self, event: &Event) {
        let name: &'static str = event.kind.into();
        match event.kind.severity() {
            Severity::Info => info!(node = %self.node, event = name, "{}", event),
            Severity::Warn => warn!(node = %self.node, event = name, "{}", event),
            Severity::Error => error!(node = %self.node, event = name, "{}", event),
        }
    }
}

/// Forwards events into an unbounded channel; the receiving side decides what to keep.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<Event>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventObserver for ChannelObserver {
    fn on_event(&self, event: &Event) {
        // a dropped receiver just means nobody is listening any more
        let _ = self.tx.send(event.clone());
    }
}

/// Fire-and-forget fan-out to the observers injected at construction.
#[derive(Clone, Default)]
pub struct EventBus {
    observers: Arc<Vec<Arc<dyn EventObserver>>>,
}

impl EventBus {
    pub fn new(observers: Vec<Arc<dyn EventObserver>>) -> Self {
        Self {
            observers: Arc::new(observers),
        }
    }

    pub fn with_tracing(node: impl Into<String>) -> Self {
        Self::new(vec![Arc::new(TracingObserver::new(node))])
    }

    pub fn emit(&self, kind: EventKind, payload: Value) {
        let event = Event { kind, payload };
        for observer in self.observers.iter() {
            observer.on_event(&event);
        }
    }

    /// Passes `result` through, reporting an `ERROR` event for failures that have no
    /// dedicated event of their own.
    pub(crate) fn observe<T>(&self, result: Result<T, Error>) -> Result<T, Error> {
        if let Err(e) = &result {
            if !e.has_dedicated_event() {
                self.emit(EventKind::Error, Value::String(e.to_string()));
            }
        }
        result
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use serde_json::json;
    use strum::IntoEnumIterator;

    #[test]
    fn test_names_follow_the_event_table() {
        assert_eq!(EventKind::WaitResolve.to_string(), "WAIT_RESOLVE");
        assert_eq!(EventKind::ConsumerNotATopic.to_string(), "CONSUMER_NOT_A_TOPIC");
        assert_eq!(EventKind::ConsumerListId.to_string(), "CONSUMER_LIST_ID");
        assert_eq!(EventKind::from_str("PRODUCER_MANY_START").unwrap(), EventKind::ProducerManyStart);
    }

    #[test]
    fn test_unknown_name_is_rejected() {
        assert!(EventKind::from_str("CONSUMER_EXPLODED").is_err());
    }

    #[test]
    fn test_every_kind_has_a_message() {
        for kind in EventKind::iter() {
            assert!(kind.message().starts_with("===>"), "{} has no message", kind);
            assert_eq!(EventKind::from_str(&kind.to_string()).unwrap(), kind);
        }
    }

    #[test]
    fn test_every_observer_sees_the_event() {
        let (first, mut first_rx) = ChannelObserver::new();
        let (second, mut second_rx) = ChannelObserver::new();
        let bus = EventBus::new(vec![Arc::new(first), Arc::new(second)]);

        bus.emit(EventKind::ConnectOk, json!({ "host": "localhost:9092" }));

        let a = first_rx.try_recv().unwrap();
        let b = second_rx.try_recv().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.kind, EventKind::ConnectOk);
        assert_eq!(a.to_string(), r#"===> Connected to Kafka {"host":"localhost:9092"}"#);
    }

    #[test]
    fn test_emit_without_receiver_is_harmless() {
        let (observer, rx) = ChannelObserver::new();
        drop(rx);
        let bus = EventBus::new(vec![Arc::new(observer)]);
        bus.emit(EventKind::Error, Value::Null);
    }

    #[test]
    fn test_observe_skips_errors_with_dedicated_events() {
        let (observer, mut rx) = ChannelObserver::new();
        let bus = EventBus::new(vec![Arc::new(observer)]);

        let _ = bus.observe::<()>(Err(Error::NoClient));
        assert!(rx.try_recv().is_err());

        let _ = bus.observe::<()>(Err(Error::MessagesNotArray));
        assert_eq!(rx.try_recv().unwrap().kind, EventKind::Error);
    }
}
