mod common;

use std::sync::Arc;
use std::time::Duration;
use kafkanode::{
    BrokerError, ChannelObserver, ClientConfig, ConnectionState, ConsumeRequest, Error, Event,
    EventKind, EventObserver, KafkaNode, ProduceManyRequest, ProduceRequest, TopicSpec,
    WireConnector,
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use crate::common::server::TestBroker;
use crate::common::{eventually, next_delivery, next_record, test_config};

fn wire_node(config: ClientConfig) -> (KafkaNode, mpsc::UnboundedReceiver<Event>) {
    let (observer, events) = ChannelObserver::new();
    let observers: Vec<Arc<dyn EventObserver>> = vec![Arc::new(observer)];
    let node = KafkaNode::with_observers(config, Arc::new(WireConnector::new()), observers);
    (node, events)
}

fn config_for(host: String) -> ClientConfig {
    let mut config = test_config();
    config.host = host;
    config
}

fn kinds(events: &mut mpsc::UnboundedReceiver<Event>) -> Vec<EventKind> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event.kind);
    }
    seen
}

#[tokio::test]
async fn test_produce_and_consume_over_tcp() {
    let server = TestBroker::start().await;
    let (node, _events) = wire_node(config_for(server.host()));

    assert!(node.connect().await);
    assert!(node.create_topics(&[TopicSpec::new("orders", 1)]).await.unwrap());
    assert!(node.topics_exist(&["orders"]).await.unwrap());

    let ack = node
        .produce_on_topic(ProduceRequest::new("orders", json!({ "message": "hello" })))
        .await
        .unwrap();
    assert_eq!((ack.partition, ack.offset), (0, 0));

    let (sink, mut records) = node.delivery_channel();
    let registration = node
        .consume_on_topic(ConsumeRequest::new("orders").group_id("g1"), sink)
        .await
        .unwrap();

    let record = next_record(&mut records).await;
    assert_eq!(record.message, r#"{"message":"hello"}"#);
    assert_eq!(record.partition, 0);
    assert_eq!(record.consumer_id, registration.id);

    assert!(eventually(|| server.broker.committed("g1", "orders", 0) == Some(1)).await);
}

#[tokio::test]
async fn test_batch_and_metadata_over_tcp() {
    let server = TestBroker::start().await;
    let (node, _events) = wire_node(config_for(server.host()));
    assert!(node.connect().await);
    node.create_topics(&[
        TopicSpec::new("clicks", 2).config_entry("retention.ms", "1000"),
        TopicSpec::new("views", 1),
    ])
    .await
    .unwrap();

    node.produce_many_on_topic(ProduceManyRequest::new("clicks", json!([1, [2, 3]])).partition(1))
        .await
        .unwrap();

    assert_eq!(server.broker.payloads("clicks", 1), vec!["[1,2,3]"]);
    let topics = node.list_topics().await.unwrap();
    assert_eq!(topics.len(), 2);
    assert_eq!(topics["clicks"].partitions[1].high_watermark, 1);
    assert!(!node.topics_exist(&["clicks", "nope"]).await.unwrap());
}

#[tokio::test]
async fn test_broker_error_frames_become_errors() {
    let server = TestBroker::start().await;
    let (node, _events) = wire_node(config_for(server.host()));
    assert!(node.connect().await);
    node.create_topics(&[TopicSpec::new("orders", 1)]).await.unwrap();

    let err = node
        .produce_on_topic(ProduceRequest::new("orders", json!({})).partition(9))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Broker(BrokerError::Rejected(_))));

    // the connection is still usable after an error frame
    let ack = node
        .produce_on_topic(ProduceRequest::new("orders", json!({})))
        .await
        .unwrap();
    assert_eq!(ack.offset, 0);

    server.broker.set_available(false);
    let err = node.list_topics().await.unwrap_err();
    assert!(matches!(err, Error::Broker(BrokerError::Unavailable(_))));
}

#[tokio::test]
async fn test_connect_to_closed_port_fails() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (node, mut events) = wire_node(config_for(addr.to_string()));
    assert!(!node.connect().await);
    assert_eq!(node.connection_state(), ConnectionState::Failed);
    assert_eq!(kinds(&mut events), vec![EventKind::WaitResolve, EventKind::ConnectNotOk]);
    assert!(matches!(node.list_topics().await, Err(Error::NoClient)));
}

#[tokio::test]
async fn test_silent_broker_hits_request_timeout() {
    // accepts connections and never answers
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accept = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let mut config = config_for(addr.to_string());
    config.request_timeout_ms = 100;
    let (node, mut events) = wire_node(config);

    // the connection stands even though the metadata sync timed out
    assert!(node.connect().await);
    assert_eq!(node.connection_state(), ConnectionState::Connected);
    assert_eq!(
        kinds(&mut events),
        vec![EventKind::WaitResolve, EventKind::ConnectOk, EventKind::Error]
    );

    let started = tokio::time::Instant::now();
    let err = node.list_topics().await.unwrap_err();
    assert!(matches!(err, Error::Broker(BrokerError::Timeout(_))));
    assert!(started.elapsed() < Duration::from_secs(2));

    accept.abort();
}

#[tokio::test]
async fn test_pause_over_tcp_keeps_offsets() {
    let server = TestBroker::start().await;
    let (node, _events) = wire_node(config_for(server.host()));
    assert!(node.connect().await);
    node.create_topics(&[TopicSpec::new("orders", 1)]).await.unwrap();

    let (sink, mut records) = node.delivery_channel();
    node.consume_on_topic(ConsumeRequest::new("orders").group_id("g1").consumer_id("tcp"), sink)
        .await
        .unwrap();
    assert!(node.pause_consumer("tcp").await);

    node.produce_on_topic(ProduceRequest::new("orders", "while paused"))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(server.broker.committed("g1", "orders", 0), None);

    assert!(node.resume_consumer("tcp").await);
    assert_eq!(next_record(&mut records).await.message, "while paused");
}

#[tokio::test]
async fn test_dropped_connections_are_reopened() {
    let server = TestBroker::start().await;
    let (node, _events) = wire_node(config_for(server.host()));
    assert!(node.connect().await);
    node.create_topics(&[TopicSpec::new("orders", 1)]).await.unwrap();

    let (sink, mut records) = node.delivery_channel();
    node.consume_on_topic(ConsumeRequest::new("orders").group_id("g1").consumer_id("tcp"), sink)
        .await
        .unwrap();
    node.produce_on_topic(ProduceRequest::new("orders", "before"))
        .await
        .unwrap();
    assert_eq!(next_record(&mut records).await.message, "before");
    assert!(eventually(|| server.broker.committed("g1", "orders", 0) == Some(1)).await);

    server.drop_connections().await;

    // a connection found broken fails at most its own request, the next one reconnects
    let mut ack = None;
    for _ in 0..3 {
        match node.produce_on_topic(ProduceRequest::new("orders", "after")).await {
            Ok(a) => {
                ack = Some(a);
                break;
            }
            Err(e) => assert!(matches!(e, Error::Broker(BrokerError::Io(_))), "{}", e),
        }
    }
    assert_eq!(ack.map(|a| a.offset), Some(1));
    node.produce_on_topic(ProduceRequest::new("orders", "again"))
        .await
        .unwrap();

    // the subscription reconnects too; a broken fetch may surface as an error first
    let mut seen = Vec::new();
    while seen.len() < 2 {
        match next_delivery(&mut records).await {
            Ok(record) => seen.push(record.message),
            Err(e) => assert_eq!(e.consumer_id, "tcp"),
        }
    }
    assert_eq!(seen, vec!["after", "again"]);
    assert!(node.list_topics().await.is_ok());
}
