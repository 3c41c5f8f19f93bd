use std::collections::BTreeMap;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use kafkanode_protocol::{
    CommitOffsetRequest, CreateTopicsRequest, ErrorResponse, FetchRequest, FetchResponse, Frame,
    FrameType, MetadataRequest, MetadataResponse, OpCode, Payload, ProduceAck, ProduceRequest,
    ProtocolError, TopicDescriptor,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, warn};
use crate::broker::{with_deadline, AdminHandle, BrokerClient, Connector, ProducerHandle, SubscriptionSource};
use crate::config::ClientConfig;
use crate::error::{BrokerError, BrokerResult};
use crate::types::{
    Envelope, FetchedRecord, PartitionMetadata, SubscriptionTarget, TopicMetadata, TopicSpec,
};

/// Resolves [`BrokerClient`]s that talk to `config.host` over TCP.
#[derive(Debug, Clone, Default)]
pub struct WireConnector;

impl WireConnector {
    pub fn new() -> Self {
        WireConnector
    }
}

#[async_trait]
impl Connector for WireConnector {
    async fn connect(&self, config: &ClientConfig) -> BrokerResult<Arc<dyn BrokerClient>> {
        let client = WireClient::connect(config).await?;
        Ok(Arc::new(client))
    }
}

#[derive(Debug, Clone)]
struct Endpoint {
    addr: String,
    connect_timeout: Duration,
    request_timeout: Duration,
    // shared by every connection opened from one client
    permits: Arc<Semaphore>,
}

struct Stream {
    socket: TcpStream,
    buf: BytesMut,
}

/// One TCP connection. Requests are strictly sequential on it; after a timeout or a
/// broken stream the socket is replaced on the next request.
struct WireConnection {
    stream: Mutex<Stream>,
    correlation_id: AtomicU32,
    live: AtomicBool,
    endpoint: Endpoint,
}

/// Marks the connection dead when a request is abandoned before its answer was read.
struct Exchange<'a> {
    live: &'a AtomicBool,
    finished: bool,
}

impl Exchange<'_> {
    fn finish(mut self) {
        self.finished = true;
    }
}

impl Drop for Exchange<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.live.store(false, Ordering::SeqCst);
        }
    }
}

impl Stream {
    async fn connect(endpoint: &Endpoint) -> BrokerResult<Self> {
        let socket = with_deadline(endpoint.connect_timeout, async {
            TcpStream::connect(&endpoint.addr).await.map_err(|e| {
                BrokerError::Unavailable(format!("connecting to {}: {}", endpoint.addr, e))
            })
        })
        .await?;
        socket.set_nodelay(true)?;
        debug!(addr = %endpoint.addr, "opened broker connection");
        Ok(Stream {
            socket,
            buf: BytesMut::with_capacity(4096),
        })
    }

    /// An idle connection is stale once the broker closed it or sent something
    /// nobody asked for.
    fn is_stale(&mut self) -> bool {
        match self.socket.try_read_buf(&mut self.buf) {
            Ok(_) => true,
            Err(e) => e.kind() != io::ErrorKind::WouldBlock,
        }
    }
}

impl WireConnection {
    async fn open(endpoint: &Endpoint) -> BrokerResult<Self> {
        let stream = Stream::connect(endpoint).await?;
        Ok(WireConnection {
            stream: Mutex::new(stream),
            correlation_id: AtomicU32::new(0),
            live: AtomicBool::new(true),
            endpoint: endpoint.clone(),
        })
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    /// Sends one request and waits for its answer. A connection dropped by an earlier
    /// failure is reopened first.
    async fn call(&self, op_code: OpCode, data: Bytes) -> BrokerResult<Bytes> {
        let _permit = self
            .endpoint
            .permits
            .acquire()
            .await
            .map_err(|_| BrokerError::Unavailable("client is shutting down".into()))?;
        let mut stream = self.stream.lock().await;
        if self.is_live() && stream.is_stale() {
            self.live.store(false, Ordering::SeqCst);
        }
        if !self.is_live() {
            *stream = Stream::connect(&self.endpoint).await?;
            self.live.store(true, Ordering::SeqCst);
            debug!(addr = %self.endpoint.addr, ?op_code, "reopened dropped broker connection");
        }
        let correlation_id = self.correlation_id.fetch_add(1, Ordering::SeqCst).wrapping_add(1);

        let exchange = Exchange {
            live: &self.live,
            finished: false,
        };
        let result = with_deadline(
            self.endpoint.request_timeout,
            Self::round_trip(&mut stream, correlation_id, Payload::new(op_code, data)),
        )
        .await;
        exchange.finish();

        // an error frame is an answer; the stream is still in sync
        if let Err(BrokerError::Timeout(_) | BrokerError::Io(_) | BrokerError::Protocol(_)) = &result {
            self.live.store(false, Ordering::SeqCst);
            warn!(addr = %self.endpoint.addr, ?op_code, "broker connection dropped");
        }
        result
    }

    async fn round_trip(stream: &mut Stream, correlation_id: u32, payload: Payload) -> BrokerResult<Bytes> {
        let mut out = BytesMut::new();
        Frame::request(correlation_id, payload.serialize()).encode(&mut out);
        stream.socket.write_all(&out).await?;
        stream.socket.flush().await?;

        let frame = loop {
            if let Some(frame) = Frame::decode(&mut stream.buf)? {
                break frame;
            }
            let n = stream.socket.read_buf(&mut stream.buf).await?;
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "broker closed the connection",
                )
                .into());
            }
        };

        if frame.correlation_id != correlation_id {
            return Err(ProtocolError::CorrelationMismatch {
                expected: correlation_id,
                found: frame.correlation_id,
            }
            .into());
        }

        match frame.frame_type {
            FrameType::Error => {
                let resp = ErrorResponse::deserialize(frame.payload)?;
                Err(BrokerError::from_error_response(resp))
            }
            FrameType::Response => {
                let resp = Payload::deserialize(frame.payload)?;
                if resp.op_code != payload.op_code {
                    return Err(ProtocolError::UnknownOpCode(resp.op_code as u8).into());
                }
                Ok(resp.data)
            }
            FrameType::Request => Err(ProtocolError::PayloadError(
                "broker answered with a request frame".into(),
            )
            .into()),
        }
    }

    async fn metadata(&self, topics: &[String]) -> BrokerResult<MetadataResponse> {
        let req = if topics.is_empty() {
            MetadataRequest::all()
        } else {
            MetadataRequest {
                topics: topics.to_vec(),
            }
        };
        let data = self.call(OpCode::Metadata, req.serialize()).await?;
        Ok(MetadataResponse::deserialize(data)?)
    }
}

/// Client resolved by [`WireConnector`]; admin, producer and every subscription get
/// their own connection.
pub struct WireClient {
    endpoint: Endpoint,
    control: WireConnection,
}

impl WireClient {
    pub async fn connect(config: &ClientConfig) -> BrokerResult<Self> {
        let endpoint = Endpoint {
            addr: config.host.clone(),
            connect_timeout: config.connection_timeout(),
            request_timeout: config.request_timeout(),
            permits: Arc::new(Semaphore::new(config.max_async_requests())),
        };
        let control = WireConnection::open(&endpoint).await?;
        Ok(WireClient { endpoint, control })
    }
}

#[async_trait]
impl BrokerClient for WireClient {
    fn is_live(&self) -> bool {
        self.control.is_live()
    }

    async fn load_metadata(&self) -> BrokerResult<()> {
        let meta = self.control.metadata(&[]).await?;
        debug!(topics = meta.topics.len(), "metadata synchronized");
        Ok(())
    }

    async fn missing_topics(&self, topics: &[String]) -> BrokerResult<Vec<String>> {
        let meta = self.control.metadata(topics).await?;
        Ok(topics
            .iter()
            .filter(|name| !meta.topics.iter().any(|t| &t.name == *name))
            .cloned()
            .collect())
    }

    async fn admin(&self) -> BrokerResult<Arc<dyn AdminHandle>> {
        let conn = WireConnection::open(&self.endpoint).await?;
        Ok(Arc::new(WireAdmin { conn }))
    }

    async fn producer(&self) -> BrokerResult<Arc<dyn ProducerHandle>> {
        let conn = WireConnection::open(&self.endpoint).await?;
        Ok(Arc::new(WireProducer { conn }))
    }

    async fn subscribe(&self, target: &SubscriptionTarget) -> BrokerResult<Box<dyn SubscriptionSource>> {
        let conn = WireConnection::open(&self.endpoint).await?;
        Ok(Box::new(WireSubscription {
            conn,
            target: target.clone(),
        }))
    }
}

struct WireAdmin {
    conn: WireConnection,
}

#[async_trait]
impl AdminHandle for WireAdmin {
    async fn list_topics(&self) -> BrokerResult<BTreeMap<String, TopicMetadata>> {
        let meta = self.conn.metadata(&[]).await?;
        Ok(meta
            .topics
            .into_iter()
            .map(|t| {
                let partitions = t
                    .partitions
                    .into_iter()
                    .map(|p| PartitionMetadata {
                        partition: p.partition,
                        high_watermark: p.high_watermark,
                    })
                    .collect();
                (
                    t.name.clone(),
                    TopicMetadata {
                        name: t.name,
                        partitions,
                    },
                )
            })
            .collect())
    }

    async fn create_topics(&self, specs: &[TopicSpec]) -> BrokerResult<()> {
        let req = CreateTopicsRequest {
            topics: specs
                .iter()
                .map(|spec| TopicDescriptor {
                    name: spec.name.clone(),
                    partitions: spec.partitions,
                    replication_factor: spec.replication_factor,
                    config_entries: spec
                        .config_entries
                        .iter()
                        .map(|e| (e.name.clone(), e.value.clone()))
                        .collect(),
                })
                .collect(),
        };
        self.conn.call(OpCode::CreateTopics, req.serialize()).await?;
        Ok(())
    }
}

struct WireProducer {
    conn: WireConnection,
}

#[async_trait]
impl ProducerHandle for WireProducer {
    async fn send(&self, envelope: &Envelope) -> BrokerResult<ProduceAck> {
        let req = ProduceRequest {
            topic: envelope.topic.clone(),
            partition: envelope.partition,
            attributes: envelope.compression as i8,
            timestamp: envelope.timestamp,
            value: Bytes::copy_from_slice(envelope.payload.as_bytes()),
        };
        let data = self.conn.call(OpCode::Produce, req.serialize()).await?;
        Ok(ProduceAck::deserialize(data)?)
    }
}

struct WireSubscription {
    conn: WireConnection,
    target: SubscriptionTarget,
}

#[async_trait]
impl SubscriptionSource for WireSubscription {
    async fn fetch(&mut self) -> BrokerResult<Option<FetchedRecord>> {
        let req = FetchRequest {
            topic: self.target.topic.clone(),
            partition: self.target.partition,
            group: self.target.group_id.clone(),
        };
        let data = self.conn.call(OpCode::Fetch, req.serialize()).await?;

        match FetchResponse::deserialize(data)? {
            None => Ok(None),
            Some(resp) => {
                let value = resp
                    .record
                    .value_str()
                    .map_err(ProtocolError::from)?
                    .to_string();
                let key = resp
                    .record
                    .key
                    .as_deref()
                    .map(|k| String::from_utf8_lossy(k).into_owned());
                Ok(Some(FetchedRecord {
                    offset: resp.offset,
                    key,
                    value,
                    timestamp: resp.record.timestamp,
                }))
            }
        }
    }

    async fn commit(&mut self, next_offset: u64) -> BrokerResult<()> {
        let req = CommitOffsetRequest {
            topic: self.target.topic.clone(),
            partition: self.target.partition,
            group: self.target.group_id.clone(),
            offset: next_offset,
        };
        self.conn.call(OpCode::CommitOffset, req.serialize()).await?;
        Ok(())
    }
}
