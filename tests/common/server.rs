use std::net::SocketAddr;
use std::sync::Arc;
use anyhow::Result;
use bytes::{Bytes, BytesMut};
use kafkanode::broker::MemoryBroker;
use kafkanode::types::Envelope;
use kafkanode::{BrokerError, Compression, ConfigEntry, TopicSpec};
use kafkanode_protocol::{
    CommitOffsetRequest, CreateTopicsRequest, FetchRequest, FetchResponse, Frame, FrameType,
    MetadataRequest, MetadataResponse, OpCode, PartitionEntry, Payload, ProduceRequest, Record,
    TopicEntry,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

/// A TCP broker on an ephemeral port, backed by a [`MemoryBroker`].
pub struct TestBroker {
    pub addr: SocketAddr,
    pub broker: MemoryBroker,
    task: JoinHandle<()>,
    connections: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl TestBroker {
    pub async fn start() -> Self {
        Self::start_with(MemoryBroker::new()).await
    }

    pub async fn start_with(broker: MemoryBroker) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shared = broker.clone();
        let connections = Arc::new(Mutex::new(Vec::new()));
        let tracked = connections.clone();

        let task = tokio::spawn(async move {
            loop {
                let Ok((socket, _)) = listener.accept().await else {
                    return;
                };
                let broker = shared.clone();
                let handle = tokio::spawn(async move {
                    if let Err(e) = handle_connection(socket, broker).await {
                        debug!("test broker connection error: {:?}", e);
                    }
                });
                tracked.lock().push(handle);
            }
        });

        TestBroker {
            addr,
            broker,
            task,
            connections,
        }
    }

    /// Closes every accepted connection; the listener keeps accepting.
    pub async fn drop_connections(&self) {
        let handles: Vec<_> = self.connections.lock().drain(..).collect();
        for handle in handles {
            handle.abort();
            let _ = handle.await;
        }
    }

    pub fn host(&self) -> String {
        self.addr.to_string()
    }
}

impl Drop for TestBroker {
    fn drop(&mut self) {
        self.task.abort();
        for handle in self.connections.lock().drain(..) {
            handle.abort();
        }
    }
}

async fn handle_connection(mut stream: TcpStream, broker: MemoryBroker) -> Result<()> {
    let mut buf = BytesMut::with_capacity(4096);

    loop {
        let n = stream.read_buf(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }

        while let Some(frame) = Frame::decode(&mut buf)? {
            if frame.frame_type != FrameType::Request {
                continue;
            }

            let reply = match dispatch(frame.payload, &broker) {
                Ok(payload) => Frame::response(frame.correlation_id, payload.serialize()),
                Err(e) => Frame::error(frame.correlation_id, e.to_error_response().serialize()),
            };

            let mut out = BytesMut::new();
            reply.encode(&mut out);
            stream.write_all(&out).await?;
            stream.flush().await?;
        }
    }
}

fn dispatch(raw: Bytes, broker: &MemoryBroker) -> Result<Payload, BrokerError> {
    let request = Payload::deserialize(raw)?;
    let data = match request.op_code {
        OpCode::Metadata => {
            let req = MetadataRequest::deserialize(request.data)?;
            let topics = broker
                .metadata(&req.topics)?
                .into_iter()
                .map(|meta| TopicEntry {
                    name: meta.name,
                    partitions: meta
                        .partitions
                        .into_iter()
                        .map(|p| PartitionEntry {
                            partition: p.partition,
                            high_watermark: p.high_watermark,
                        })
                        .collect(),
                })
                .collect();
            MetadataResponse { topics }.serialize()
        }
        OpCode::CreateTopics => {
            let req = CreateTopicsRequest::deserialize(request.data)?;
            let specs: Vec<TopicSpec> = req
                .topics
                .into_iter()
                .map(|d| TopicSpec {
                    name: d.name,
                    partitions: d.partitions,
                    replication_factor: d.replication_factor,
                    config_entries: d
                        .config_entries
                        .into_iter()
                        .map(|(name, value)| ConfigEntry::new(name, value))
                        .collect(),
                })
                .collect();
            broker.create_topics(&specs)?;
            Bytes::new()
        }
        OpCode::Produce => {
            let req = ProduceRequest::deserialize(request.data)?;
            let payload = String::from_utf8(req.value.to_vec())
                .map_err(|_| BrokerError::Rejected("payload is not utf-8".into()))?;
            let envelope = Envelope {
                topic: req.topic,
                partition: req.partition,
                payload,
                compression: Compression::try_from(req.attributes)?,
                timestamp: req.timestamp,
            };
            broker.append(&envelope)?.serialize()
        }
        OpCode::Fetch => {
            let req = FetchRequest::deserialize(request.data)?;
            match broker.fetch(&req.topic, req.partition, &req.group)? {
                None => Bytes::new(),
                Some(fetched) => FetchResponse {
                    offset: fetched.offset,
                    record: Record {
                        key: fetched.key.map(String::into_bytes),
                        value: fetched.value.into_bytes(),
                        timestamp: fetched.timestamp,
                        attributes: 0,
                    },
                }
                .serialize(),
            }
        }
        OpCode::CommitOffset => {
            let req = CommitOffsetRequest::deserialize(request.data)?;
            broker.commit(&req.topic, req.partition, &req.group, req.offset)?;
            Bytes::new()
        }
    };
    Ok(Payload::new(request.op_code, data))
}
