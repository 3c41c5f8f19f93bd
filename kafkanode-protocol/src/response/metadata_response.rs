use bytes::{BufMut, Bytes, BytesMut};
use crate::utils::{get_str, get_u32, get_u64, put_str};
use crate::ProtocolError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionEntry {
    pub partition: u32,
    pub high_watermark: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicEntry {
    pub name: String,
    pub partitions: Vec<PartitionEntry>,
}

/// Lists only topics that exist; requested names missing from it do not exist.
#[derive(Debug, Clone, Default)]
pub struct MetadataResponse {
    pub topics: Vec<TopicEntry>,
}

//frame: [u32 count]([u32 name_len][name][u32 partition_count]([u32 partition][u64 high_watermark])*)*

impl MetadataResponse {
    pub fn serialize(&self) -> Bytes {
        let mut buf = BytesMut::new();
        buf.put_u32(self.topics.len() as u32);
        for topic in &self.topics {
            put_str(&mut buf, &topic.name);
            buf.put_u32(topic.partitions.len() as u32);
            for p in &topic.partitions {
                buf.put_u32(p.partition);
                buf.put_u64(p.high_watermark);
            }
        }
        buf.freeze()
    }

    pub fn deserialize(mut buf: Bytes) -> Result<Self, ProtocolError> {
        let count = get_u32(&mut buf, "topic count")?;
        let mut topics = Vec::with_capacity(count.min(1024) as usize);
        for _ in 0..count {
            let name = get_str(&mut buf, "topic name")?;
            let partition_count = get_u32(&mut buf, "partition count")?;
            let mut partitions = Vec::with_capacity(partition_count.min(1024) as usize);
            for _ in 0..partition_count {
                let partition = get_u32(&mut buf, "partition id")?;
                let high_watermark = get_u64(&mut buf, "high watermark")?;
                partitions.push(PartitionEntry {
                    partition,
                    high_watermark,
                });
            }
            topics.push(TopicEntry { name, partitions });
        }
        Ok(Self { topics })
    }
}
