use bytes::{BufMut, Bytes, BytesMut};
use crate::utils::{get_str, get_u32, put_str};
use crate::ProtocolError;

/// An empty topic list asks for every topic the broker knows.
#[derive(Debug, Clone, Default)]
pub struct MetadataRequest {
    pub topics: Vec<String>,
}

//frame: [u32 count]([u32 topic_len][topic bytes])*

impl MetadataRequest {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn serialize(&self) -> Bytes {
        let mut buf = BytesMut::new();
        buf.put_u32(self.topics.len() as u32);
        for topic in &self.topics {
            put_str(&mut buf, topic);
        }
        buf.freeze()
    }

    pub fn deserialize(mut buf: Bytes) -> Result<Self, ProtocolError> {
        let count = get_u32(&mut buf, "topic count")?;
        let mut topics = Vec::with_capacity(count.min(1024) as usize);
        for _ in 0..count {
            topics.push(get_str(&mut buf, "topic")?);
        }
        Ok(Self { topics })
    }
}
