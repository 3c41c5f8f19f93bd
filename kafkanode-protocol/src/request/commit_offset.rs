use bytes::{BufMut, Bytes, BytesMut};
use crate::utils::{get_str, get_u32, get_u64, put_str};
use crate::ProtocolError;

/// `offset` is the next offset the group should read.
#[derive(Debug, Clone)]
pub struct CommitOffsetRequest {
    pub topic: String,
    pub partition: u32,
    pub group: String,
    pub offset: u64,
}

//frame: [u32 topic_len][topic bytes][u32 partition][u32 group_len][group bytes][u64 offset]

impl CommitOffsetRequest {
    pub fn serialize(&self) -> Bytes {
        let mut buf = BytesMut::new();
        put_str(&mut buf, &self.topic);
        buf.put_u32(self.partition);
        put_str(&mut buf, &self.group);
        buf.put_u64(self.offset);
        buf.freeze()
    }

    pub fn deserialize(mut buf: Bytes) -> Result<Self, ProtocolError> {
        let topic = get_str(&mut buf, "topic")?;
        let partition = get_u32(&mut buf, "partition")?;
        let group = get_str(&mut buf, "group")?;
        let offset = get_u64(&mut buf, "offset")?;
        Ok(Self {
            topic,
            partition,
            group,
            offset,
        })
    }
}
