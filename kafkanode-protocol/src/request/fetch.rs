use bytes::{BufMut, Bytes, BytesMut};
use crate::utils::{get_str, get_u32, put_str};
use crate::ProtocolError;

/// Next record for `group` on a topic-partition, read at the group's committed offset.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub topic: String,
    pub partition: u32,
    pub group: String,
}

//frame: [u32 topic_len][topic bytes][u32 partition][u32 group_len][group bytes]

impl FetchRequest {
    pub fn serialize(&self) -> Bytes {
        let mut buf = BytesMut::new();
        put_str(&mut buf, &self.topic);
        buf.put_u32(self.partition);
        put_str(&mut buf, &self.group);
        buf.freeze()
    }

    pub fn deserialize(mut buf: Bytes) -> Result<Self, ProtocolError> {
        let topic = get_str(&mut buf, "topic")?;
        let partition = get_u32(&mut buf, "partition")?;
        let group = get_str(&mut buf, "group")?;
        Ok(FetchRequest {
            topic,
            partition,
            group,
        })
    }
}
