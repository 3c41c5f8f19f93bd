use bytes::{Buf, BufMut, Bytes, BytesMut};
use crate::utils::{ensure, get_str, get_u32, get_u64, put_str};
use crate::ProtocolError;

#[derive(Debug, Clone)]
pub struct ProduceRequest {
    pub topic: String,
    pub partition: u32,
    pub attributes: i8,
    pub timestamp: u64,
    pub value: Bytes,
}

//frame: [u32 topic_len][topic][u32 partition][i8 attributes][u64 timestamp][u32 value_len][value]

impl ProduceRequest {
    pub fn serialize(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(4 + self.topic.len() + 4 + 1 + 8 + 4 + self.value.len());
        put_str(&mut buf, &self.topic);
        buf.put_u32(self.partition);
        buf.put_i8(self.attributes);
        buf.put_u64(self.timestamp);
        buf.put_u32(self.value.len() as u32);
        buf.extend_from_slice(&self.value);
        buf.freeze()
    }

    pub fn deserialize(mut buf: Bytes) -> Result<Self, ProtocolError> {
        let topic = get_str(&mut buf, "topic")?;
        let partition = get_u32(&mut buf, "partition")?;
        ensure(&buf, 1, "attributes")?;
        let attributes = buf.get_i8();
        let timestamp = get_u64(&mut buf, "timestamp")?;
        let value_len = get_u32(&mut buf, "value length")? as usize;
        ensure(&buf, value_len, "value")?;
        let value = buf.split_to(value_len);

        Ok(ProduceRequest {
            topic,
            partition,
            attributes,
            timestamp,
            value,
        })
    }
}
