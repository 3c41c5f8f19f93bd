use bytes::{Buf, BufMut, Bytes, BytesMut};
use crate::errors::ProtocolError;
use crate::op_code::OpCode;

/// Body of every request and response frame: `[op_code: u8][data...]`.
#[derive(Debug, Clone)]
pub struct Payload {
    pub op_code: OpCode,
    pub data: Bytes,
}

impl Payload {
    pub fn new(op_code: OpCode, data: Bytes) -> Self {
        Payload { op_code, data }
    }

    pub fn serialize(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(1 + self.data.len());
        buf.put_u8(self.op_code as u8);
        buf.extend_from_slice(&self.data);
        buf.freeze()
    }

    pub fn deserialize(mut buf: Bytes) -> Result<Self, ProtocolError> {
        if !buf.has_remaining() {
            return Err(ProtocolError::PayloadError("Empty payload".into()));
        }

        let op_code = OpCode::try_from(buf.get_u8())?;
        Ok(Payload { op_code, data: buf })
    }
}
