/*
[ version        : u8  ]
[ frame_type     : u8  ]
[ correlation_id : u32 ]
[ payload_len    : u32 ]
[ checksum       : u32 ]   xxh32 of the payload bytes
[ payload bytes... ]
*/

use bytes::{Buf, BufMut, Bytes, BytesMut};
use xxhash_rust::xxh32::xxh32;
use crate::ProtocolError;

pub const PROTOCOL_VERSION: u8 = 1;
pub const FRAME_HEADER_LEN: usize = 14;

#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameType {
    Request = 1,
    Response = 2,
    Error = 3,
}

impl TryFrom<u8> for FrameType {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, ProtocolError> {
        match value {
            1 => Ok(FrameType::Request),
            2 => Ok(FrameType::Response),
            3 => Ok(FrameType::Error),
            _ => Err(ProtocolError::UnknownFrameType(value)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Frame {
    pub version: u8,
    pub frame_type: FrameType,
    pub correlation_id: u32, // matches a response to its request
    pub payload: Bytes,
}

impl Frame {
    pub fn request(correlation_id: u32, payload: Bytes) -> Self {
        Self::with_type(FrameType::Request, correlation_id, payload)
    }

    pub fn response(correlation_id: u32, payload: Bytes) -> Self {
        Self::with_type(FrameType::Response, correlation_id, payload)
    }

    pub fn error(correlation_id: u32, payload: Bytes) -> Self {
        Self::with_type(FrameType::Error, correlation_id, payload)
    }

    fn with_type(frame_type: FrameType, correlation_id: u32, payload: Bytes) -> Self {
        Frame {
            version: PROTOCOL_VERSION,
            frame_type,
            correlation_id,
            payload,
        }
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.reserve(FRAME_HEADER_LEN + self.payload.len());
        buf.put_u8(self.version);
        buf.put_u8(self.frame_type as u8);
        buf.put_u32(self.correlation_id);
        buf.put_u32(self.payload.len() as u32);
        buf.put_u32(xxh32(&self.payload, 0));
        buf.extend_from_slice(&self.payload);
    }

    /// Returns `Ok(None)` until a whole frame is buffered; consumes nothing in that case.
    pub fn decode(buf: &mut BytesMut) -> Result<Option<Frame>, ProtocolError> {
        if buf.len() < FRAME_HEADER_LEN {
            return Ok(None);
        }

        let mut cursor = &buf[..];
        let version = cursor.get_u8();
        let frame_type_raw = cursor.get_u8();
        let correlation_id = cursor.get_u32();
        let payload_len = cursor.get_u32() as usize;
        let checksum_expected = cursor.get_u32();

        if cursor.remaining() < payload_len {
            return Ok(None);
        }

        buf.advance(FRAME_HEADER_LEN);
        let payload = buf.split_to(payload_len).freeze();

        if version != PROTOCOL_VERSION {
            return Err(ProtocolError::UnsupportedVersion(version));
        }

        let checksum_actual = xxh32(&payload, 0);
        if checksum_actual != checksum_expected {
            return Err(ProtocolError::ChecksumMismatch {
                expected: checksum_expected,
                found: checksum_actual,
            });
        }

        Ok(Some(Frame {
            version,
            frame_type: FrameType::try_from(frame_type_raw)?,
            correlation_id,
            payload,
        }))
    }
}
