use bytes::{Buf, BufMut, Bytes, BytesMut};
use crate::utils::{ensure, get_str, put_str};
use crate::ProtocolError;

#[repr(u16)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ErrorCode {
    UnknownTopic = 1,
    UnknownPartition = 2,
    TopicAlreadyExists = 3,
    InvalidRequest = 4,
    Unavailable = 5,
}

impl TryFrom<u16> for ErrorCode {
    type Error = ProtocolError;

    fn try_from(value: u16) -> Result<Self, ProtocolError> {
        match value {
            1 => Ok(ErrorCode::UnknownTopic),
            2 => Ok(ErrorCode::UnknownPartition),
            3 => Ok(ErrorCode::TopicAlreadyExists),
            4 => Ok(ErrorCode::InvalidRequest),
            5 => Ok(ErrorCode::Unavailable),
            _ => Err(ProtocolError::UnknownErrorCode(value)),
        }
    }
}

/// Payload of a `FrameType::Error` frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
}

//frame: [u16 code][u32 message_len][message bytes]

impl ErrorResponse {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ErrorResponse {
            code,
            message: message.into(),
        }
    }

    pub fn serialize(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(2 + 4 + self.message.len());
        buf.put_u16(self.code as u16);
        put_str(&mut buf, &self.message);
        buf.freeze()
    }

    pub fn deserialize(mut buf: Bytes) -> Result<Self, ProtocolError> {
        ensure(&buf, 2, "error code")?;
        let code = ErrorCode::try_from(buf.get_u16())?;
        let message = get_str(&mut buf, "error message")?;
        Ok(ErrorResponse { code, message })
    }
}
