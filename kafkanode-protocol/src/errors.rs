use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Unknown opcode: {0}")]
    UnknownOpCode(u8),

    #[error("Unknown frame type: {0}")]
    UnknownFrameType(u8),

    #[error("Unknown error code: {0}")]
    UnknownErrorCode(u16),

    #[error("Unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    #[error("Payload decode error: {0}")]
    PayloadError(String),

    #[error("Checksum mismatch expected: {expected} found: {found}")]
    ChecksumMismatch { expected: u32, found: u32 },

    #[error("Correlation mismatch expected: {expected} found: {found}")]
    CorrelationMismatch { expected: u32, found: u32 },

    #[error("Record deserialize error: {0}")]
    RecordDeserializeError(#[from] DeserializeError),
}

#[derive(Debug, Error)]
pub enum DeserializeError {
    #[error("Unexpected end of input")]
    UnexpectedEOF,

    #[error("Invalid UTF-8 in record")]
    InvalidUtf8,

    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}
