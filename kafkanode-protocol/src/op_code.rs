use crate::ProtocolError;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[repr(u8)]
pub enum OpCode {
    Metadata = 1,
    CreateTopics = 2,
    Produce = 3,
    Fetch = 4,
    CommitOffset = 5,
}

impl TryFrom<u8> for OpCode {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(OpCode::Metadata),
            2 => Ok(OpCode::CreateTopics),
            3 => Ok(OpCode::Produce),
            4 => Ok(OpCode::Fetch),
            5 => Ok(OpCode::CommitOffset),
            _ => Err(ProtocolError::UnknownOpCode(value)),
        }
    }
}
