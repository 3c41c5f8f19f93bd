use bytes::Bytes;
use crate::errors::ProtocolError;
use crate::record::Record;

/// An empty response payload means the group is caught up.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub offset: u64,
    pub record: Record,
}

impl FetchResponse {
    pub fn serialize(&self) -> Bytes {
        self.record.serialize(self.offset)
    }

    pub fn deserialize(buf: Bytes) -> Result<Option<Self>, ProtocolError> {
        if buf.is_empty() {
            return Ok(None);
        }
        let (offset, record) = Record::deserialize(buf)?;
        Ok(Some(FetchResponse { offset, record }))
    }
}
