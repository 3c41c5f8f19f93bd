/*
[ offset     : u64 ]
[ timestamp  : u64 ]   unix epoch millis
[ attributes : i8  ]   compression codec as set by the producer
[ key_len    : i32 ]   -1 when the record has no key
[ key bytes  : [u8] ]
[ value_len  : u32 ]
[ value bytes: [u8] ]
*/
use bytes::{Buf, BufMut, Bytes, BytesMut};
use crate::errors::DeserializeError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: Option<Vec<u8>>,
    pub value: Vec<u8>,
    pub timestamp: u64,
    pub attributes: i8,
}

impl Record {
    pub fn serialize(&self, offset: u64) -> Bytes {
        let key_len = self.key.as_ref().map_or(0, Vec::len);
        let mut buf = BytesMut::with_capacity(8 + 8 + 1 + 4 + key_len + 4 + self.value.len());

        buf.put_u64(offset);
        buf.put_u64(self.timestamp);
        buf.put_i8(self.attributes);

        match &self.key {
            Some(key) => {
                buf.put_i32(key.len() as i32);
                buf.extend_from_slice(key);
            }
            None => buf.put_i32(-1),
        }

        buf.put_u32(self.value.len() as u32);
        buf.extend_from_slice(&self.value);
        buf.freeze()
    }

    pub fn deserialize(mut buf: Bytes) -> Result<(u64, Record), DeserializeError> {
        need(&buf, 8 + 8 + 1 + 4)?;
        let offset = buf.get_u64();
        let timestamp = buf.get_u64();
        let attributes = buf.get_i8();

        let key = match buf.get_i32() {
            -1 => None,
            len if len < 0 => {
                return Err(DeserializeError::InvalidFormat(format!("negative key length {}", len)))
            }
            len => {
                need(&buf, len as usize)?;
                Some(buf.split_to(len as usize).to_vec())
            }
        };

        need(&buf, 4)?;
        let value_len = buf.get_u32() as usize;
        need(&buf, value_len)?;
        let value = buf.split_to(value_len).to_vec();

        Ok((
            offset,
            Record {
                key,
                value,
                timestamp,
                attributes,
            },
        ))
    }

    /// Value as text; the façade only ever produces UTF-8 envelopes.
    pub fn value_str(&self) -> Result<&str, DeserializeError> {
        std::str::from_utf8(&self.value).map_err(|_| DeserializeError::InvalidUtf8)
    }
}

fn need(buf: &Bytes, len: usize) -> Result<(), DeserializeError> {
    if buf.remaining() < len {
        return Err(DeserializeError::UnexpectedEOF);
    }
    Ok(())
}
