use bytes::{Buf, BufMut, Bytes, BytesMut};
use crate::ProtocolError;

pub(crate) fn ensure(buf: &Bytes, len: usize, what: &str) -> Result<(), ProtocolError> {
    if buf.remaining() < len {
        return Err(ProtocolError::PayloadError(format!("Insufficient data for {}", what)));
    }
    Ok(())
}

// [u32 len][utf-8 bytes]
pub(crate) fn put_str(buf: &mut BytesMut, value: &str) {
    buf.put_u32(value.len() as u32);
    buf.extend_from_slice(value.as_bytes());
}

pub(crate) fn get_str(buf: &mut Bytes, what: &str) -> Result<String, ProtocolError> {
    ensure(buf, 4, what)?;
    let len = buf.get_u32() as usize;
    ensure(buf, len, what)?;
    String::from_utf8(buf.split_to(len).to_vec())
        .map_err(|_| ProtocolError::PayloadError(format!("Invalid UTF-8 in {}", what)))
}

pub(crate) fn get_u32(buf: &mut Bytes, what: &str) -> Result<u32, ProtocolError> {
    ensure(buf, 4, what)?;
    Ok(buf.get_u32())
}

pub(crate) fn get_u64(buf: &mut Bytes, what: &str) -> Result<u64, ProtocolError> {
    ensure(buf, 8, what)?;
    Ok(buf.get_u64())
}
