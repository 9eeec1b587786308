use crate::codec::{CodecError, decode_u16};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;

/// Optional parameter tags this crate looks at.
pub mod tags {
    pub const RECEIPTED_MESSAGE_ID: u16 = 0x001E;
    pub const MESSAGE_PAYLOAD: u16 = 0x0424;
    pub const MESSAGE_STATE: u16 = 0x0427;
}

/// A raw tag-length-value optional parameter.
#[derive(Clone, Debug, PartialEq)]
pub struct Tlv {
    pub tag: u16,
    pub value: Bytes,
}

impl Tlv {
    pub fn new(tag: u16, value: impl Into<Bytes>) -> Self {
        Self {
            tag,
            value: value.into(),
        }
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u16(self.tag);
        buf.put_u16(self.value.len() as u16);
        buf.put_slice(&self.value);
    }

    /// Decode every TLV left in the PDU body.
    pub fn decode_all(buf: &mut Cursor<&[u8]>) -> Result<Vec<Tlv>, CodecError> {
        let mut tlvs = Vec::new();
        while buf.has_remaining() {
            let tag = decode_u16(buf)?;
            let length = decode_u16(buf)? as usize;
            if buf.remaining() < length {
                return Err(CodecError::FieldValidation {
                    field: "tlv",
                    reason: format!("tag {tag:#06x} declares {length} octets, {} left", buf.remaining()),
                });
            }
            tlvs.push(Tlv {
                tag,
                value: buf.copy_to_bytes(length),
            });
        }
        Ok(tlvs)
    }
}
