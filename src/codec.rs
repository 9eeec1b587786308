// ABOUTME: SMPP v3.4 wire codec separating byte-level parsing/encoding from the PDU structs
// ABOUTME: Provides the common header, codec traits, C-octet string helpers and the Frame enum

use crate::datatypes::{
    BindTransceiver, BindTransceiverResponse, CommandId, DeliverSm, DeliverSmResponse,
    EnquireLink, EnquireLinkResponse, GenericNack, SubmitSm, SubmitSmResponse, Unbind,
    UnbindResponse,
};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;
use thiserror::Error;

/// Maximum allowed PDU size to prevent memory exhaustion attacks
pub const MAX_PDU_SIZE: u32 = 65536; // 64KB

/// SMPP v3.4 PDU Header (16 bytes, common to all PDUs)
///
/// `command_id` and `command_status` are kept as raw integers: SMSCs routinely
/// answer with vendor-specific status codes, and an unrecognised code must
/// still reach the caller rather than fail the whole frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PduHeader {
    pub command_length: u32,
    pub command_id: u32,
    pub command_status: u32,
    pub sequence_number: u32,
}

impl PduHeader {
    pub const SIZE: usize = 16;

    /// Header for an outbound PDU. The length is patched by [`Encodable::to_bytes`].
    pub fn new(command_id: CommandId, command_status: u32, sequence_number: u32) -> Self {
        Self {
            command_length: 0,
            command_id: command_id as u32,
            command_status,
            sequence_number,
        }
    }

    /// Decode PDU header from buffer with validation
    pub fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        if buf.remaining() < Self::SIZE {
            return Err(CodecError::Incomplete);
        }

        let header = PduHeader {
            command_length: buf.get_u32(),
            command_id: buf.get_u32(),
            command_status: buf.get_u32(),
            sequence_number: buf.get_u32(),
        };

        if header.command_length < Self::SIZE as u32 || header.command_length > MAX_PDU_SIZE {
            return Err(CodecError::InvalidPduLength {
                length: header.command_length,
                min: Self::SIZE as u32,
                max: MAX_PDU_SIZE,
            });
        }

        // generic_nack may legitimately carry sequence 0 when the peer could not
        // read ours; requests never may.
        if header.sequence_number == 0xFFFF_FFFF
            || (header.sequence_number == 0 && !header.is_response())
        {
            return Err(CodecError::ReservedSequenceNumber(header.sequence_number));
        }

        Ok(header)
    }

    /// Reads the header fields of a PDU without validating them.
    pub fn peek(data: &[u8]) -> Option<Self> {
        if data.len() < Self::SIZE {
            return None;
        }
        let mut buf = Cursor::new(data);
        Some(PduHeader {
            command_length: buf.get_u32(),
            command_id: buf.get_u32(),
            command_status: buf.get_u32(),
            sequence_number: buf.get_u32(),
        })
    }

    /// Encode PDU header to buffer
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32(self.command_length);
        buf.put_u32(self.command_id);
        buf.put_u32(self.command_status);
        buf.put_u32(self.sequence_number);
    }

    /// The typed command, if this crate knows it
    pub fn command(&self) -> Option<CommandId> {
        CommandId::try_from(self.command_id).ok()
    }

    pub fn is_response(&self) -> bool {
        self.command_id & 0x8000_0000 != 0
    }
}

/// Trait for types that can be encoded to bytes
pub trait Encodable {
    /// Encode this PDU, header included, to the buffer
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError>;

    /// Encode and fix up the command_length field in the header
    fn to_bytes(&self) -> Result<Bytes, CodecError> {
        let mut buf = BytesMut::with_capacity(64);
        self.encode(&mut buf)?;

        let length = buf.len() as u32;
        buf[0..4].copy_from_slice(&length.to_be_bytes());

        Ok(buf.freeze())
    }
}

/// Trait for types that can be decoded from bytes
pub trait Decodable: Sized {
    /// Decode this PDU from its body (everything after the header)
    fn decode(header: PduHeader, body: &mut Cursor<&[u8]>) -> Result<Self, CodecError>;

    /// Return the expected command_id for this PDU type
    fn command_id() -> CommandId;

    /// Validate the header is appropriate for this PDU type
    fn validate_header(header: &PduHeader) -> Result<(), CodecError> {
        if header.command_id != Self::command_id() as u32 {
            return Err(CodecError::UnexpectedCommandId {
                expected: Self::command_id(),
                actual: header.command_id,
            });
        }
        Ok(())
    }
}

/// Codec errors with detailed context for debugging
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Incomplete PDU: need more data")]
    Incomplete,

    #[error("Invalid PDU length: {length}, must be {min}-{max}")]
    InvalidPduLength { length: u32, min: u32, max: u32 },

    #[error("Reserved sequence number: {0}")]
    ReservedSequenceNumber(u32),

    #[error("Unexpected command_id: expected {expected:?}, got {actual:#x}")]
    UnexpectedCommandId { expected: CommandId, actual: u32 },

    #[error("Field '{field}' validation failed: {reason}")]
    FieldValidation { field: &'static str, reason: String },

    #[error("UTF-8 decoding error in field '{field}': {source}")]
    Utf8Error {
        field: &'static str,
        #[source]
        source: std::string::FromUtf8Error,
    },

    /// A PDU with a sound length whose contents could not be decoded. The
    /// bytes have been consumed, so the stream is still framed.
    #[error(
        "Undecodable PDU (command_id {:#x}, sequence {}): {source}",
        .header.command_id,
        .header.sequence_number
    )]
    Malformed {
        header: PduHeader,
        #[source]
        source: Box<CodecError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Decode a variable-length, NUL-terminated C-octet string.
///
/// `max_len` includes the terminator, matching the limits in the SMPP tables.
pub fn decode_cstring(
    buf: &mut Cursor<&[u8]>,
    max_len: usize,
    field: &'static str,
) -> Result<String, CodecError> {
    let start = buf.position() as usize;
    let remaining = &buf.get_ref()[start.min(buf.get_ref().len())..];
    let window = &remaining[..remaining.len().min(max_len)];

    let Some(end) = window.iter().position(|&b| b == 0) else {
        return Err(CodecError::FieldValidation {
            field,
            reason: format!("no NUL terminator within {max_len} octets"),
        });
    };

    let value = String::from_utf8(window[..end].to_vec())
        .map_err(|source| CodecError::Utf8Error { field, source })?;
    buf.advance(end + 1);
    Ok(value)
}

/// Encode a C-octet string, rejecting values that do not fit in `max_len`
/// (terminator included) instead of silently truncating them.
pub fn encode_cstring(
    buf: &mut BytesMut,
    value: &str,
    max_len: usize,
    field: &'static str,
) -> Result<(), CodecError> {
    if value.len() >= max_len || value.as_bytes().contains(&0) {
        return Err(CodecError::FieldValidation {
            field,
            reason: format!("must be at most {} octets without NUL", max_len - 1),
        });
    }
    buf.put_slice(value.as_bytes());
    buf.put_u8(0);
    Ok(())
}

/// Decode a single byte
pub fn decode_u8(buf: &mut Cursor<&[u8]>) -> Result<u8, CodecError> {
    if buf.remaining() < 1 {
        return Err(CodecError::Incomplete);
    }
    Ok(buf.get_u8())
}

/// Decode a 16-bit big-endian integer
pub fn decode_u16(buf: &mut Cursor<&[u8]>) -> Result<u16, CodecError> {
    if buf.remaining() < 2 {
        return Err(CodecError::Incomplete);
    }
    Ok(buf.get_u16())
}

/// Generic frame type that can hold any PDU the session exchanges
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    BindTransceiver(BindTransceiver),
    BindTransceiverResp(BindTransceiverResponse),

    SubmitSm(Box<SubmitSm>),
    SubmitSmResp(SubmitSmResponse),
    DeliverSm(Box<DeliverSm>),
    DeliverSmResp(DeliverSmResponse),

    EnquireLink(EnquireLink),
    EnquireLinkResp(EnquireLinkResponse),
    Unbind(Unbind),
    UnbindResp(UnbindResponse),
    GenericNack(GenericNack),

    // Anything else is passed through opaquely
    Unknown { header: PduHeader, body: Bytes },
}

impl Frame {
    /// Check whether `buf` holds at least one complete PDU.
    ///
    /// Returns the PDU length without consuming anything, `Incomplete` when
    /// more data is needed, or an error for a length that can never be valid.
    pub fn check(buf: &mut Cursor<&[u8]>) -> Result<usize, CodecError> {
        if buf.remaining() < 4 {
            return Err(CodecError::Incomplete);
        }

        let pos = buf.position();
        let command_length = buf.get_u32();
        buf.set_position(pos);

        if command_length < PduHeader::SIZE as u32 || command_length > MAX_PDU_SIZE {
            return Err(CodecError::InvalidPduLength {
                length: command_length,
                min: PduHeader::SIZE as u32,
                max: MAX_PDU_SIZE,
            });
        }

        if buf.remaining() < command_length as usize {
            return Err(CodecError::Incomplete);
        }

        Ok(command_length as usize)
    }

    /// Parse exactly one PDU from the front of `data`
    pub fn parse(data: &[u8]) -> Result<Frame, CodecError> {
        let mut cursor = Cursor::new(data);
        let header = PduHeader::decode(&mut cursor)?;

        let end = header.command_length as usize;
        if data.len() < end {
            return Err(CodecError::Incomplete);
        }
        let mut body = Cursor::new(&data[PduHeader::SIZE..end]);

        let frame = match header.command() {
            Some(CommandId::BindTransceiver) => {
                Frame::BindTransceiver(BindTransceiver::decode(header, &mut body)?)
            }
            Some(CommandId::BindTransceiverResp) => {
                Frame::BindTransceiverResp(BindTransceiverResponse::decode(header, &mut body)?)
            }
            Some(CommandId::SubmitSm) => {
                Frame::SubmitSm(Box::new(SubmitSm::decode(header, &mut body)?))
            }
            Some(CommandId::SubmitSmResp) => {
                Frame::SubmitSmResp(SubmitSmResponse::decode(header, &mut body)?)
            }
            Some(CommandId::DeliverSm) => {
                Frame::DeliverSm(Box::new(DeliverSm::decode(header, &mut body)?))
            }
            Some(CommandId::DeliverSmResp) => {
                Frame::DeliverSmResp(DeliverSmResponse::decode(header, &mut body)?)
            }
            Some(CommandId::EnquireLink) => {
                Frame::EnquireLink(EnquireLink::decode(header, &mut body)?)
            }
            Some(CommandId::EnquireLinkResp) => {
                Frame::EnquireLinkResp(EnquireLinkResponse::decode(header, &mut body)?)
            }
            Some(CommandId::Unbind) => Frame::Unbind(Unbind::decode(header, &mut body)?),
            Some(CommandId::UnbindResp) => {
                Frame::UnbindResp(UnbindResponse::decode(header, &mut body)?)
            }
            Some(CommandId::GenericNack) => {
                Frame::GenericNack(GenericNack::decode(header, &mut body)?)
            }
            _ => {
                tracing::debug!(
                    "Unhandled PDU command_id: {:#x}, passing through as opaque data",
                    header.command_id
                );
                Frame::Unknown {
                    header,
                    body: Bytes::copy_from_slice(&data[PduHeader::SIZE..end]),
                }
            }
        };

        Ok(frame)
    }

    /// Get the raw command_id for this frame
    pub fn command_id(&self) -> u32 {
        let id = match self {
            Frame::BindTransceiver(_) => CommandId::BindTransceiver,
            Frame::BindTransceiverResp(_) => CommandId::BindTransceiverResp,
            Frame::SubmitSm(_) => CommandId::SubmitSm,
            Frame::SubmitSmResp(_) => CommandId::SubmitSmResp,
            Frame::DeliverSm(_) => CommandId::DeliverSm,
            Frame::DeliverSmResp(_) => CommandId::DeliverSmResp,
            Frame::EnquireLink(_) => CommandId::EnquireLink,
            Frame::EnquireLinkResp(_) => CommandId::EnquireLinkResp,
            Frame::Unbind(_) => CommandId::Unbind,
            Frame::UnbindResp(_) => CommandId::UnbindResp,
            Frame::GenericNack(_) => CommandId::GenericNack,
            Frame::Unknown { header, .. } => return header.command_id,
        };
        id as u32
    }

    /// Get the sequence number for this frame
    pub fn sequence_number(&self) -> u32 {
        match self {
            Frame::BindTransceiver(pdu) => pdu.sequence_number,
            Frame::BindTransceiverResp(pdu) => pdu.sequence_number,
            Frame::SubmitSm(pdu) => pdu.sequence_number,
            Frame::SubmitSmResp(pdu) => pdu.sequence_number,
            Frame::DeliverSm(pdu) => pdu.sequence_number,
            Frame::DeliverSmResp(pdu) => pdu.sequence_number,
            Frame::EnquireLink(pdu) => pdu.sequence_number,
            Frame::EnquireLinkResp(pdu) => pdu.sequence_number,
            Frame::Unbind(pdu) => pdu.sequence_number,
            Frame::UnbindResp(pdu) => pdu.sequence_number,
            Frame::GenericNack(pdu) => pdu.sequence_number,
            Frame::Unknown { header, .. } => header.sequence_number,
        }
    }

    /// Serialize the frame for the wire
    pub fn to_bytes(&self) -> Result<Bytes, CodecError> {
        match self {
            Frame::BindTransceiver(pdu) => pdu.to_bytes(),
            Frame::BindTransceiverResp(pdu) => pdu.to_bytes(),
            Frame::SubmitSm(pdu) => pdu.to_bytes(),
            Frame::SubmitSmResp(pdu) => pdu.to_bytes(),
            Frame::DeliverSm(pdu) => pdu.to_bytes(),
            Frame::DeliverSmResp(pdu) => pdu.to_bytes(),
            Frame::EnquireLink(pdu) => pdu.to_bytes(),
            Frame::EnquireLinkResp(pdu) => pdu.to_bytes(),
            Frame::Unbind(pdu) => pdu.to_bytes(),
            Frame::UnbindResp(pdu) => pdu.to_bytes(),
            Frame::GenericNack(pdu) => pdu.to_bytes(),
            Frame::Unknown { header, body } => {
                let mut buf = BytesMut::with_capacity(PduHeader::SIZE + body.len());
                PduHeader {
                    command_length: (PduHeader::SIZE + body.len()) as u32,
                    ..*header
                }
                .encode(&mut buf);
                buf.put_slice(body);
                Ok(buf.freeze())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::CommandStatus;

    #[test]
    fn pdu_header_encode_decode() {
        let header = PduHeader {
            command_length: 16,
            command_id: CommandId::EnquireLink as u32,
            command_status: 0,
            sequence_number: 42,
        };

        let mut buf = BytesMut::new();
        header.encode(&mut buf);

        let mut cursor = Cursor::new(buf.as_ref());
        let decoded = PduHeader::decode(&mut cursor).unwrap();

        assert_eq!(header, decoded);
        assert_eq!(decoded.command(), Some(CommandId::EnquireLink));
        assert!(!decoded.is_response());
    }

    #[test]
    fn pdu_header_validation() {
        let data: &[u8] = &[
            0x00, 0x00, 0x00, 0x08, // command_length too small
            0x00, 0x00, 0x00, 0x15, // command_id
            0x00, 0x00, 0x00, 0x00, // command_status
            0x00, 0x00, 0x00, 0x01, // sequence_number
        ];
        let result = PduHeader::decode(&mut Cursor::new(data));
        assert!(matches!(result, Err(CodecError::InvalidPduLength { .. })));

        let data: &[u8] = &[
            0x00, 0x00, 0x00, 0x10, // command_length
            0x00, 0x00, 0x00, 0x15, // enquire_link
            0x00, 0x00, 0x00, 0x00, // command_status
            0x00, 0x00, 0x00, 0x00, // sequence_number (reserved for requests)
        ];
        let result = PduHeader::decode(&mut Cursor::new(data));
        assert!(matches!(result, Err(CodecError::ReservedSequenceNumber(0))));

        let data: &[u8] = &[
            0x00, 0x00, 0x00, 0x10, // command_length
            0x80, 0x00, 0x00, 0x00, // generic_nack
            0x00, 0x00, 0x00, 0x03, // invalid command id
            0x00, 0x00, 0x00, 0x00, // sequence 0 is allowed on a response
        ];
        let header = PduHeader::decode(&mut Cursor::new(data)).unwrap();
        assert_eq!(header.command(), Some(CommandId::GenericNack));
    }

    #[test]
    fn decode_cstring_variable_length() {
        let data = b"hello\0world\0";
        let mut cursor = Cursor::new(&data[..]);
        assert_eq!(decode_cstring(&mut cursor, 16, "a").unwrap(), "hello");
        assert_eq!(cursor.position(), 6);
        assert_eq!(decode_cstring(&mut cursor, 16, "b").unwrap(), "world");
        assert_eq!(cursor.position(), 12);
    }

    #[test]
    fn decode_cstring_missing_terminator() {
        let data = b"abcdefgh";
        let mut cursor = Cursor::new(&data[..]);
        let result = decode_cstring(&mut cursor, 4, "system_id");
        assert!(matches!(
            result,
            Err(CodecError::FieldValidation { field: "system_id", .. })
        ));
    }

    #[test]
    fn encode_cstring_rejects_overlong_values() {
        let mut buf = BytesMut::new();
        encode_cstring(&mut buf, "hello", 6, "f").unwrap();
        assert_eq!(buf.as_ref(), b"hello\0");

        let result = encode_cstring(&mut buf, "toolong", 6, "password");
        assert!(matches!(
            result,
            Err(CodecError::FieldValidation { field: "password", .. })
        ));
    }

    #[test]
    fn check_reports_incomplete_until_whole_pdu_is_buffered() {
        let bytes = EnquireLink::new(7).to_bytes().unwrap();

        let partial = &bytes[..10];
        assert!(matches!(
            Frame::check(&mut Cursor::new(partial)),
            Err(CodecError::Incomplete)
        ));

        assert_eq!(Frame::check(&mut Cursor::new(&bytes[..])).unwrap(), 16);
    }

    #[test]
    fn parse_submit_sm_resp_from_literal_bytes() {
        let mut data = Vec::new();
        data.extend_from_slice(&23u32.to_be_bytes());
        data.extend_from_slice(&0x8000_0004u32.to_be_bytes());
        data.extend_from_slice(&0u32.to_be_bytes());
        data.extend_from_slice(&9u32.to_be_bytes());
        data.extend_from_slice(b"ABC123\0");

        match Frame::parse(&data).unwrap() {
            Frame::SubmitSmResp(resp) => {
                assert_eq!(resp.sequence_number, 9);
                assert_eq!(resp.command_status, CommandStatus::Ok as u32);
                assert_eq!(resp.message_id, "ABC123");
            }
            other => panic!("Expected SubmitSmResp, got {other:?}"),
        }
    }

    #[test]
    fn parse_unknown_command_is_opaque() {
        let mut data = Vec::new();
        data.extend_from_slice(&20u32.to_be_bytes());
        data.extend_from_slice(&0x0001_0200u32.to_be_bytes()); // vendor range
        data.extend_from_slice(&0u32.to_be_bytes());
        data.extend_from_slice(&1u32.to_be_bytes());
        data.extend_from_slice(&[1, 2, 3, 4]);

        match Frame::parse(&data).unwrap() {
            Frame::Unknown { header, body } => {
                assert_eq!(header.command_id, 0x0001_0200);
                assert_eq!(body.as_ref(), &[1, 2, 3, 4]);
            }
            other => panic!("Expected Unknown frame, got {other:?}"),
        }
    }

    #[test]
    fn frame_accessors() {
        let frame = Frame::EnquireLink(EnquireLink::new(42));
        assert_eq!(frame.command_id(), CommandId::EnquireLink as u32);
        assert_eq!(frame.sequence_number(), 42);

        let frame = Frame::SubmitSmResp(SubmitSmResponse::new(43, 0, "id-1"));
        assert_eq!(frame.command_id(), 0x8000_0004);
        assert_eq!(frame.sequence_number(), 43);
    }
}
