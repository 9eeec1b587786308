use crate::codec::{
    CodecError, Decodable, Encodable, PduHeader, decode_cstring, decode_u8, encode_cstring,
};
use crate::datatypes::{CommandId, InterfaceVersion, limits};
use bytes::{Buf, BufMut, BytesMut};
use std::io::Cursor;

/// bind_transceiver (SMPP v3.4 4.1.5): authenticates the ESME for both
/// submitting and receiving messages on a single connection.
#[derive(Clone, Debug, PartialEq)]
pub struct BindTransceiver {
    pub sequence_number: u32,
    /// Identifies the ESME to the SMSC. Max 15 octets.
    pub system_id: String,
    /// Max 8 octets.
    pub password: String,
    /// Max 12 octets; empty when the SMSC does not use it.
    pub system_type: String,
    pub interface_version: InterfaceVersion,
    pub addr_ton: u8,
    pub addr_npi: u8,
    /// Max 40 octets.
    pub address_range: String,
}

/// bind_transceiver_resp. On failure the SMSC may omit the body entirely.
#[derive(Clone, Debug, PartialEq)]
pub struct BindTransceiverResponse {
    pub command_status: u32,
    pub sequence_number: u32,
    pub system_id: String,
}

impl BindTransceiver {
    pub fn new(
        sequence_number: u32,
        system_id: impl Into<String>,
        password: impl Into<String>,
        system_type: impl Into<String>,
        interface_version: InterfaceVersion,
    ) -> Self {
        Self {
            sequence_number,
            system_id: system_id.into(),
            password: password.into(),
            system_type: system_type.into(),
            interface_version,
            addr_ton: 0,
            addr_npi: 0,
            address_range: String::new(),
        }
    }
}

impl BindTransceiverResponse {
    pub fn new(sequence_number: u32, command_status: u32, system_id: impl Into<String>) -> Self {
        Self {
            command_status,
            sequence_number,
            system_id: system_id.into(),
        }
    }
}

impl Encodable for BindTransceiver {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        PduHeader::new(CommandId::BindTransceiver, 0, self.sequence_number).encode(buf);
        encode_cstring(buf, &self.system_id, limits::SYSTEM_ID, "system_id")?;
        encode_cstring(buf, &self.password, limits::PASSWORD, "password")?;
        encode_cstring(buf, &self.system_type, limits::SYSTEM_TYPE, "system_type")?;
        buf.put_u8(self.interface_version as u8);
        buf.put_u8(self.addr_ton);
        buf.put_u8(self.addr_npi);
        encode_cstring(buf, &self.address_range, limits::ADDRESS_RANGE, "address_range")?;
        Ok(())
    }
}

impl Decodable for BindTransceiver {
    fn command_id() -> CommandId {
        CommandId::BindTransceiver
    }

    fn decode(header: PduHeader, body: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        let system_id = decode_cstring(body, limits::SYSTEM_ID, "system_id")?;
        let password = decode_cstring(body, limits::PASSWORD, "password")?;
        let system_type = decode_cstring(body, limits::SYSTEM_TYPE, "system_type")?;
        let version = decode_u8(body)?;
        let interface_version =
            InterfaceVersion::try_from(version).map_err(|_| CodecError::FieldValidation {
                field: "interface_version",
                reason: format!("unsupported version {version:#x}"),
            })?;
        let addr_ton = decode_u8(body)?;
        let addr_npi = decode_u8(body)?;
        let address_range = decode_cstring(body, limits::ADDRESS_RANGE, "address_range")?;

        Ok(BindTransceiver {
            sequence_number: header.sequence_number,
            system_id,
            password,
            system_type,
            interface_version,
            addr_ton,
            addr_npi,
            address_range,
        })
    }
}

impl Encodable for BindTransceiverResponse {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        PduHeader::new(
            CommandId::BindTransceiverResp,
            self.command_status,
            self.sequence_number,
        )
        .encode(buf);
        encode_cstring(buf, &self.system_id, limits::SYSTEM_ID, "system_id")
    }
}

impl Decodable for BindTransceiverResponse {
    fn command_id() -> CommandId {
        CommandId::BindTransceiverResp
    }

    fn decode(header: PduHeader, body: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        // Trailing TLVs (sc_interface_version) are not needed by the client.
        let system_id = if body.has_remaining() {
            decode_cstring(body, limits::SYSTEM_ID, "system_id")?
        } else {
            String::new()
        };

        Ok(BindTransceiverResponse {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            system_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Frame;

    #[test]
    fn bind_transceiver_body_layout() {
        let bind = BindTransceiver::new(1, "acme", "secret", "", InterfaceVersion::SmppV34);
        let bytes = bind.to_bytes().unwrap();

        assert_eq!(&bytes[0..4], &(bytes.len() as u32).to_be_bytes());
        assert_eq!(&bytes[4..8], &[0, 0, 0, 0x09]);
        assert_eq!(&bytes[16..], b"acme\0secret\0\0\x34\x00\x00\0");

        assert_eq!(Frame::parse(&bytes).unwrap(), Frame::BindTransceiver(bind));
    }

    #[test]
    fn bind_transceiver_rejects_overlong_password() {
        let bind = BindTransceiver::new(1, "acme", "much-too-long", "", InterfaceVersion::SmppV34);
        assert!(matches!(
            bind.to_bytes(),
            Err(CodecError::FieldValidation { field: "password", .. })
        ));
    }

    #[test]
    fn bind_response_without_body() {
        let data: &[u8] = &[
            0x00, 0x00, 0x00, 0x10, // command_length
            0x80, 0x00, 0x00, 0x09, // bind_transceiver_resp
            0x00, 0x00, 0x00, 0x0E, // invalid password
            0x00, 0x00, 0x00, 0x01, // sequence_number
        ];
        match Frame::parse(data).unwrap() {
            Frame::BindTransceiverResp(resp) => {
                assert_eq!(resp.command_status, 0x0E);
                assert!(resp.system_id.is_empty());
            }
            other => panic!("Expected BindTransceiverResp, got {other:?}"),
        }
    }
}
