use crate::codec::{CodecError, Decodable, Encodable, PduHeader, decode_cstring, encode_cstring};
use crate::datatypes::{CommandId, Tlv, limits};
use bytes::{Buf, Bytes, BytesMut};
use std::io::Cursor;

/// registered_delivery value requesting an SMSC delivery receipt on final
/// outcome (success or failure).
pub(crate) const REGISTERED_DELIVERY_FINAL: u8 = 0x01;

/// submit_sm (SMPP v3.4 4.4.1): submits a single short message to the SMSC.
#[derive(Clone, Debug, PartialEq)]
pub struct SubmitSm {
    pub sequence_number: u32,
    pub service_type: String,
    pub source_addr_ton: u8,
    pub source_addr_npi: u8,
    /// Max 20 octets.
    pub source_addr: String,
    pub dest_addr_ton: u8,
    pub dest_addr_npi: u8,
    /// Max 20 octets.
    pub destination_addr: String,
    pub esm_class: u8,
    pub protocol_id: u8,
    pub priority_flag: u8,
    pub schedule_delivery_time: String,
    pub validity_period: String,
    pub registered_delivery: u8,
    pub replace_if_present_flag: u8,
    pub data_coding: u8,
    pub sm_default_msg_id: u8,
    /// Up to 254 octets; longer bodies are rejected by the encoder.
    pub short_message: Bytes,
    pub tlvs: Vec<Tlv>,
}

impl SubmitSm {
    /// A submit_sm with SMSC defaults for everything but the addresses and body.
    pub fn new(
        sequence_number: u32,
        source_addr: impl Into<String>,
        destination_addr: impl Into<String>,
        short_message: impl Into<Bytes>,
    ) -> Self {
        Self {
            sequence_number,
            service_type: String::new(),
            source_addr_ton: 0,
            source_addr_npi: 0,
            source_addr: source_addr.into(),
            dest_addr_ton: 0,
            dest_addr_npi: 0,
            destination_addr: destination_addr.into(),
            esm_class: 0,
            protocol_id: 0,
            priority_flag: 0,
            schedule_delivery_time: String::new(),
            validity_period: String::new(),
            registered_delivery: 0,
            replace_if_present_flag: 0,
            data_coding: 0,
            sm_default_msg_id: 0,
            short_message: short_message.into(),
            tlvs: Vec::new(),
        }
    }

    /// Ask the SMSC for a delivery receipt.
    pub fn with_delivery_receipt(mut self, requested: bool) -> Self {
        self.registered_delivery = if requested {
            REGISTERED_DELIVERY_FINAL
        } else {
            0
        };
        self
    }
}

impl_short_message_pdu!(SubmitSm, CommandId::SubmitSm);

/// submit_sm_resp. `message_id` is the SMSC-assigned id used to correlate
/// later delivery receipts; it is absent when the submit was rejected.
#[derive(Clone, Debug, PartialEq)]
pub struct SubmitSmResponse {
    pub command_status: u32,
    pub sequence_number: u32,
    pub message_id: String,
}

impl SubmitSmResponse {
    pub fn new(sequence_number: u32, command_status: u32, message_id: impl Into<String>) -> Self {
        Self {
            command_status,
            sequence_number,
            message_id: message_id.into(),
        }
    }
}

impl Encodable for SubmitSmResponse {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        PduHeader::new(CommandId::SubmitSmResp, self.command_status, self.sequence_number)
            .encode(buf);
        encode_cstring(buf, &self.message_id, limits::MESSAGE_ID, "message_id")
    }
}

impl Decodable for SubmitSmResponse {
    fn command_id() -> CommandId {
        CommandId::SubmitSmResp
    }

    fn decode(header: PduHeader, body: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        let message_id = if body.has_remaining() {
            decode_cstring(body, limits::MESSAGE_ID, "message_id")?
        } else {
            String::new()
        };

        Ok(SubmitSmResponse {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            message_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Frame;

    #[test]
    fn submit_sm_carries_addresses_and_body() {
        let submit = SubmitSm::new(5, "ACME", "15551234567", "Hello SMPP world!")
            .with_delivery_receipt(true);
        let bytes = submit.to_bytes().unwrap();

        match Frame::parse(&bytes).unwrap() {
            Frame::SubmitSm(decoded) => {
                assert_eq!(decoded.sequence_number, 5);
                assert_eq!(decoded.source_addr, "ACME");
                assert_eq!(decoded.destination_addr, "15551234567");
                assert_eq!(decoded.registered_delivery, REGISTERED_DELIVERY_FINAL);
                assert_eq!(decoded.short_message.as_ref(), b"Hello SMPP world!");
            }
            other => panic!("Expected SubmitSm, got {other:?}"),
        }
    }

    #[test]
    fn submit_sm_rejects_oversized_body() {
        let submit = SubmitSm::new(1, "A", "B", vec![b'x'; 255]);
        assert!(matches!(
            submit.to_bytes(),
            Err(CodecError::FieldValidation { field: "short_message", .. })
        ));
    }

    #[test]
    fn submit_sm_resp_error_without_body() {
        let data: &[u8] = &[
            0x00, 0x00, 0x00, 0x10, // command_length
            0x80, 0x00, 0x00, 0x04, // submit_sm_resp
            0x00, 0x00, 0x00, 0x58, // throttled
            0x00, 0x00, 0x00, 0x07, // sequence_number
        ];
        assert_eq!(
            Frame::parse(data).unwrap(),
            Frame::SubmitSmResp(SubmitSmResponse::new(7, 0x58, ""))
        );
    }
}
