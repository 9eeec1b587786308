use crate::codec::{CodecError, Decodable, Encodable, PduHeader, decode_cstring, encode_cstring};
use crate::datatypes::{CommandId, Tlv, limits, tags};
use bytes::{Buf, Bytes, BytesMut};
use std::io::Cursor;

/// esm_class bit marking a deliver_sm as an SMSC delivery receipt.
const ESM_CLASS_DELIVERY_RECEIPT: u8 = 0x04;

/// deliver_sm (SMPP v3.4 4.6.1): used by the SMSC both for mobile originated
/// messages and for delivery receipts of earlier submissions.
#[derive(Clone, Debug, PartialEq)]
pub struct DeliverSm {
    pub sequence_number: u32,
    pub service_type: String,
    pub source_addr_ton: u8,
    pub source_addr_npi: u8,
    pub source_addr: String,
    pub dest_addr_ton: u8,
    pub dest_addr_npi: u8,
    pub destination_addr: String,
    /// Bit 2 set means the payload is a delivery receipt.
    pub esm_class: u8,
    pub protocol_id: u8,
    pub priority_flag: u8,
    pub schedule_delivery_time: String,
    pub validity_period: String,
    pub registered_delivery: u8,
    pub replace_if_present_flag: u8,
    pub data_coding: u8,
    pub sm_default_msg_id: u8,
    pub short_message: Bytes,
    pub tlvs: Vec<Tlv>,
}

impl DeliverSm {
    /// A delivery receipt carrying `text` in short_message.
    pub fn receipt(sequence_number: u32, text: impl Into<Bytes>) -> Self {
        Self {
            sequence_number,
            service_type: String::new(),
            source_addr_ton: 0,
            source_addr_npi: 0,
            source_addr: String::new(),
            dest_addr_ton: 0,
            dest_addr_npi: 0,
            destination_addr: String::new(),
            esm_class: ESM_CLASS_DELIVERY_RECEIPT,
            protocol_id: 0,
            priority_flag: 0,
            schedule_delivery_time: String::new(),
            validity_period: String::new(),
            registered_delivery: 0,
            replace_if_present_flag: 0,
            data_coding: 0,
            sm_default_msg_id: 0,
            short_message: text.into(),
            tlvs: Vec::new(),
        }
    }

    pub fn is_delivery_receipt(&self) -> bool {
        self.esm_class & ESM_CLASS_DELIVERY_RECEIPT != 0
    }

    /// The message text: short_message, or the message_payload TLV when the
    /// SMSC left short_message empty.
    pub fn payload(&self) -> &[u8] {
        if !self.short_message.is_empty() {
            return &self.short_message;
        }
        self.tlvs
            .iter()
            .find(|tlv| tlv.tag == tags::MESSAGE_PAYLOAD)
            .map(|tlv| tlv.value.as_ref())
            .unwrap_or_default()
    }
}

impl_short_message_pdu!(DeliverSm, CommandId::DeliverSm);

/// deliver_sm_resp. The message_id field is unused and always NULL.
#[derive(Clone, Debug, PartialEq)]
pub struct DeliverSmResponse {
    pub command_status: u32,
    pub sequence_number: u32,
}

impl DeliverSmResponse {
    pub fn new(sequence_number: u32) -> Self {
        Self {
            command_status: 0,
            sequence_number,
        }
    }

    /// A negative acknowledgement; the SMSC decides from `command_status`
    /// whether to redeliver.
    pub fn with_status(mut self, command_status: u32) -> Self {
        self.command_status = command_status;
        self
    }
}

impl Encodable for DeliverSmResponse {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        PduHeader::new(CommandId::DeliverSmResp, self.command_status, self.sequence_number)
            .encode(buf);
        encode_cstring(buf, "", limits::MESSAGE_ID, "message_id")
    }
}

impl Decodable for DeliverSmResponse {
    fn command_id() -> CommandId {
        CommandId::DeliverSmResp
    }

    fn decode(header: PduHeader, body: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;
        if body.has_remaining() {
            decode_cstring(body, limits::MESSAGE_ID, "message_id")?;
        }
        Ok(DeliverSmResponse {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
        })
    }
}
