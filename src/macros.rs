// ABOUTME: Macros that remove boilerplate from the PDU codec implementations
// ABOUTME: Covers header-only PDUs and the shared submit_sm/deliver_sm message layout

/// Implements `Encodable`/`Decodable` for a PDU that is nothing but a header.
///
/// The struct must have `command_status: u32` and `sequence_number: u32`.
macro_rules! impl_header_only_pdu {
    ($pdu_type:ident, $command_id:expr) => {
        impl $crate::codec::Decodable for $pdu_type {
            fn command_id() -> $crate::datatypes::CommandId {
                $command_id
            }

            fn decode(
                header: $crate::codec::PduHeader,
                _body: &mut std::io::Cursor<&[u8]>,
            ) -> Result<Self, $crate::codec::CodecError> {
                Self::validate_header(&header)?;

                // Some SMSCs pad header-only PDUs; trailing bytes are ignored.
                Ok($pdu_type {
                    command_status: header.command_status,
                    sequence_number: header.sequence_number,
                })
            }
        }

        impl $crate::codec::Encodable for $pdu_type {
            fn encode(&self, buf: &mut bytes::BytesMut) -> Result<(), $crate::codec::CodecError> {
                $crate::codec::PduHeader::new($command_id, self.command_status, self.sequence_number)
                    .encode(buf);
                Ok(())
            }
        }
    };
}

/// Implements `Encodable`/`Decodable` for the submit_sm / deliver_sm body.
///
/// Both PDUs share the same mandatory parameter layout (SMPP v3.4 4.4.1 and
/// 4.6.1) followed by optional TLVs.
macro_rules! impl_short_message_pdu {
    ($pdu_type:ident, $command_id:expr) => {
        impl $crate::codec::Decodable for $pdu_type {
            fn command_id() -> $crate::datatypes::CommandId {
                $command_id
            }

            fn decode(
                header: $crate::codec::PduHeader,
                body: &mut std::io::Cursor<&[u8]>,
            ) -> Result<Self, $crate::codec::CodecError> {
                use $crate::codec::{decode_cstring, decode_u8, CodecError};
                use $crate::datatypes::limits;
                use bytes::Buf;

                Self::validate_header(&header)?;

                let service_type = decode_cstring(body, limits::SERVICE_TYPE, "service_type")?;
                let source_addr_ton = decode_u8(body)?;
                let source_addr_npi = decode_u8(body)?;
                let source_addr = decode_cstring(body, limits::ADDRESS, "source_addr")?;
                let dest_addr_ton = decode_u8(body)?;
                let dest_addr_npi = decode_u8(body)?;
                let destination_addr = decode_cstring(body, limits::ADDRESS, "destination_addr")?;
                let esm_class = decode_u8(body)?;
                let protocol_id = decode_u8(body)?;
                let priority_flag = decode_u8(body)?;
                let schedule_delivery_time =
                    decode_cstring(body, limits::TIME, "schedule_delivery_time")?;
                let validity_period = decode_cstring(body, limits::TIME, "validity_period")?;
                let registered_delivery = decode_u8(body)?;
                let replace_if_present_flag = decode_u8(body)?;
                let data_coding = decode_u8(body)?;
                let sm_default_msg_id = decode_u8(body)?;
                let sm_length = decode_u8(body)? as usize;

                if body.remaining() < sm_length {
                    return Err(CodecError::FieldValidation {
                        field: "short_message",
                        reason: format!(
                            "sm_length {} exceeds remaining {} octets",
                            sm_length,
                            body.remaining()
                        ),
                    });
                }
                let short_message = body.copy_to_bytes(sm_length);
                let tlvs = $crate::datatypes::Tlv::decode_all(body)?;

                Ok($pdu_type {
                    sequence_number: header.sequence_number,
                    service_type,
                    source_addr_ton,
                    source_addr_npi,
                    source_addr,
                    dest_addr_ton,
                    dest_addr_npi,
                    destination_addr,
                    esm_class,
                    protocol_id,
                    priority_flag,
                    schedule_delivery_time,
                    validity_period,
                    registered_delivery,
                    replace_if_present_flag,
                    data_coding,
                    sm_default_msg_id,
                    short_message,
                    tlvs,
                })
            }
        }

        impl $crate::codec::Encodable for $pdu_type {
            fn encode(&self, buf: &mut bytes::BytesMut) -> Result<(), $crate::codec::CodecError> {
                use $crate::codec::{encode_cstring, CodecError, PduHeader};
                use $crate::datatypes::limits;
                use bytes::BufMut;

                if self.short_message.len() > limits::SHORT_MESSAGE {
                    return Err(CodecError::FieldValidation {
                        field: "short_message",
                        reason: format!(
                            "{} octets exceeds the {} octet limit",
                            self.short_message.len(),
                            limits::SHORT_MESSAGE
                        ),
                    });
                }

                PduHeader::new($command_id, 0, self.sequence_number).encode(buf);
                encode_cstring(buf, &self.service_type, limits::SERVICE_TYPE, "service_type")?;
                buf.put_u8(self.source_addr_ton);
                buf.put_u8(self.source_addr_npi);
                encode_cstring(buf, &self.source_addr, limits::ADDRESS, "source_addr")?;
                buf.put_u8(self.dest_addr_ton);
                buf.put_u8(self.dest_addr_npi);
                encode_cstring(buf, &self.destination_addr, limits::ADDRESS, "destination_addr")?;
                buf.put_u8(self.esm_class);
                buf.put_u8(self.protocol_id);
                buf.put_u8(self.priority_flag);
                encode_cstring(
                    buf,
                    &self.schedule_delivery_time,
                    limits::TIME,
                    "schedule_delivery_time",
                )?;
                encode_cstring(buf, &self.validity_period, limits::TIME, "validity_period")?;
                buf.put_u8(self.registered_delivery);
                buf.put_u8(self.replace_if_present_flag);
                buf.put_u8(self.data_coding);
                buf.put_u8(self.sm_default_msg_id);
                buf.put_u8(self.short_message.len() as u8);
                buf.put_slice(&self.short_message);
                for tlv in &self.tlvs {
                    tlv.encode(buf);
                }
                Ok(())
            }
        }
    };
}
