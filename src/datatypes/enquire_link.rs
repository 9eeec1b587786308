use crate::datatypes::CommandId;

/// Keep-alive request. May be sent by either peer once bound.
#[derive(Clone, Debug, PartialEq)]
pub struct EnquireLink {
    pub command_status: u32,
    pub sequence_number: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnquireLinkResponse {
    pub command_status: u32,
    pub sequence_number: u32,
}

impl EnquireLink {
    pub fn new(sequence_number: u32) -> Self {
        Self {
            command_status: 0,
            sequence_number,
        }
    }
}

impl EnquireLinkResponse {
    pub fn new(sequence_number: u32) -> Self {
        Self {
            command_status: 0,
            sequence_number,
        }
    }
}

impl_header_only_pdu!(EnquireLink, CommandId::EnquireLink);
impl_header_only_pdu!(EnquireLinkResponse, CommandId::EnquireLinkResp);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Encodable, Frame};

    #[test]
    fn enquire_link_wire_format() {
        let bytes = EnquireLink::new(42).to_bytes().unwrap();
        assert_eq!(
            bytes.as_ref(),
            &[0, 0, 0, 16, 0, 0, 0, 0x15, 0, 0, 0, 0, 0, 0, 0, 42]
        );
        assert_eq!(
            Frame::parse(&bytes).unwrap(),
            Frame::EnquireLink(EnquireLink::new(42))
        );
    }
}
