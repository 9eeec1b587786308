use crate::datatypes::CommandId;

/// Negative acknowledgement for a PDU the peer could not process at all.
#[derive(Clone, Debug, PartialEq)]
pub struct GenericNack {
    pub command_status: u32,
    pub sequence_number: u32,
}

impl GenericNack {
    pub fn new(sequence_number: u32, command_status: u32) -> Self {
        Self {
            command_status,
            sequence_number,
        }
    }
}

impl_header_only_pdu!(GenericNack, CommandId::GenericNack);
