use crate::datatypes::CommandId;

/// Session termination request. An SMSC sends this before dropping the link.
#[derive(Clone, Debug, PartialEq)]
pub struct Unbind {
    pub command_status: u32,
    pub sequence_number: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UnbindResponse {
    pub command_status: u32,
    pub sequence_number: u32,
}

impl Unbind {
    pub fn new(sequence_number: u32) -> Self {
        Self {
            command_status: 0,
            sequence_number,
        }
    }
}

impl UnbindResponse {
    pub fn new(sequence_number: u32) -> Self {
        Self {
            command_status: 0,
            sequence_number,
        }
    }
}

impl_header_only_pdu!(Unbind, CommandId::Unbind);
impl_header_only_pdu!(UnbindResponse, CommandId::UnbindResp);
