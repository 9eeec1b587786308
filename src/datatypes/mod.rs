mod bind_transceiver;
mod command_id;
mod command_status;
mod deliver_sm;
mod enquire_link;
mod generic_nack;
mod interface_version;
mod submit_sm;
mod tlv;
mod unbind;

pub use bind_transceiver::{BindTransceiver, BindTransceiverResponse};
pub use command_id::CommandId;
pub use command_status::CommandStatus;
pub use deliver_sm::{DeliverSm, DeliverSmResponse};
pub use enquire_link::{EnquireLink, EnquireLinkResponse};
pub use generic_nack::GenericNack;
pub use interface_version::InterfaceVersion;
pub use submit_sm::{SubmitSm, SubmitSmResponse};
pub use tlv::{Tlv, tags};
pub use unbind::{Unbind, UnbindResponse};

/// SMPP v3.4 C-octet string limits, terminator included.
pub mod limits {
    pub const SYSTEM_ID: usize = 16;
    pub const PASSWORD: usize = 9;
    pub const SYSTEM_TYPE: usize = 13;
    pub const ADDRESS_RANGE: usize = 41;
    pub const SERVICE_TYPE: usize = 6;
    pub const ADDRESS: usize = 21;
    pub const TIME: usize = 17;
    pub const MESSAGE_ID: usize = 65;

    /// Octets allowed in the short_message field itself.
    pub const SHORT_MESSAGE: usize = 254;
}
