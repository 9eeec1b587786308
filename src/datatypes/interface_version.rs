use num_enum::TryFromPrimitive;
use serde::Deserialize;

/// This parameter is used to indicate the version of the SMPP protocol.
///
/// Deserializes from the numeric form used on the wire (`0x34`, i.e. `52`).
#[derive(TryFromPrimitive, Deserialize)]
#[serde(try_from = "u8")]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InterfaceVersion {
    SmppV33 = 0x33,
    SmppV34 = 0x34,
    SmppV50 = 0x50,
}

impl Default for InterfaceVersion {
    fn default() -> Self {
        InterfaceVersion::SmppV34
    }
}
