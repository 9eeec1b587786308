use num_enum::TryFromPrimitive;

/// The command_status values this crate gives a name to.
///
/// The header keeps the raw `u32`; SMSCs use the vendor range (0x400-0x4FF)
/// freely, so a status outside this list is still a valid response.
#[derive(TryFromPrimitive)]
#[repr(u32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CommandStatus {
    /// No Error
    Ok = 0x0000_0000,
    /// Message Length is invalid
    InvalidMsgLength = 0x0000_0001,
    /// Command Length is invalid
    InvalidCommandLength = 0x0000_0002,
    /// Invalid Command ID
    InvalidCommandId = 0x0000_0003,
    /// Incorrect BIND Status for given command
    IncorrectBindStatus = 0x0000_0004,
    /// ESME Already in Bound State
    AlreadyBoundState = 0x0000_0005,
    /// System Error
    SystemError = 0x0000_0008,
    /// Invalid Source Address
    InvalidSourceAddress = 0x0000_000A,
    /// Invalid Dest Addr
    InvalidDestinationAddress = 0x0000_000B,
    /// Bind Failed
    BindFailed = 0x0000_000D,
    /// Invalid Password
    InvalidPassword = 0x0000_000E,
    /// Invalid System ID
    InvalidSystemId = 0x0000_000F,
    /// Message Queue Full
    MessageQueueFull = 0x0000_0014,
    /// submit_sm or submit_multi failed
    SubmitFailed = 0x0000_0045,
    /// Throttling error (ESME has exceeded allowed message limits)
    ThrottlingError = 0x0000_0058,
    /// ESME Receiver Permanent App Error Code
    ReceiverPermanentAppError = 0x0000_0064,
    /// Unknown Error
    UnknownError = 0x0000_00FF,
}

impl CommandStatus {
    /// Human readable form of a raw status for log lines.
    pub fn describe(raw: u32) -> String {
        match CommandStatus::try_from(raw) {
            Ok(status) => format!("{status:?} ({raw:#x})"),
            Err(_) if (0x400..=0x4FF).contains(&raw) => format!("VendorSpecific ({raw:#x})"),
            Err(_) => format!("Unrecognised ({raw:#x})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_known_vendor_and_unknown_codes() {
        assert_eq!(CommandStatus::describe(0x0E), "InvalidPassword (0xe)");
        assert_eq!(CommandStatus::describe(0x401), "VendorSpecific (0x401)");
        assert_eq!(CommandStatus::describe(0x999), "Unrecognised (0x999)");
    }
}
