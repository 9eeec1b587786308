// ABOUTME: Delivery receipt parser turning the free-text deliver_sm body into a typed receipt
// ABOUTME: Tolerates any field order and unknown provider status vocabulary

//! Delivery receipts arrive as text in the body of a deliver_sm, in the
//! informal format from SMPP v3.4 Appendix B:
//!
//! ```text
//! id:ABC123 sub:001 dlvrd:001 submit date:2401011200 done date:2401011201 stat:DELIVRD err:000 text:hi
//! ```
//!
//! Providers disagree on field order, casing and which fields are present, so
//! each field is looked up independently and a missing field is simply `None`.

use std::fmt;

/// Normalized final state of a submitted message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeliveryStatus {
    Delivered,
    Undelivered,
    Expired,
    Rejected,
    Unknown,
}

impl DeliveryStatus {
    /// Maps a provider status token. Unrecognized tokens are `Unknown`.
    pub fn from_token(token: &str) -> Self {
        match token.to_ascii_uppercase().as_str() {
            "DELIVRD" => DeliveryStatus::Delivered,
            "UNDELIV" => DeliveryStatus::Undelivered,
            "EXPIRED" => DeliveryStatus::Expired,
            "REJECTD" => DeliveryStatus::Rejected,
            _ => DeliveryStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Delivered => "DELIVERED",
            DeliveryStatus::Undelivered => "UNDELIVERED",
            DeliveryStatus::Expired => "EXPIRED",
            DeliveryStatus::Rejected => "REJECTED",
            DeliveryStatus::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeliveryReceipt {
    /// Message id the provider returned in submit_sm_resp.
    pub provider_message_id: Option<String>,
    /// Status token exactly as the provider sent it.
    pub raw_status: Option<String>,
    pub status: Option<DeliveryStatus>,
    /// Provider-specific network error code from `err:`.
    pub error_code: Option<String>,
}

impl DeliveryReceipt {
    pub fn is_delivered(&self) -> bool {
        self.status == Some(DeliveryStatus::Delivered)
    }
}

/// Parses receipt text. Never fails; unparsable input yields empty fields.
pub fn parse_receipt(text: &str) -> DeliveryReceipt {
    let raw_status = field(text, "stat:");

    DeliveryReceipt {
        provider_message_id: field(text, "id:"),
        status: raw_status.as_deref().map(DeliveryStatus::from_token),
        raw_status,
        error_code: field(text, "err:"),
    }
}

/// Finds the first whitespace-separated token starting with `label` and
/// returns the rest of that token. Labels match case-insensitively and only at
/// a token start, so `id:` does not match inside `subid:`.
fn field(text: &str, label: &str) -> Option<String> {
    text.split_whitespace().find_map(|token| {
        let head = token.get(..label.len())?;
        if !head.eq_ignore_ascii_case(label) {
            return None;
        }
        let value = &token[label.len()..];
        (!value.is_empty()).then(|| value.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_standard_receipt() {
        let receipt = parse_receipt("id:ABC123 sub:001 dlvrd:001 stat:DELIVRD err:000");

        assert_eq!(receipt.provider_message_id.as_deref(), Some("ABC123"));
        assert_eq!(receipt.raw_status.as_deref(), Some("DELIVRD"));
        assert_eq!(receipt.status, Some(DeliveryStatus::Delivered));
        assert_eq!(receipt.error_code.as_deref(), Some("000"));
        assert!(receipt.is_delivered());
    }

    #[test]
    fn status_without_id() {
        let receipt = parse_receipt("stat:EXPIRED");

        assert_eq!(receipt.provider_message_id, None);
        assert_eq!(receipt.raw_status.as_deref(), Some("EXPIRED"));
        assert_eq!(receipt.status, Some(DeliveryStatus::Expired));
    }

    #[test]
    fn unrecognized_status_is_unknown() {
        let receipt = parse_receipt("id:9 stat:FOOBAR");
        assert_eq!(receipt.raw_status.as_deref(), Some("FOOBAR"));
        assert_eq!(receipt.status, Some(DeliveryStatus::Unknown));
    }

    #[test]
    fn no_labels_yields_empty_receipt() {
        assert_eq!(parse_receipt("hello there"), DeliveryReceipt::default());
        assert_eq!(parse_receipt(""), DeliveryReceipt::default());
    }

    #[test]
    fn field_order_and_case_do_not_matter() {
        let receipt = parse_receipt("STAT:undeliv  submit date:2401011200 ID:x-77");
        assert_eq!(receipt.provider_message_id.as_deref(), Some("x-77"));
        assert_eq!(receipt.status, Some(DeliveryStatus::Undelivered));
    }

    #[test]
    fn labels_only_match_at_token_start() {
        let receipt = parse_receipt("subid:nope id:real stat:REJECTD");
        assert_eq!(receipt.provider_message_id.as_deref(), Some("real"));
        assert_eq!(receipt.status, Some(DeliveryStatus::Rejected));
    }

    #[test]
    fn vocabulary_mapping() {
        assert_eq!(DeliveryStatus::from_token("UNKNOWN"), DeliveryStatus::Unknown);
        assert_eq!(DeliveryStatus::from_token("REJECTD"), DeliveryStatus::Rejected);
        assert_eq!(DeliveryStatus::from_token("ACCEPTD"), DeliveryStatus::Unknown);
        assert_eq!(DeliveryStatus::Delivered.to_string(), "DELIVERED");
    }
}
