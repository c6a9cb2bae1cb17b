use std::fmt;

use serde::{Deserialize, Serialize};

/// Delivery status of a contact within the most recent attempt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactStatus {
    #[default]
    Pending,
    Sent,
    Failed,
}

impl ContactStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ContactStatus::Pending => "pending",
            ContactStatus::Sent => "sent",
            ContactStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ContactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A phone/name record.
///
/// Field names match the persisted JSON layout (`countryCode`, `localNumber`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub phone: String,
    #[serde(default)]
    pub country_code: String,
    #[serde(default)]
    pub local_number: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: ContactStatus,
    #[serde(default)]
    pub selected: bool,
}

impl Contact {
    /// Build a pending, unselected contact from an already-normalized phone.
    pub fn new(phone: impl Into<String>, name: impl Into<String>) -> Self {
        let phone = phone.into();
        let parts = crate::phone::split_phone(&phone);
        Self {
            phone,
            country_code: parts.country_code,
            local_number: parts.local_number,
            name: name.into(),
            status: ContactStatus::Pending,
            selected: false,
        }
    }

    pub fn is_valid(&self) -> bool {
        crate::phone::is_valid_phone(self.phone.trim())
    }

    /// Name used for `{name}` substitution.
    pub fn greeting_name(&self) -> &str {
        if self.name.is_empty() {
            "there"
        } else {
            &self.name
        }
    }
}

/// Remote messaging-session state as reported by the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BotStatus {
    Connected,
    WaitingForScan,
    NotInitialized,
    ProbeFailed,
}

impl BotStatus {
    pub fn is_connected(self) -> bool {
        matches!(self, BotStatus::Connected)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BotStatus::Connected => "connected",
            BotStatus::WaitingForScan => "waiting_for_scan",
            BotStatus::NotInitialized => "not_initialized",
            BotStatus::ProbeFailed => "probe_failed",
        }
    }
}

impl fmt::Display for BotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server-assigned path identifying an uploaded attachment.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AttachmentRef(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contact_json_uses_camel_case_and_lowercase_status() {
        let c = Contact::new("919876543210", "Alice");
        let v = serde_json::to_value(&c).unwrap();
        assert_eq!(v["countryCode"], "91");
        assert_eq!(v["localNumber"], "9876543210");
        assert_eq!(v["status"], "pending");
        assert_eq!(v["selected"], false);
    }

    #[test]
    fn legacy_record_without_split_fields_deserializes() {
        let c: Contact = serde_json::from_str(r#"{"phone":"919876543210","status":"sent"}"#).unwrap();
        assert_eq!(c.status, ContactStatus::Sent);
        assert!(c.country_code.is_empty());
        assert!(c.name.is_empty());
    }

    #[test]
    fn greeting_falls_back_to_there() {
        let c = Contact::new("919876543210", "");
        assert_eq!(c.greeting_name(), "there");
    }
}
