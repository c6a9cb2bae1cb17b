//! JSON shapes exchanged with the backend, plus envelope handling.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use wab_core::{automation::DashboardStats, domain::BotStatus, errors::Error, Result};

/// Check the `{success, error}` envelope.
///
/// Responses without a `success` field (such as `/api/check-login`) pass through.
pub fn into_success(v: Value) -> Result<Value> {
    match v.get("success").and_then(Value::as_bool) {
        Some(false) => {
            let msg = v
                .get("error")
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())
                .unwrap_or("Unknown error")
                .to_string();
            Err(Error::Rejected(msg))
        }
        _ => Ok(v),
    }
}

pub fn decode<T: DeserializeOwned>(v: Value) -> Result<T> {
    serde_json::from_value(v).map_err(|e| Error::Transport(format!("unexpected response: {e}")))
}

#[derive(Debug, Serialize)]
pub struct SendMessageBody<'a> {
    pub phone: &'a str,
    pub message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_path: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_type: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct NewContactBody<'a> {
    pub name: &'a str,
    pub phone: &'a str,
}

#[derive(Debug, Serialize)]
pub struct InitBody {
    pub headless: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub default_country_code: Option<Value>,
}

impl Settings {
    /// Country code as digits, whether the server sent a string or a number.
    pub fn country_code(&self) -> Option<String> {
        let raw = match self.default_country_code.as_ref()? {
            Value::String(s) => s.trim().trim_start_matches('+').to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        Some(raw)
    }
}

#[derive(Debug, Deserialize)]
pub struct SettingsResponse {
    #[serde(default)]
    pub settings: Settings,
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub logged_in: bool,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl LoginResponse {
    pub fn bot_status(&self) -> BotStatus {
        if self.logged_in {
            return BotStatus::Connected;
        }
        match self.status.as_deref() {
            None | Some("waiting_for_scan") => BotStatus::WaitingForScan,
            Some("not_initialized") => BotStatus::NotInitialized,
            Some(_) => BotStatus::ProbeFailed,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UploadResponse {
    pub path: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ImportReport {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub imported: usize,
    #[serde(default)]
    pub skipped: usize,
}

#[derive(Debug, Deserialize)]
pub struct StatisticsResponse {
    #[serde(default)]
    pub statistics: DashboardStats,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn failed_envelope_surfaces_error_verbatim() {
        let err = into_success(json!({"success": false, "error": "Failed to send message"}))
            .unwrap_err();
        assert!(matches!(err, Error::Rejected(ref m) if m == "Failed to send message"));

        let err = into_success(json!({"success": false})).unwrap_err();
        assert_eq!(err.to_string(), "Unknown error");

        assert!(into_success(json!({"success": true, "path": "/x"})).is_ok());
        assert!(into_success(json!({"logged_in": false})).is_ok());
    }

    #[test]
    fn login_status_maps_to_bot_status() {
        let cases = [
            (json!({"logged_in": true, "status": "logged_in"}), BotStatus::Connected),
            (json!({"logged_in": false, "status": "waiting_for_scan"}), BotStatus::WaitingForScan),
            (json!({"logged_in": false, "status": "not_initialized"}), BotStatus::NotInitialized),
            (json!({"logged_in": false, "status": "error", "message": "boom"}), BotStatus::ProbeFailed),
            (json!({"logged_in": false}), BotStatus::WaitingForScan),
        ];
        for (v, want) in cases {
            let resp: LoginResponse = decode(v).unwrap();
            assert_eq!(resp.bot_status(), want);
        }
    }

    #[test]
    fn settings_country_code_accepts_string_or_number() {
        let s: SettingsResponse =
            decode(json!({"success": true, "settings": {"default_country_code": "+44"}})).unwrap();
        assert_eq!(s.settings.country_code().as_deref(), Some("44"));

        let s: SettingsResponse =
            decode(json!({"success": true, "settings": {"default_country_code": 1}})).unwrap();
        assert_eq!(s.settings.country_code().as_deref(), Some("1"));

        let s: SettingsResponse = decode(json!({"success": true, "settings": {}})).unwrap();
        assert_eq!(s.settings.country_code(), None);
    }

    #[test]
    fn send_body_omits_absent_attachment_fields() {
        let body = SendMessageBody {
            phone: "919876543210",
            message: "hi",
            attachment_path: None,
            file_type: None,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"phone": "919876543210", "message": "hi"})
        );
    }

    #[test]
    fn decode_failure_is_a_transport_error() {
        let err = decode::<UploadResponse>(json!({"success": true})).unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }
}
