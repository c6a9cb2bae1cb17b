use chrono::{Local, NaiveDateTime};
use serde::Serialize;

use crate::{errors::Error, Result};

/// Input format of a scheduled send time (local wall clock, minute precision).
pub const SCHEDULE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// A message to be delivered later by the backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScheduleRequest {
    pub phone: String,
    pub message: String,
    pub scheduled_time: NaiveDateTime,
}

/// Wire body for `POST /api/schedule-message`.
#[derive(Debug, Serialize)]
pub struct ScheduleBody<'a> {
    pub phone: &'a str,
    pub message: &'a str,
    pub scheduled_time: String,
}

impl ScheduleRequest {
    pub fn new(phone: &str, message: &str, scheduled_time: &str) -> Result<Self> {
        Self::new_at(phone, message, scheduled_time, Local::now().naive_local())
    }

    /// Validate against an explicit `now`.
    pub fn new_at(
        phone: &str,
        message: &str,
        scheduled_time: &str,
        now: NaiveDateTime,
    ) -> Result<Self> {
        let phone = phone.trim();
        let message = message.trim();
        let raw_time = scheduled_time.trim();
        if phone.is_empty() || message.is_empty() || raw_time.is_empty() {
            return Err(Error::validation("All fields are required"));
        }

        let scheduled_time = NaiveDateTime::parse_from_str(raw_time, SCHEDULE_TIME_FORMAT)
            .map_err(|_| {
                Error::validation(format!(
                    "Invalid scheduled time {raw_time:?}, expected YYYY-MM-DDTHH:MM"
                ))
            })?;
        if scheduled_time <= now {
            return Err(Error::validation("Scheduled time must be in the future"));
        }

        Ok(Self {
            phone: phone.to_string(),
            message: message.to_string(),
            scheduled_time,
        })
    }

    pub fn body(&self) -> ScheduleBody<'_> {
        ScheduleBody {
            phone: &self.phone,
            message: &self.message,
            scheduled_time: self.scheduled_time.format(SCHEDULE_TIME_FORMAT).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2024-05-01T12:00", SCHEDULE_TIME_FORMAT).unwrap()
    }

    #[test]
    fn accepts_future_time_and_serializes_minute_precision() {
        let req = ScheduleRequest::new_at(" 919876543210 ", "hi", "2024-05-01T12:01", now()).unwrap();
        let body = serde_json::to_value(req.body()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "phone": "919876543210",
                "message": "hi",
                "scheduled_time": "2024-05-01T12:01"
            })
        );
    }

    #[test]
    fn rejects_past_present_and_malformed_times() {
        for t in ["2024-05-01T12:00", "2024-04-30T23:59", "tomorrow", "2024-05-01 13:00"] {
            let err = ScheduleRequest::new_at("919876543210", "hi", t, now()).unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "{t}");
        }
    }

    #[test]
    fn all_fields_are_required() {
        let err = ScheduleRequest::new_at("", "hi", "2024-06-01T00:00", now()).unwrap_err();
        assert_eq!(err.to_string(), "All fields are required");
        assert!(ScheduleRequest::new_at("1", "  ", "2024-06-01T00:00", now()).is_err());
    }
}
