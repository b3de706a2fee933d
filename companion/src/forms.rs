//! Form fields as entered by the user, and their validated requests

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::errors::{CompanionError, CompanionResult};

/// Raw appointment screen fields
#[derive(Debug, Clone, Default)]
pub struct AppointmentForm {
    pub user_email: String,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
}

/// Raw reminder screen fields
#[derive(Debug, Clone, Default)]
pub struct ReminderForm {
    pub medicine_name: String,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub user_email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentRequest {
    pub user_email: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderRequest {
    pub medicine_name: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub user_email: String,
}

fn required_text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Non-blank check that keeps the value exactly as typed
fn required_verbatim(value: &str) -> Option<String> {
    (!value.trim().is_empty()).then(|| value.to_string())
}

impl AppointmentForm {
    pub fn validate(&self) -> CompanionResult<AppointmentRequest> {
        match (required_text(&self.user_email), self.date, self.time) {
            (Some(user_email), Some(date), Some(time)) => Ok(AppointmentRequest {
                user_email,
                date,
                time,
            }),
            _ => Err(CompanionError::MissingFields),
        }
    }
}

impl ReminderForm {
    pub fn validate(&self) -> CompanionResult<ReminderRequest> {
        match (
            required_verbatim(&self.medicine_name),
            self.date,
            self.time,
            required_text(&self.user_email),
        ) {
            (Some(medicine_name), Some(date), Some(time), Some(user_email)) => {
                Ok(ReminderRequest {
                    medicine_name,
                    date,
                    time,
                    user_email,
                })
            }
            _ => Err(CompanionError::MissingFields),
        }
    }
}

impl AppointmentRequest {
    pub fn start(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }

    pub fn end(&self, duration: Duration) -> NaiveDateTime {
        self.start() + duration
    }
}

impl ReminderRequest {
    pub fn at(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }
}

/// Parse a `YYYY-MM-DD` date field
pub fn parse_date(raw: &str) -> CompanionResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| CompanionError::validation("date", format!("'{}' ({}), expected YYYY-MM-DD", raw, e)))
}

/// Parse a `HH:MM` or `HH:MM:SS` time field
pub fn parse_time(raw: &str) -> CompanionResult<NaiveTime> {
    let raw_trimmed = raw.trim();
    NaiveTime::parse_from_str(raw_trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw_trimmed, "%H:%M:%S"))
        .map_err(|e| CompanionError::validation("time", format!("'{}' ({}), expected HH:MM", raw, e)))
}
