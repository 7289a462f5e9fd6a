//! Conversion boundary between the portal's local (date, time-of-day) view of
//! a booking and the absolute timestamps the store persists. Everything else
//! in this cell works on one side of this boundary or the other.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::models::AppointmentError;

/// Combine a calendar date and a time-of-day into the stored instant.
pub fn to_storage(date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    date.and_time(time).and_utc()
}

/// Split a stored instant back into the portal's (date, time-of-day) pair.
pub fn from_storage(instant: DateTime<Utc>) -> (NaiveDate, NaiveTime) {
    (instant.date_naive(), instant.time())
}

/// Parse a slot label as the UI submits it ("09:30"). Seconds are accepted
/// but never produced.
pub fn parse_time_of_day(value: &str) -> Result<NaiveTime, AppointmentError> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| AppointmentError::InvalidTime(format!("Invalid time of day: {}", value)))
}

/// Render a time-of-day the way slots are presented to the UI.
pub fn format_time_of_day(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}
