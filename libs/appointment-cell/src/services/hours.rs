//! Resolution of the effective availability window for a (date, service)
//! pair. Pure functions over the doctor's weekly hours and the service's
//! optional override window.

use chrono::{Datelike, NaiveDate, NaiveTime};
use tracing::debug;

use doctor_cell::models::{DaySchedule, Service, WorkingHours};

/// Resolve the window a booking may land in on `date`.
///
/// Precedence: a service override window (both ends defined) beats the
/// doctor's weekly hours for that weekday. A service restricted to specific
/// weekdays yields no window on other days. `None` means "day off" and the
/// caller must treat it as zero slots, not as an error.
pub fn resolve_window(
    date: NaiveDate,
    service: Option<&Service>,
    working_hours: &WorkingHours,
) -> Option<(NaiveTime, NaiveTime)> {
    let weekday = date.weekday();

    if let Some(service) = service {
        if !service.offered_on(weekday) {
            debug!("Service {} not offered on {:?}", service.id, weekday);
            return None;
        }
        if let Some((start, end)) = service.override_window() {
            return Some((start, end));
        }
    }

    match working_hours.for_weekday(weekday) {
        DaySchedule::Open { start, end } => Some((start, end)),
        DaySchedule::Closed => None,
    }
}
