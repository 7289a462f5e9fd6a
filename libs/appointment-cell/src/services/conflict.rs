//! Interval overlap checks between a candidate booking and a doctor's
//! existing appointments. Intervals are half-open: an appointment ending at
//! T never blocks a candidate starting at T.

use chrono::{DateTime, Utc};

use crate::models::Appointment;

/// Whether `[candidate_start, candidate_end)` overlaps `[start, end)`.
pub fn intervals_overlap(
    candidate_start: DateTime<Utc>,
    candidate_end: DateTime<Utc>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> bool {
    candidate_start < end && candidate_end > start
}

/// Whether the candidate interval collides with any blocking appointment.
/// Cancelled appointments are skipped, so cancelling frees the slot at once.
pub fn conflicts(
    candidate_start: DateTime<Utc>,
    candidate_end: DateTime<Utc>,
    existing: &[Appointment],
) -> bool {
    existing.iter().any(|appointment| {
        appointment.is_blocking()
            && intervals_overlap(
                candidate_start,
                candidate_end,
                appointment.start_time,
                appointment.end_time,
            )
    })
}

/// The blocking appointments the candidate interval collides with,
/// optionally ignoring one appointment (used when rechecking a reschedule).
pub fn conflicting_appointments(
    candidate_start: DateTime<Utc>,
    candidate_end: DateTime<Utc>,
    existing: &[Appointment],
    exclude_id: Option<uuid::Uuid>,
) -> Vec<Appointment> {
    existing
        .iter()
        .filter(|appointment| {
            Some(appointment.id) != exclude_id
                && appointment.is_blocking()
                && intervals_overlap(
                    candidate_start,
                    candidate_end,
                    appointment.start_time,
                    appointment.end_time,
                )
        })
        .cloned()
        .collect()
}
