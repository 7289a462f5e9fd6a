//! Free-slot generation for a doctor's day. Candidates step through the
//! availability window in increments of the service duration, so slots are
//! duration-aligned from the window start and never overlap each other by
//! construction.

use chrono::{Duration, NaiveDate, NaiveTime};
use tracing::debug;

use crate::convert::to_storage;
use crate::models::{Appointment, AvailableSlot};
use crate::services::conflict;

/// Generate the ordered free slots inside `[window_start, window_end)`.
///
/// A candidate is kept only when it fits entirely before closing and does
/// not collide with a blocking appointment. An inverted or undersized
/// window yields an empty list; that is the normal "no valid hours" case,
/// not an error.
pub fn generate_slots(
    date: NaiveDate,
    duration_minutes: i64,
    window_start: NaiveTime,
    window_end: NaiveTime,
    existing: &[Appointment],
) -> Vec<AvailableSlot> {
    if duration_minutes <= 0 || window_start >= window_end {
        return Vec::new();
    }

    let duration = Duration::minutes(duration_minutes);
    let mut slots = Vec::new();
    let mut cursor = window_start;

    loop {
        let slot_end = match cursor.overflowing_add_signed(duration) {
            (end, 0) => end,
            // Wrapped past midnight, so the slot cannot fit in the window.
            _ => break,
        };
        if slot_end > window_end || slot_end <= cursor {
            break;
        }

        let candidate_start = to_storage(date, cursor);
        let candidate_end = to_storage(date, slot_end);

        if !conflict::conflicts(candidate_start, candidate_end, existing) {
            slots.push(AvailableSlot { start: cursor, end: slot_end });
        }

        cursor = slot_end;
    }

    debug!(
        "Generated {} free slots of {} min between {} and {}",
        slots.len(),
        duration_minutes,
        window_start,
        window_end
    );
    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppointmentStatus;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    fn booked(h1: u32, m1: u32, h2: u32, m2: u32, status: AppointmentStatus) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            client_first_name: "Joan".to_string(),
            client_last_name: "Clarke".to_string(),
            service_id: Uuid::new_v4(),
            service_name: "Consultation".to_string(),
            status,
            start_time: Utc.with_ymd_and_hms(2025, 3, 10, h1, m1, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2025, 3, 10, h2, m2, 0).unwrap(),
            notes: None,
            created_at: Utc::now(),
        }
    }

    fn starts(slots: &[AvailableSlot]) -> Vec<NaiveTime> {
        slots.iter().map(|s| s.start).collect()
    }

    #[test]
    fn empty_day_yields_every_aligned_slot() {
        let slots = generate_slots(day(), 30, t(9, 0), t(12, 0), &[]);
        assert_eq!(
            starts(&slots),
            vec![t(9, 0), t(9, 30), t(10, 0), t(10, 30), t(11, 0), t(11, 30)]
        );
        // 12:00 would end at 12:30, past the window, so it is excluded.
    }

    #[test]
    fn booked_slot_is_excluded_others_unchanged() {
        let existing = vec![booked(10, 0, 10, 30, AppointmentStatus::Confirmed)];
        let slots = generate_slots(day(), 30, t(9, 0), t(12, 0), &existing);
        assert_eq!(
            starts(&slots),
            vec![t(9, 0), t(9, 30), t(10, 30), t(11, 0), t(11, 30)]
        );
    }

    #[test]
    fn cancelled_appointment_frees_its_slot() {
        let existing = vec![booked(10, 0, 10, 30, AppointmentStatus::Cancelled)];
        let slots = generate_slots(day(), 30, t(9, 0), t(12, 0), &existing);
        assert_eq!(slots.len(), 6);
    }

    #[test]
    fn last_partial_step_is_dropped() {
        let slots = generate_slots(day(), 30, t(9, 0), t(9, 45), &[]);
        assert_eq!(starts(&slots), vec![t(9, 0)]);
    }

    #[test]
    fn window_shorter_than_duration_yields_nothing() {
        assert!(generate_slots(day(), 30, t(9, 0), t(9, 20), &[]).is_empty());
    }

    #[test]
    fn inverted_or_empty_window_yields_nothing() {
        assert!(generate_slots(day(), 30, t(12, 0), t(9, 0), &[]).is_empty());
        assert!(generate_slots(day(), 30, t(9, 0), t(9, 0), &[]).is_empty());
    }

    #[test]
    fn nonpositive_duration_yields_nothing() {
        assert!(generate_slots(day(), 0, t(9, 0), t(17, 0), &[]).is_empty());
        assert!(generate_slots(day(), -15, t(9, 0), t(17, 0), &[]).is_empty());
    }

    #[test]
    fn duration_equal_to_window_yields_single_slot() {
        let slots = generate_slots(day(), 180, t(9, 0), t(12, 0), &[]);
        assert_eq!(starts(&slots), vec![t(9, 0)]);
    }

    #[test]
    fn slots_are_aligned_to_window_start() {
        let slots = generate_slots(day(), 45, t(8, 15), t(12, 0), &[]);
        for slot in &slots {
            let offset = slot.start.signed_duration_since(t(8, 15));
            assert_eq!(offset.num_minutes() % 45, 0);
        }
        // 11:15 + 45min ends exactly at the 12:00 close, so it still fits.
        assert_eq!(
            starts(&slots),
            vec![t(8, 15), t(9, 0), t(9, 45), t(10, 30), t(11, 15)]
        );
    }

    #[test]
    fn appointment_ending_at_window_start_does_not_block() {
        // Half-open adjacency: an appointment ending exactly at 09:00 leaves
        // the 09:00 slot free.
        let existing = vec![booked(8, 30, 9, 0, AppointmentStatus::Confirmed)];
        let slots = generate_slots(day(), 30, t(9, 0), t(10, 0), &existing);
        assert_eq!(starts(&slots), vec![t(9, 0), t(9, 30)]);
    }

    #[test]
    fn partial_overlap_blocks_the_touched_slots_only() {
        // 10:15-10:45 straddles the 10:00 and 10:30 candidates.
        let existing = vec![booked(10, 15, 10, 45, AppointmentStatus::Pending)];
        let slots = generate_slots(day(), 30, t(9, 0), t(12, 0), &existing);
        assert_eq!(starts(&slots), vec![t(9, 0), t(9, 30), t(11, 0), t(11, 30)]);
    }

    #[test]
    fn output_is_ascending() {
        let existing = vec![
            booked(9, 30, 10, 0, AppointmentStatus::Confirmed),
            booked(11, 0, 11, 30, AppointmentStatus::Confirmed),
        ];
        let slots = generate_slots(day(), 30, t(9, 0), t(12, 0), &existing);
        let times = starts(&slots);
        let mut sorted = times.clone();
        sorted.sort();
        assert_eq!(times, sorted);
    }
}
