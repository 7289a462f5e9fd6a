use chrono::{DateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==============================================================================
// WORKING HOURS
// ==============================================================================

/// One weekday of a doctor's schedule. A day with no hours is a first-class
/// `Closed` state rather than a pair of nullable times, so every consumer has
/// to handle it explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DaySchedule {
    Closed,
    Open { start: NaiveTime, end: NaiveTime },
}

impl DaySchedule {
    pub fn is_open(&self) -> bool {
        matches!(self, DaySchedule::Open { .. })
    }
}

/// Weekly working hours, indexed 0 = Sunday through 6 = Saturday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkingHours(pub [DaySchedule; 7]);

impl Default for WorkingHours {
    fn default() -> Self {
        Self([DaySchedule::Closed; 7])
    }
}

impl WorkingHours {
    pub fn for_weekday(&self, weekday: Weekday) -> DaySchedule {
        self.0[weekday.num_days_from_sunday() as usize]
    }

    pub fn set(&mut self, weekday: Weekday, schedule: DaySchedule) {
        self.0[weekday.num_days_from_sunday() as usize] = schedule;
    }

    pub fn open_days(&self) -> usize {
        self.0.iter().filter(|d| d.is_open()).count()
    }
}

// ==============================================================================
// DOCTOR RECORDS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub specialty: Option<String>,
    pub timezone: Option<String>,
    pub is_active: bool,
    pub working_hours: WorkingHours,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Doctor {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDoctorRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub specialty: Option<String>,
    pub timezone: Option<String>,
    pub working_hours: Option<WorkingHours>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateDoctorRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub specialty: Option<String>,
    pub timezone: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateWorkingHoursRequest {
    pub working_hours: WorkingHours,
}

// ==============================================================================
// SERVICE CATALOG
// ==============================================================================

/// A bookable offering. `days` restricts the weekdays the service is offered
/// (empty = whatever the doctor works); `start_time`/`end_time`, when both
/// set, override the doctor's hours for this service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub duration_minutes: i64,
    pub price: f64,
    #[serde(default)]
    pub days: Vec<u8>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Service {
    /// The override window, only when both ends are defined.
    pub fn override_window(&self) -> Option<(NaiveTime, NaiveTime)> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }

    /// Whether the service is offered on the given weekday. An empty `days`
    /// set defers entirely to the doctor's working hours.
    pub fn offered_on(&self, weekday: Weekday) -> bool {
        self.days.is_empty() || self.days.contains(&(weekday.num_days_from_sunday() as u8))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateServiceRequest {
    pub name: String,
    pub description: Option<String>,
    pub duration_minutes: i64,
    pub price: f64,
    #[serde(default)]
    pub days: Vec<u8>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateServiceRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub duration_minutes: Option<i64>,
    pub price: Option<f64>,
    pub days: Option<Vec<u8>>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Service not found")]
    ServiceNotFound,

    #[error("Doctor with email {0} already exists")]
    DuplicateEmail(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn default_working_hours_are_closed_all_week() {
        let hours = WorkingHours::default();
        assert_eq!(hours.open_days(), 0);
        assert_eq!(hours.for_weekday(Weekday::Mon), DaySchedule::Closed);
    }

    #[test]
    fn weekday_indexing_is_sunday_based() {
        let mut hours = WorkingHours::default();
        hours.set(Weekday::Sun, DaySchedule::Open { start: t(9, 0), end: t(12, 0) });

        assert!(hours.0[0].is_open());
        assert_eq!(hours.for_weekday(Weekday::Mon), DaySchedule::Closed);
    }

    #[test]
    fn working_hours_serde_roundtrip() {
        let mut hours = WorkingHours::default();
        hours.set(Weekday::Tue, DaySchedule::Open { start: t(8, 30), end: t(16, 0) });

        let json = serde_json::to_string(&hours).unwrap();
        assert!(json.contains("\"status\":\"open\""));
        assert!(json.contains("\"status\":\"closed\""));

        let parsed: WorkingHours = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, hours);
    }

    #[test]
    fn service_override_window_requires_both_ends() {
        let mut service = sample_service();
        service.start_time = Some(t(13, 0));
        service.end_time = None;
        assert!(service.override_window().is_none());

        service.end_time = Some(t(14, 0));
        assert_eq!(service.override_window(), Some((t(13, 0), t(14, 0))));
    }

    #[test]
    fn service_day_restriction() {
        let mut service = sample_service();
        assert!(service.offered_on(Weekday::Wed));

        service.days = vec![1, 3]; // Monday, Wednesday
        assert!(service.offered_on(Weekday::Mon));
        assert!(service.offered_on(Weekday::Wed));
        assert!(!service.offered_on(Weekday::Fri));
    }

    fn sample_service() -> Service {
        Service {
            id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            name: "Consultation".to_string(),
            description: None,
            duration_minutes: 30,
            price: 50.0,
            days: vec![],
            start_time: None,
            end_time: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}
