use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ==============================================================================
// APPOINTMENT RECORDS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::NoShow => write!(f, "no_show"),
        }
    }
}

/// A booked appointment. Client name and service name are denormalized
/// snapshots taken at booking time so history survives later renames or
/// deletions of the referenced records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub client_id: Uuid,
    pub client_first_name: String,
    pub client_last_name: String,
    pub service_id: Uuid,
    pub service_name: String,
    pub status: AppointmentStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    /// Whether this appointment occupies its interval. Cancelled appointments
    /// free their slot immediately.
    pub fn is_blocking(&self) -> bool {
        self.status != AppointmentStatus::Cancelled
    }

    pub fn client_full_name(&self) -> String {
        format!("{} {}", self.client_first_name, self.client_last_name)
    }
}

/// Fields for a not-yet-persisted appointment row.
#[derive(Debug, Clone, Serialize)]
pub struct NewAppointment {
    pub doctor_id: Uuid,
    pub client_id: Uuid,
    pub client_first_name: String,
    pub client_last_name: String,
    pub service_id: Uuid,
    pub service_name: String,
    pub status: AppointmentStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub notes: Option<String>,
}

// ==============================================================================
// REQUEST / RESPONSE SHAPES
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct SlotQuery {
    pub doctor_id: Uuid,
    pub service_id: Uuid,
    pub date: NaiveDate,
}

/// A candidate start time for a given (doctor, service, date). Derived, never
/// persisted; recomputed on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailableSlot {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookAppointmentRequest {
    pub doctor_id: Uuid,
    pub client_id: Uuid,
    pub service_id: Uuid,
    pub date: NaiveDate,
    /// Local start time-of-day, as picked from the generated slots ("09:30").
    pub start_time: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CancelAppointmentRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentSearchQuery {
    pub doctor_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConflictCheckQuery {
    pub doctor_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub exclude_appointment_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConflictCheckResponse {
    pub has_conflict: bool,
    pub conflicting_appointments: Vec<Appointment>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Client not found")]
    ClientNotFound,

    #[error("Service not found")]
    ServiceNotFound,

    #[error("Requested time conflicts with an existing appointment")]
    ConflictDetected,

    #[error("Requested time is outside the doctor's availability")]
    OutsideAvailability,

    #[error("Invalid time: {0}")]
    InvalidTime(String),

    #[error("Invalid status transition from {0}")]
    InvalidStatusTransition(AppointmentStatus),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_appointment(status: AppointmentStatus) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            client_first_name: "Ada".to_string(),
            client_last_name: "Lovelace".to_string(),
            service_id: Uuid::new_v4(),
            service_name: "Consultation".to_string(),
            status,
            start_time: Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2025, 3, 10, 9, 30, 0).unwrap(),
            notes: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn cancelled_appointments_do_not_block() {
        assert!(sample_appointment(AppointmentStatus::Pending).is_blocking());
        assert!(sample_appointment(AppointmentStatus::Confirmed).is_blocking());
        assert!(!sample_appointment(AppointmentStatus::Cancelled).is_blocking());
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&AppointmentStatus::NoShow).unwrap();
        assert_eq!(json, "\"no_show\"");
        assert_eq!(AppointmentStatus::NoShow.to_string(), "no_show");
    }
}
