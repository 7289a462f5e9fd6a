use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Appointment, AppointmentError, NewAppointment};

/// Persistence seam for appointment records. The booking workflow only ever
/// needs a single doctor-day of history plus a create, so the trait stays
/// deliberately narrow.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// All appointments for the doctor starting on the given calendar day,
    /// cancelled ones included. Booked intervals never cross midnight, so a
    /// day's rows are exactly the rows whose `start_time` falls on it;
    /// callers probing a multi-day interval fetch each day it touches.
    async fn fetch_by_doctor_and_date(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError>;

    async fn create(
        &self,
        appointment: NewAppointment,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError>;
}

pub struct SupabaseAppointmentStore {
    supabase: SupabaseClient,
}

impl SupabaseAppointmentStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn fetch_by_doctor_and_date(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        debug!("Fetching appointments for doctor {} on {}", doctor_id, date);

        let day_start = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| AppointmentError::InvalidTime(format!("Invalid date: {}", date)))?
            .and_utc();
        let day_end = day_start + Duration::days(1);

        let start_str = day_start.to_rfc3339();
        let end_str = day_end.to_rfc3339();
        let start_param = urlencoding::encode(&start_str);
        let end_param = urlencoding::encode(&end_str);

        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&start_time=gte.{}&start_time=lt.{}&order=start_time.asc",
            doctor_id, start_param, end_param
        );

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Appointment>, _>>()
            .map_err(|e| {
                AppointmentError::DatabaseError(format!("Failed to parse appointments: {}", e))
            })
    }

    async fn create(
        &self,
        appointment: NewAppointment,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!(
            "Creating appointment for doctor {} at {}",
            appointment.doctor_id, appointment.start_time
        );

        let appointment_data = json!({
            "doctor_id": appointment.doctor_id,
            "client_id": appointment.client_id,
            "client_first_name": appointment.client_first_name,
            "client_last_name": appointment.client_last_name,
            "service_id": appointment.service_id,
            "service_name": appointment.service_name,
            "status": appointment.status,
            "start_time": appointment.start_time.to_rfc3339(),
            "end_time": appointment.end_time.to_rfc3339(),
            "notes": appointment.notes,
            "created_at": Utc::now().to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(auth_token),
                Some(appointment_data),
                Some(headers),
            )
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let row = result.into_iter().next().ok_or_else(|| {
            AppointmentError::DatabaseError("Appointment insert returned no row".to_string())
        })?;

        serde_json::from_value(row).map_err(|e| {
            AppointmentError::DatabaseError(format!("Failed to parse created appointment: {}", e))
        })
    }
}
