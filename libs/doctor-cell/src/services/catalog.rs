use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{CreateServiceRequest, DoctorError, Service, UpdateServiceRequest};

/// CRUD over a doctor's bookable services.
pub struct ServiceCatalogService {
    supabase: SupabaseClient,
}

impl ServiceCatalogService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_service(
        &self,
        doctor_id: Uuid,
        request: CreateServiceRequest,
        auth_token: &str,
    ) -> Result<Service, DoctorError> {
        debug!("Creating service '{}' for doctor {}", request.name, doctor_id);

        self.validate_service_shape(
            request.duration_minutes,
            &request.days,
            request.start_time.is_some(),
            request.end_time.is_some(),
        )?;

        let now = Utc::now();
        let service_data = json!({
            "doctor_id": doctor_id,
            "name": request.name,
            "description": request.description,
            "duration_minutes": request.duration_minutes,
            "price": request.price,
            "days": request.days,
            "start_time": request.start_time.map(|t| t.format("%H:%M:%S").to_string()),
            "end_time": request.end_time.map(|t| t.format("%H:%M:%S").to_string()),
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339()
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
                "/rest/v1/services",
                Some(auth_token),
                Some(service_data),
                Some(headers),
            )
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(DoctorError::DatabaseError(
                "Failed to create service".to_string(),
            ));
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse service: {}", e)))
    }

    pub async fn get_service(
        &self,
        service_id: Uuid,
        auth_token: &str,
    ) -> Result<Service, DoctorError> {
        let path = format!("/rest/v1/services?id=eq.{}", service_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(DoctorError::ServiceNotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse service: {}", e)))
    }

    pub async fn services_for_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Service>, DoctorError> {
        debug!("Fetching services for doctor: {}", doctor_id);

        let path = format!("/rest/v1/services?doctor_id=eq.{}&order=name.asc", doctor_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Service>, _>>()
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse services: {}", e)))
    }

    pub async fn update_service(
        &self,
        service_id: Uuid,
        request: UpdateServiceRequest,
        auth_token: &str,
    ) -> Result<Service, DoctorError> {
        debug!("Updating service: {}", service_id);

        if let Some(duration) = request.duration_minutes {
            if duration <= 0 {
                return Err(DoctorError::ValidationError(
                    "Service duration must be positive".to_string(),
                ));
            }
        }
        if let Some(ref days) = request.days {
            self.validate_days(days)?;
        }

        let mut update_data = serde_json::Map::new();

        if let Some(name) = request.name {
            update_data.insert("name".to_string(), json!(name));
        }
        if let Some(description) = request.description {
            update_data.insert("description".to_string(), json!(description));
        }
        if let Some(duration) = request.duration_minutes {
            update_data.insert("duration_minutes".to_string(), json!(duration));
        }
        if let Some(price) = request.price {
            update_data.insert("price".to_string(), json!(price));
        }
        if let Some(days) = request.days {
            update_data.insert("days".to_string(), json!(days));
        }
        if let Some(start_time) = request.start_time {
            update_data.insert(
                "start_time".to_string(),
                json!(start_time.format("%H:%M:%S").to_string()),
            );
        }
        if let Some(end_time) = request.end_time {
            update_data.insert(
                "end_time".to_string(),
                json!(end_time.format("%H:%M:%S").to_string()),
            );
        }

        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/services?id=eq.{}", service_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(Value::Object(update_data)),
                Some(headers),
            )
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(DoctorError::ServiceNotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse service: {}", e)))
    }

    /// Appointments keep a denormalized `service_name` snapshot, so history
    /// survives a service being deleted here.
    pub async fn delete_service(
        &self,
        service_id: Uuid,
        auth_token: &str,
    ) -> Result<(), DoctorError> {
        debug!("Deleting service: {}", service_id);

        let path = format!("/rest/v1/services?id=eq.{}", service_id);
        let _: Vec<Value> = self
            .supabase
            .request(Method::DELETE, &path, Some(auth_token), None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    fn validate_service_shape(
        &self,
        duration_minutes: i64,
        days: &[u8],
        has_start: bool,
        has_end: bool,
    ) -> Result<(), DoctorError> {
        if duration_minutes <= 0 {
            return Err(DoctorError::ValidationError(
                "Service duration must be positive".to_string(),
            ));
        }
        if has_start != has_end {
            return Err(DoctorError::ValidationError(
                "Service hour override requires both start and end times".to_string(),
            ));
        }
        self.validate_days(days)
    }

    fn validate_days(&self, days: &[u8]) -> Result<(), DoctorError> {
        if days.iter().any(|d| *d > 6) {
            return Err(DoctorError::ValidationError(
                "Service days must be between 0 (Sunday) and 6 (Saturday)".to_string(),
            ));
        }
        Ok(())
    }
}
