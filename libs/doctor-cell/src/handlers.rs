use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    CreateDoctorRequest, CreateServiceRequest, DoctorError, UpdateDoctorRequest,
    UpdateServiceRequest, UpdateWorkingHoursRequest,
};
use crate::services::catalog::ServiceCatalogService;
use crate::services::doctor::DoctorDirectoryService;

fn map_doctor_error(e: DoctorError) -> AppError {
    match e {
        DoctorError::NotFound => AppError::NotFound("Doctor not found".to_string()),
        DoctorError::ServiceNotFound => AppError::NotFound("Service not found".to_string()),
        DoctorError::DuplicateEmail(email) => {
            AppError::Conflict(format!("Doctor with email {} already exists", email))
        }
        DoctorError::ValidationError(msg) => AppError::BadRequest(msg),
        DoctorError::DatabaseError(msg) => AppError::Database(msg),
    }
}

// ==============================================================================
// DOCTOR RECORD HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_doctor(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    if !user.is_admin() {
        return Err(AppError::Auth("Only administrators can create doctors".to_string()));
    }

    let directory = DoctorDirectoryService::new(&state);
    let doctor = directory
        .create_doctor(request, auth.token())
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "success": true,
        "doctor": doctor
    })))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let directory = DoctorDirectoryService::new(&state);
    let doctor = directory
        .get_doctor(doctor_id, auth.token())
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let directory = DoctorDirectoryService::new(&state);
    let doctors = directory
        .list_doctors(auth.token())
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "doctors": doctors,
        "total": doctors.len()
    })))
}

#[axum::debug_handler]
pub async fn update_doctor(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    let is_self = doctor_id.to_string() == user.id;
    if !is_self && !user.is_admin() {
        return Err(AppError::Auth("Not authorized to update this doctor".to_string()));
    }

    let directory = DoctorDirectoryService::new(&state);
    let doctor = directory
        .update_doctor(doctor_id, request, auth.token())
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "success": true,
        "doctor": doctor
    })))
}

// ==============================================================================
// WORKING HOURS HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_working_hours(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let directory = DoctorDirectoryService::new(&state);
    let working_hours = directory
        .get_working_hours(doctor_id, auth.token())
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "working_hours": working_hours
    })))
}

/// Working hours are mutated only by the doctor themselves or an admin.
#[axum::debug_handler]
pub async fn update_working_hours(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateWorkingHoursRequest>,
) -> Result<Json<Value>, AppError> {
    let is_self = doctor_id.to_string() == user.id;
    if !is_self && !user.is_admin() {
        return Err(AppError::Auth(
            "Not authorized to update working hours for this doctor".to_string(),
        ));
    }

    let directory = DoctorDirectoryService::new(&state);
    let doctor = directory
        .update_working_hours(doctor_id, request.working_hours, auth.token())
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "success": true,
        "doctor_id": doctor.id,
        "working_hours": doctor.working_hours
    })))
}

// ==============================================================================
// SERVICE CATALOG HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_service(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateServiceRequest>,
) -> Result<Json<Value>, AppError> {
    let is_self = doctor_id.to_string() == user.id;
    if !is_self && !user.is_admin() {
        return Err(AppError::Auth(
            "Not authorized to manage services for this doctor".to_string(),
        ));
    }

    let catalog = ServiceCatalogService::new(&state);
    let service = catalog
        .create_service(doctor_id, request, auth.token())
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "success": true,
        "service": service
    })))
}

#[axum::debug_handler]
pub async fn list_services(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let catalog = ServiceCatalogService::new(&state);
    let services = catalog
        .services_for_doctor(doctor_id, auth.token())
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "services": services,
        "total": services.len()
    })))
}

#[axum::debug_handler]
pub async fn update_service(
    State(state): State<Arc<AppConfig>>,
    Path(service_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateServiceRequest>,
) -> Result<Json<Value>, AppError> {
    let catalog = ServiceCatalogService::new(&state);

    let service = catalog
        .get_service(service_id, auth.token())
        .await
        .map_err(map_doctor_error)?;

    let is_owner = service.doctor_id.to_string() == user.id;
    if !is_owner && !user.is_admin() {
        return Err(AppError::Auth("Not authorized to update this service".to_string()));
    }

    let updated = catalog
        .update_service(service_id, request, auth.token())
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "success": true,
        "service": updated
    })))
}

#[axum::debug_handler]
pub async fn delete_service(
    State(state): State<Arc<AppConfig>>,
    Path(service_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let catalog = ServiceCatalogService::new(&state);

    let service = catalog
        .get_service(service_id, auth.token())
        .await
        .map_err(map_doctor_error)?;

    let is_owner = service.doctor_id.to_string() == user.id;
    if !is_owner && !user.is_admin() {
        return Err(AppError::Auth("Not authorized to delete this service".to_string()));
    }

    catalog
        .delete_service(service_id, auth.token())
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Service deleted"
    })))
}
