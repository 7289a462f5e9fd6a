use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::convert::format_time_of_day;
use crate::models::{
    Appointment, AppointmentError, AppointmentSearchQuery, BookAppointmentRequest,
    CancelAppointmentRequest, ConflictCheckQuery, SlotQuery,
};
use crate::services::booking::BookingService;

fn map_appointment_error(e: AppointmentError) -> AppError {
    match e {
        AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
        AppointmentError::DoctorNotFound => AppError::NotFound("Doctor not found".to_string()),
        AppointmentError::ClientNotFound => AppError::NotFound("Client not found".to_string()),
        AppointmentError::ServiceNotFound => AppError::NotFound("Service not found".to_string()),
        AppointmentError::ConflictDetected => {
            AppError::Conflict("Requested time conflicts with an existing appointment".to_string())
        }
        AppointmentError::OutsideAvailability => {
            AppError::BadRequest("Requested time is outside the doctor's availability".to_string())
        }
        AppointmentError::InvalidTime(msg) => AppError::BadRequest(msg),
        AppointmentError::InvalidStatusTransition(status) => {
            AppError::Conflict(format!("Appointment is already {}", status))
        }
        AppointmentError::ValidationError(msg) => AppError::BadRequest(msg),
        AppointmentError::DatabaseError(msg) => AppError::Database(msg),
    }
}

fn is_participant(user: &User, appointment: &Appointment) -> bool {
    user.id == appointment.client_id.to_string() || user.id == appointment.doctor_id.to_string()
}

// ==============================================================================
// SLOT COMPUTATION
// ==============================================================================

/// Free start times for a (doctor, service, date) triple. Slots are derived
/// on every call; nothing here is cached.
#[axum::debug_handler]
pub async fn get_available_slots(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<SlotQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let booking = BookingService::new(&state);
    let slots = booking
        .available_slots(query.doctor_id, query.service_id, query.date, auth.token())
        .await
        .map_err(map_appointment_error)?;

    let labels: Vec<String> = slots.iter().map(|s| format_time_of_day(s.start)).collect();

    Ok(Json(json!({
        "doctor_id": query.doctor_id,
        "service_id": query.service_id,
        "date": query.date,
        "slots": labels,
        "total": labels.len()
    })))
}

// ==============================================================================
// BOOKING
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let is_self = request.client_id.to_string() == user.id;
    if !is_self && !user.is_admin() && !user.is_doctor() {
        return Err(AppError::Auth(
            "Not authorized to book for this client".to_string(),
        ));
    }

    let booking = BookingService::new(&state);
    let appointment = booking
        .book_appointment(request, auth.token())
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let booking = BookingService::new(&state);
    let appointment = booking
        .get_appointment(appointment_id, auth.token())
        .await
        .map_err(map_appointment_error)?;

    if !is_participant(&user, &appointment) && !user.is_admin() {
        return Err(AppError::Auth(
            "Not authorized to view this appointment".to_string(),
        ));
    }

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn search_appointments(
    State(state): State<Arc<AppConfig>>,
    Query(mut query): Query<AppointmentSearchQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    // Non-staff callers only ever see their own history.
    if !user.is_admin() && !user.is_doctor() {
        let own_id = Uuid::parse_str(&user.id)
            .map_err(|_| AppError::Auth("Invalid user identity".to_string()))?;
        query.client_id = Some(own_id);
    }

    let booking = BookingService::new(&state);
    let appointments = booking
        .search_appointments(query, auth.token())
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CancelAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let booking = BookingService::new(&state);

    let appointment = booking
        .get_appointment(appointment_id, auth.token())
        .await
        .map_err(map_appointment_error)?;

    if !is_participant(&user, &appointment) && !user.is_admin() {
        return Err(AppError::Auth(
            "Not authorized to cancel this appointment".to_string(),
        ));
    }

    let cancelled = booking
        .cancel_appointment(appointment_id, request, auth.token())
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": cancelled
    })))
}

// ==============================================================================
// CONFLICT PROBE
// ==============================================================================

#[axum::debug_handler]
pub async fn check_conflicts(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<ConflictCheckQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if !user.is_admin() && !user.is_doctor() {
        return Err(AppError::Auth(
            "Only staff can run conflict checks".to_string(),
        ));
    }

    let booking = BookingService::new(&state);
    let response = booking
        .check_conflicts(query, auth.token())
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!(response)))
}
