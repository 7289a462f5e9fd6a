use chrono::{NaiveDate, NaiveTime};
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use client_cell::models::Client;
use client_cell::services::client::ClientService;
use doctor_cell::models::Service;
use doctor_cell::services::catalog::ServiceCatalogService;
use doctor_cell::services::doctor::DoctorDirectoryService;
use notification_cell::models::{NewNotification, NotificationStatus};
use notification_cell::services::dispatch::{
    NotificationDispatcher, SupabaseNotificationDispatcher,
};
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::convert::{format_time_of_day, parse_time_of_day, to_storage};
use crate::models::{
    Appointment, AppointmentError, AppointmentSearchQuery, AppointmentStatus, AvailableSlot,
    BookAppointmentRequest, CancelAppointmentRequest, ConflictCheckQuery, ConflictCheckResponse,
    NewAppointment,
};
use crate::services::conflict;
use crate::services::hours::resolve_window;
use crate::services::slots::generate_slots;
use crate::services::store::{AppointmentStore, SupabaseAppointmentStore};

// ==============================================================================
// STEP-BASED BOOKING FLOW
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingStep {
    SelectingService,
    SelectingDateTime,
    Reviewing,
    Confirmed,
}

/// One client's walk through the booking screens. Each flow instance owns its
/// own selection state; steps advance strictly one at a time, forward via
/// `next` and backward via `back`, and `Confirmed` is reached only through
/// `complete` after the appointment write has succeeded.
#[derive(Debug, Clone)]
pub struct BookingFlow {
    step: BookingStep,
    selected_service: Option<Service>,
    selected_date: Option<NaiveDate>,
    selected_time: Option<NaiveTime>,
    /// Appointments fetched for the currently selected date, keyed by that
    /// date so a late response for a superseded selection is discarded.
    day_appointments: Option<(NaiveDate, Vec<Appointment>)>,
}

impl Default for BookingFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl BookingFlow {
    pub fn new() -> Self {
        Self {
            step: BookingStep::SelectingService,
            selected_service: None,
            selected_date: None,
            selected_time: None,
            day_appointments: None,
        }
    }

    pub fn step(&self) -> BookingStep {
        self.step
    }

    pub fn selected_service(&self) -> Option<&Service> {
        self.selected_service.as_ref()
    }

    pub fn selected_date(&self) -> Option<NaiveDate> {
        self.selected_date
    }

    pub fn selected_time(&self) -> Option<NaiveTime> {
        self.selected_time
    }

    pub fn select_service(&mut self, service: Service) -> Result<(), AppointmentError> {
        if self.step != BookingStep::SelectingService {
            return Err(AppointmentError::ValidationError(
                "Service can only be chosen in the service step".to_string(),
            ));
        }
        self.selected_service = Some(service);
        Ok(())
    }

    /// Changing the date invalidates the chosen time and any appointments
    /// fetched for the previous date.
    pub fn select_date(&mut self, date: NaiveDate) -> Result<(), AppointmentError> {
        if self.step != BookingStep::SelectingDateTime {
            return Err(AppointmentError::ValidationError(
                "Date can only be chosen in the date/time step".to_string(),
            ));
        }
        if self.selected_date != Some(date) {
            self.selected_time = None;
            self.day_appointments = None;
        }
        self.selected_date = Some(date);
        Ok(())
    }

    pub fn select_time(&mut self, time: NaiveTime) -> Result<(), AppointmentError> {
        if self.step != BookingStep::SelectingDateTime {
            return Err(AppointmentError::ValidationError(
                "Time can only be chosen in the date/time step".to_string(),
            ));
        }
        if self.selected_date.is_none() {
            return Err(AppointmentError::ValidationError(
                "Pick a date before picking a time".to_string(),
            ));
        }
        self.selected_time = Some(time);
        Ok(())
    }

    /// Record the result of a day-scoped appointment fetch. A response for a
    /// date other than the current selection is stale and dropped.
    pub fn apply_fetched_appointments(&mut self, date: NaiveDate, appointments: Vec<Appointment>) {
        if self.selected_date == Some(date) {
            self.day_appointments = Some((date, appointments));
        } else {
            debug!("Discarding stale appointment fetch for {}", date);
        }
    }

    pub fn appointments_for_selected_date(&self) -> Option<&[Appointment]> {
        match (&self.day_appointments, self.selected_date) {
            (Some((date, appointments)), Some(selected)) if *date == selected => {
                Some(appointments.as_slice())
            }
            _ => None,
        }
    }

    /// The free slots for the current selection, or `None` until both the
    /// service and the day's appointments are in hand. A closed day is
    /// `Some` with an empty list.
    pub fn available_slots(
        &self,
        working_hours: &doctor_cell::models::WorkingHours,
    ) -> Option<Vec<AvailableSlot>> {
        let service = self.selected_service.as_ref()?;
        let date = self.selected_date?;
        let appointments = self.appointments_for_selected_date()?;

        let slots = match resolve_window(date, Some(service), working_hours) {
            Some((start, end)) => {
                generate_slots(date, service.duration_minutes, start, end, appointments)
            }
            None => Vec::new(),
        };
        Some(slots)
    }

    pub fn can_confirm(&self) -> bool {
        self.step == BookingStep::Reviewing
            && self.selected_service.is_some()
            && self.selected_date.is_some()
            && self.selected_time.is_some()
    }

    pub fn next(&mut self) -> Result<BookingStep, AppointmentError> {
        let next = match self.step {
            BookingStep::SelectingService => {
                if self.selected_service.is_none() {
                    return Err(AppointmentError::ValidationError(
                        "Choose a service before continuing".to_string(),
                    ));
                }
                BookingStep::SelectingDateTime
            }
            BookingStep::SelectingDateTime => {
                if self.selected_date.is_none() || self.selected_time.is_none() {
                    return Err(AppointmentError::ValidationError(
                        "Choose a date and time before continuing".to_string(),
                    ));
                }
                BookingStep::Reviewing
            }
            BookingStep::Reviewing => {
                return Err(AppointmentError::ValidationError(
                    "Confirmation happens through booking, not a step change".to_string(),
                ));
            }
            BookingStep::Confirmed => {
                return Err(AppointmentError::ValidationError(
                    "Booking flow is already complete".to_string(),
                ));
            }
        };
        self.step = next;
        Ok(next)
    }

    pub fn back(&mut self) -> Result<BookingStep, AppointmentError> {
        let previous = match self.step {
            BookingStep::SelectingService => {
                return Err(AppointmentError::ValidationError(
                    "Already at the first step".to_string(),
                ));
            }
            BookingStep::SelectingDateTime => BookingStep::SelectingService,
            BookingStep::Reviewing => BookingStep::SelectingDateTime,
            BookingStep::Confirmed => {
                return Err(AppointmentError::ValidationError(
                    "A confirmed booking cannot be reopened".to_string(),
                ));
            }
        };
        self.step = previous;
        Ok(previous)
    }

    /// Mark the flow confirmed. Call only after the appointment write has
    /// succeeded.
    pub fn complete(&mut self) -> Result<(), AppointmentError> {
        if !self.can_confirm() {
            return Err(AppointmentError::ValidationError(
                "Booking flow is not ready to confirm".to_string(),
            ));
        }
        self.step = BookingStep::Confirmed;
        Ok(())
    }
}

// ==============================================================================
// BOOKING SERVICE
// ==============================================================================

/// Orchestrates slot computation and the reservation write. The store and
/// notification dispatcher sit behind traits so tests can swap them out.
pub struct BookingService {
    supabase: SupabaseClient,
    directory: DoctorDirectoryService,
    catalog: ServiceCatalogService,
    clients: ClientService,
    store: Arc<dyn AppointmentStore>,
    dispatcher: Arc<dyn NotificationDispatcher>,
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_collaborators(
            config,
            Arc::new(SupabaseAppointmentStore::new(config)),
            Arc::new(SupabaseNotificationDispatcher::new(config)),
        )
    }

    pub fn with_collaborators(
        config: &AppConfig,
        store: Arc<dyn AppointmentStore>,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            directory: DoctorDirectoryService::new(config),
            catalog: ServiceCatalogService::new(config),
            clients: ClientService::new(config),
            store,
            dispatcher,
        }
    }

    /// Compute the free slots for a (doctor, service, date) triple.
    pub async fn available_slots(
        &self,
        doctor_id: Uuid,
        service_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<AvailableSlot>, AppointmentError> {
        debug!(
            "Computing slots for doctor {} service {} on {}",
            doctor_id, service_id, date
        );

        let doctor = self
            .directory
            .get_doctor(doctor_id, auth_token)
            .await
            .map_err(map_doctor_error)?;
        let service = self.fetch_service_for_doctor(service_id, doctor_id, auth_token).await?;

        let window = match resolve_window(date, Some(&service), &doctor.working_hours) {
            Some(window) => window,
            None => return Ok(Vec::new()),
        };

        let existing = self
            .store
            .fetch_by_doctor_and_date(doctor_id, date, auth_token)
            .await?;

        Ok(generate_slots(
            date,
            service.duration_minutes,
            window.0,
            window.1,
            &existing,
        ))
    }

    /// Reserve a slot. The server enforces window containment and
    /// conflict-freedom; duration alignment within the window is the
    /// caller's job. The conflict set is re-fetched immediately before the
    /// create so a slot taken since the UI rendered is rejected rather than
    /// double-booked.
    pub async fn book_appointment(
        &self,
        request: BookAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        info!(
            "Booking appointment for client {} with doctor {} on {} at {}",
            request.client_id, request.doctor_id, request.date, request.start_time
        );

        let start_time = parse_time_of_day(&request.start_time)?;

        let doctor = self
            .directory
            .get_doctor(request.doctor_id, auth_token)
            .await
            .map_err(map_doctor_error)?;
        let service = self
            .fetch_service_for_doctor(request.service_id, request.doctor_id, auth_token)
            .await?;
        let client = self.fetch_client(request.client_id, auth_token).await?;

        let (window_start, window_end) =
            resolve_window(request.date, Some(&service), &doctor.working_hours)
                .ok_or(AppointmentError::OutsideAvailability)?;

        let end_time = start_time
            .overflowing_add_signed(chrono::Duration::minutes(service.duration_minutes));
        let end_time = match end_time {
            (end, 0) => end,
            _ => return Err(AppointmentError::OutsideAvailability),
        };

        if start_time < window_start || end_time > window_end || end_time <= start_time {
            return Err(AppointmentError::OutsideAvailability);
        }

        let start = to_storage(request.date, start_time);
        let end = to_storage(request.date, end_time);

        // Server-side recheck against the freshest day of appointments. Still
        // read-then-write rather than transactional, but it closes the window
        // between slot display and confirmation.
        let existing = self
            .store
            .fetch_by_doctor_and_date(request.doctor_id, request.date, auth_token)
            .await?;
        if conflict::conflicts(start, end, &existing) {
            warn!(
                "Slot {} on {} for doctor {} was taken before confirmation",
                request.start_time, request.date, request.doctor_id
            );
            return Err(AppointmentError::ConflictDetected);
        }

        let appointment = self
            .store
            .create(
                NewAppointment {
                    doctor_id: request.doctor_id,
                    client_id: request.client_id,
                    client_first_name: client.first_name.clone(),
                    client_last_name: client.last_name.clone(),
                    service_id: service.id,
                    service_name: service.name.clone(),
                    status: AppointmentStatus::Pending,
                    start_time: start,
                    end_time: end,
                    notes: request.notes,
                },
                auth_token,
            )
            .await?;

        info!("Appointment {} booked", appointment.id);

        // Post-commit hooks. Each dispatch is independently fallible and only
        // logged; the appointment is already committed.
        self.notify_booked(&appointment, &client, &doctor.full_name(), auth_token)
            .await;

        Ok(appointment)
    }

    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(AppointmentError::NotFound);
        }

        serde_json::from_value(result[0].clone()).map_err(|e| {
            AppointmentError::DatabaseError(format!("Failed to parse appointment: {}", e))
        })
    }

    pub async fn search_appointments(
        &self,
        query: AppointmentSearchQuery,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        debug!("Searching appointments with filters: {:?}", query);

        let mut query_parts = Vec::new();

        if let Some(doctor_id) = query.doctor_id {
            query_parts.push(format!("doctor_id=eq.{}", doctor_id));
        }
        if let Some(client_id) = query.client_id {
            query_parts.push(format!("client_id=eq.{}", client_id));
        }
        if let Some(status) = query.status {
            query_parts.push(format!("status=eq.{}", status));
        }
        if let Some(from_date) = query.from_date {
            let date_str = from_date.to_rfc3339();
            query_parts.push(format!("start_time=gte.{}", urlencoding::encode(&date_str)));
        }
        if let Some(to_date) = query.to_date {
            let date_str = to_date.to_rfc3339();
            query_parts.push(format!("start_time=lte.{}", urlencoding::encode(&date_str)));
        }

        let mut path = format!(
            "/rest/v1/appointments?{}&order=start_time.desc",
            query_parts.join("&")
        );
        if let Some(limit) = query.limit {
            path.push_str(&format!("&limit={}", limit));
        }
        if let Some(offset) = query.offset {
            path.push_str(&format!("&offset={}", offset));
        }

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

    /// Cancel an appointment. The freed interval becomes bookable as soon as
    /// the status flips; no tombstone period.
    pub async fn cancel_appointment(
        &self,
        appointment_id: Uuid,
        request: CancelAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Cancelling appointment: {}", appointment_id);

        let current = self.get_appointment(appointment_id, auth_token).await?;
        match current.status {
            AppointmentStatus::Cancelled | AppointmentStatus::Completed => {
                return Err(AppointmentError::InvalidStatusTransition(current.status));
            }
            _ => {}
        }

        let note = request.reason.map(|reason| match &current.notes {
            Some(existing) => format!("{}\nCancelled: {}", existing, reason),
            None => format!("Cancelled: {}", reason),
        });

        let update_data = {
            let mut map = serde_json::Map::new();
            map.insert(
                "status".to_string(),
                serde_json::json!(AppointmentStatus::Cancelled),
            );
            if let Some(note) = note {
                map.insert("notes".to_string(), serde_json::json!(note));
            }
            Value::Object(map)
        };

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
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
                Some(update_data),
                Some(headers),
            )
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(AppointmentError::NotFound);
        }

        let cancelled: Appointment = serde_json::from_value(result[0].clone()).map_err(|e| {
            AppointmentError::DatabaseError(format!("Failed to parse appointment: {}", e))
        })?;

        info!("Appointment {} cancelled", appointment_id);
        self.notify_cancelled(&cancelled, auth_token).await;

        Ok(cancelled)
    }

    /// Standalone conflict probe for a doctor and interval.
    pub async fn check_conflicts(
        &self,
        query: ConflictCheckQuery,
        auth_token: &str,
    ) -> Result<ConflictCheckResponse, AppointmentError> {
        if query.start_time >= query.end_time {
            return Err(AppointmentError::InvalidTime(
                "start_time must be before end_time".to_string(),
            ));
        }

        // The probe accepts arbitrary instants, so an interval can touch more
        // than one calendar day even though booked appointments never do.
        let mut existing = Vec::new();
        let mut day = query.start_time.date_naive();
        let last = query.end_time.date_naive();
        loop {
            existing.extend(
                self.store
                    .fetch_by_doctor_and_date(query.doctor_id, day, auth_token)
                    .await?,
            );
            if day >= last {
                break;
            }
            day = day.succ_opt().ok_or_else(|| {
                AppointmentError::InvalidTime(format!("Date out of range: {}", day))
            })?;
        }

        let conflicting = conflict::conflicting_appointments(
            query.start_time,
            query.end_time,
            &existing,
            query.exclude_appointment_id,
        );

        Ok(ConflictCheckResponse {
            has_conflict: !conflicting.is_empty(),
            conflicting_appointments: conflicting,
        })
    }

    // ==========================================================================
    // PRIVATE HELPERS
    // ==========================================================================

    async fn fetch_service_for_doctor(
        &self,
        service_id: Uuid,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Service, AppointmentError> {
        let service = self
            .catalog
            .get_service(service_id, auth_token)
            .await
            .map_err(map_doctor_error)?;

        if service.doctor_id != doctor_id {
            return Err(AppointmentError::ServiceNotFound);
        }
        Ok(service)
    }

    async fn fetch_client(
        &self,
        client_id: Uuid,
        auth_token: &str,
    ) -> Result<Client, AppointmentError> {
        self.clients
            .get_client(client_id, auth_token)
            .await
            .map_err(|e| match e {
                client_cell::models::ClientError::NotFound => AppointmentError::ClientNotFound,
                other => AppointmentError::DatabaseError(other.to_string()),
            })
    }

    async fn notify_booked(
        &self,
        appointment: &Appointment,
        client: &Client,
        doctor_name: &str,
        auth_token: &str,
    ) {
        let (date, time) = crate::convert::from_storage(appointment.start_time);
        let when = format!("{} at {}", date, format_time_of_day(time));

        let to_client = NewNotification {
            recipient_id: appointment.client_id,
            title: "Appointment booked".to_string(),
            message: format!(
                "Your {} with {} is booked for {}.",
                appointment.service_name, doctor_name, when
            ),
            status: NotificationStatus::Success,
            link: Some(format!("/appointments/{}", appointment.id)),
        };
        let to_doctor = NewNotification {
            recipient_id: appointment.doctor_id,
            title: "New appointment".to_string(),
            message: format!(
                "{} booked {} for {}.",
                client.full_name(),
                appointment.service_name,
                when
            ),
            status: NotificationStatus::Info,
            link: Some(format!("/appointments/{}", appointment.id)),
        };

        for notification in [to_client, to_doctor] {
            let recipient = notification.recipient_id;
            if let Err(e) = self.dispatcher.send(notification, auth_token).await {
                warn!(
                    "Failed to notify {} about appointment {}: {}",
                    recipient, appointment.id, e
                );
            }
        }
    }

    async fn notify_cancelled(&self, appointment: &Appointment, auth_token: &str) {
        let (date, time) = crate::convert::from_storage(appointment.start_time);
        let when = format!("{} at {}", date, format_time_of_day(time));

        for recipient in [appointment.client_id, appointment.doctor_id] {
            let notification = NewNotification {
                recipient_id: recipient,
                title: "Appointment cancelled".to_string(),
                message: format!(
                    "The {} appointment on {} was cancelled.",
                    appointment.service_name, when
                ),
                status: NotificationStatus::Warning,
                link: Some(format!("/appointments/{}", appointment.id)),
            };
            if let Err(e) = self.dispatcher.send(notification, auth_token).await {
                warn!(
                    "Failed to notify {} about cancellation of {}: {}",
                    recipient, appointment.id, e
                );
            }
        }
    }
}

fn map_doctor_error(e: doctor_cell::models::DoctorError) -> AppointmentError {
    use doctor_cell::models::DoctorError;
    match e {
        DoctorError::NotFound => AppointmentError::DoctorNotFound,
        DoctorError::ServiceNotFound => AppointmentError::ServiceNotFound,
        DoctorError::ValidationError(msg) => AppointmentError::ValidationError(msg),
        other => AppointmentError::DatabaseError(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn service() -> Service {
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

    fn appointment_on(date: NaiveDate, h: u32, m: u32) -> Appointment {
        let start = date.and_time(t(h, m)).and_utc();
        Appointment {
            id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            client_first_name: "Mary".to_string(),
            client_last_name: "Shelley".to_string(),
            service_id: Uuid::new_v4(),
            service_name: "Consultation".to_string(),
            status: AppointmentStatus::Confirmed,
            start_time: start,
            end_time: start + chrono::Duration::minutes(30),
            notes: None,
            created_at: Utc::now(),
        }
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    #[test]
    fn flow_starts_at_service_selection() {
        let flow = BookingFlow::new();
        assert_eq!(flow.step(), BookingStep::SelectingService);
        assert!(!flow.can_confirm());
    }

    #[test]
    fn next_requires_a_selection_at_each_step() {
        let mut flow = BookingFlow::new();
        assert_matches!(flow.next(), Err(AppointmentError::ValidationError(_)));

        flow.select_service(service()).unwrap();
        assert_eq!(flow.next().unwrap(), BookingStep::SelectingDateTime);

        assert_matches!(flow.next(), Err(AppointmentError::ValidationError(_)));
        flow.select_date(monday()).unwrap();
        assert_matches!(flow.next(), Err(AppointmentError::ValidationError(_)));
        flow.select_time(t(9, 30)).unwrap();
        assert_eq!(flow.next().unwrap(), BookingStep::Reviewing);
        assert!(flow.can_confirm());
    }

    #[test]
    fn back_walks_one_step_and_stops_at_the_start() {
        let mut flow = BookingFlow::new();
        assert_matches!(flow.back(), Err(AppointmentError::ValidationError(_)));

        flow.select_service(service()).unwrap();
        flow.next().unwrap();
        assert_eq!(flow.back().unwrap(), BookingStep::SelectingService);
        // The earlier selection survives going back.
        assert!(flow.selected_service().is_some());
    }

    #[test]
    fn selections_are_rejected_outside_their_step() {
        let mut flow = BookingFlow::new();
        assert_matches!(flow.select_date(monday()), Err(AppointmentError::ValidationError(_)));
        assert_matches!(flow.select_time(t(9, 0)), Err(AppointmentError::ValidationError(_)));

        flow.select_service(service()).unwrap();
        flow.next().unwrap();
        assert_matches!(
            flow.select_service(service()),
            Err(AppointmentError::ValidationError(_))
        );
    }

    #[test]
    fn changing_date_clears_time_and_fetched_appointments() {
        let mut flow = BookingFlow::new();
        flow.select_service(service()).unwrap();
        flow.next().unwrap();

        flow.select_date(monday()).unwrap();
        flow.select_time(t(9, 30)).unwrap();
        flow.apply_fetched_appointments(monday(), vec![appointment_on(monday(), 10, 0)]);
        assert!(flow.appointments_for_selected_date().is_some());

        let tuesday = monday().succ_opt().unwrap();
        flow.select_date(tuesday).unwrap();
        assert_eq!(flow.selected_time(), None);
        assert!(flow.appointments_for_selected_date().is_none());
    }

    #[test]
    fn stale_fetch_for_superseded_date_is_discarded() {
        let mut flow = BookingFlow::new();
        flow.select_service(service()).unwrap();
        flow.next().unwrap();

        let tuesday = monday().succ_opt().unwrap();
        flow.select_date(tuesday).unwrap();

        // A late response for Monday must not land on Tuesday's selection.
        flow.apply_fetched_appointments(monday(), vec![appointment_on(monday(), 10, 0)]);
        assert!(flow.appointments_for_selected_date().is_none());

        flow.apply_fetched_appointments(tuesday, vec![]);
        assert_eq!(flow.appointments_for_selected_date().unwrap().len(), 0);
    }

    #[test]
    fn flow_slots_reflect_the_fetched_day() {
        let mut hours = doctor_cell::models::WorkingHours::default();
        hours.set(
            chrono::Weekday::Mon,
            doctor_cell::models::DaySchedule::Open { start: t(9, 0), end: t(12, 0) },
        );

        let mut flow = BookingFlow::new();
        flow.select_service(service()).unwrap();
        flow.next().unwrap();
        flow.select_date(monday()).unwrap();

        // No fetch applied yet: slots are not computable.
        assert!(flow.available_slots(&hours).is_none());

        flow.apply_fetched_appointments(monday(), vec![appointment_on(monday(), 10, 0)]);
        let slots = flow.available_slots(&hours).unwrap();
        let starts: Vec<NaiveTime> = slots.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![t(9, 0), t(9, 30), t(10, 30), t(11, 0), t(11, 30)]);
    }

    #[test]
    fn complete_requires_review_state_and_is_terminal() {
        let mut flow = BookingFlow::new();
        assert_matches!(flow.complete(), Err(AppointmentError::ValidationError(_)));

        flow.select_service(service()).unwrap();
        flow.next().unwrap();
        flow.select_date(monday()).unwrap();
        flow.select_time(t(9, 0)).unwrap();
        flow.next().unwrap();

        flow.complete().unwrap();
        assert_eq!(flow.step(), BookingStep::Confirmed);
        assert_matches!(flow.next(), Err(AppointmentError::ValidationError(_)));
        assert_matches!(flow.back(), Err(AppointmentError::ValidationError(_)));
    }

    #[test]
    fn flow_yields_empty_slots_on_a_closed_day() {
        let hours = doctor_cell::models::WorkingHours::default();

        let mut flow = BookingFlow::new();
        flow.select_service(service()).unwrap();
        flow.next().unwrap();
        flow.select_date(monday()).unwrap();
        flow.apply_fetched_appointments(monday(), vec![]);

        let slots = flow.available_slots(&hours).unwrap();
        assert!(slots.is_empty());
    }

    struct FixedDayStore {
        doctor_id: Uuid,
        by_date: std::collections::HashMap<NaiveDate, Vec<Appointment>>,
    }

    #[async_trait::async_trait]
    impl AppointmentStore for FixedDayStore {
        async fn fetch_by_doctor_and_date(
            &self,
            doctor_id: Uuid,
            date: NaiveDate,
            _auth_token: &str,
        ) -> Result<Vec<Appointment>, AppointmentError> {
            if doctor_id != self.doctor_id {
                return Ok(Vec::new());
            }
            Ok(self.by_date.get(&date).cloned().unwrap_or_default())
        }

        async fn create(
            &self,
            _appointment: NewAppointment,
            _auth_token: &str,
        ) -> Result<Appointment, AppointmentError> {
            Err(AppointmentError::DatabaseError(
                "create not supported by this store".to_string(),
            ))
        }
    }

    struct DroppingDispatcher;

    #[async_trait::async_trait]
    impl NotificationDispatcher for DroppingDispatcher {
        async fn send(
            &self,
            _notification: notification_cell::models::NewNotification,
            _auth_token: &str,
        ) -> Result<
            notification_cell::models::Notification,
            notification_cell::models::NotificationError,
        > {
            Err(notification_cell::models::NotificationError::DatabaseError(
                "dropped".to_string(),
            ))
        }
    }

    fn offline_config() -> AppConfig {
        AppConfig {
            supabase_url: "http://localhost:0".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            supabase_jwt_secret: "test-secret".to_string(),
        }
    }

    #[tokio::test]
    async fn conflict_probe_spanning_midnight_sees_next_day_rows() {
        let doctor_id = Uuid::new_v4();
        let tuesday = monday().succ_opt().unwrap();

        // The overlapping row starts at 00:00 on Tuesday; a fetch keyed only
        // to the probe's start date would never see it.
        let mut by_date = std::collections::HashMap::new();
        by_date.insert(monday(), vec![]);
        by_date.insert(tuesday, vec![appointment_on(tuesday, 0, 0)]);

        let service = BookingService::with_collaborators(
            &offline_config(),
            Arc::new(FixedDayStore { doctor_id, by_date }),
            Arc::new(DroppingDispatcher),
        );

        let response = service
            .check_conflicts(
                ConflictCheckQuery {
                    doctor_id,
                    start_time: monday().and_time(t(23, 30)).and_utc(),
                    end_time: tuesday.and_time(t(0, 30)).and_utc(),
                    exclude_appointment_id: None,
                },
                "test-token",
            )
            .await
            .unwrap();

        assert!(response.has_conflict);
        assert_eq!(response.conflicting_appointments.len(), 1);
    }

    #[tokio::test]
    async fn conflict_probe_within_one_day_fetches_only_that_day() {
        let doctor_id = Uuid::new_v4();

        let mut by_date = std::collections::HashMap::new();
        by_date.insert(monday(), vec![appointment_on(monday(), 10, 0)]);

        let service = BookingService::with_collaborators(
            &offline_config(),
            Arc::new(FixedDayStore { doctor_id, by_date }),
            Arc::new(DroppingDispatcher),
        );

        let response = service
            .check_conflicts(
                ConflictCheckQuery {
                    doctor_id,
                    start_time: monday().and_time(t(10, 15)).and_utc(),
                    end_time: monday().and_time(t(10, 45)).and_utc(),
                    exclude_appointment_id: None,
                },
                "test-token",
            )
            .await
            .unwrap();

        assert!(response.has_conflict);
    }

    #[test]
    fn timestamps_of_utc_appointments_roundtrip_through_flow_fixtures() {
        let appt = appointment_on(monday(), 10, 0);
        assert_eq!(
            appt.start_time,
            Utc.with_ymd_and_hms(2025, 3, 10, 10, 0, 0).unwrap()
        );
        assert_eq!(appt.end_time - appt.start_time, chrono::Duration::minutes(30));
    }
}
