use std::sync::Arc;

use axum::{routing::get, Router};

use appointment_cell::router::appointment_routes;
use client_cell::router::client_routes;
use doctor_cell::router::doctor_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Practice portal API is running!" }))
        .nest("/doctors", doctor_routes(state.clone()))
        .nest("/clients", client_routes(state.clone()))
        .nest("/appointments", appointment_routes(state))
}
