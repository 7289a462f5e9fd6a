use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn doctor_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/", post(handlers::create_doctor))
        .route("/", get(handlers::list_doctors))
        .route("/{doctor_id}", get(handlers::get_doctor))
        .route("/{doctor_id}", put(handlers::update_doctor))
        .route("/{doctor_id}/working-hours", get(handlers::get_working_hours))
        .route("/{doctor_id}/working-hours", put(handlers::update_working_hours))
        // Service catalog
        .route("/{doctor_id}/services", post(handlers::create_service))
        .route("/{doctor_id}/services", get(handlers::list_services))
        .route("/services/{service_id}", put(handlers::update_service))
        .route("/services/{service_id}", delete(handlers::delete_service))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new().merge(protected_routes).with_state(state)
}
