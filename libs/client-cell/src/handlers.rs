use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{ClientError, CreateClientRequest, UpdateClientRequest};
use crate::services::client::ClientService;

#[derive(Debug, Deserialize)]
pub struct ClientSearchParams {
    pub search: Option<String>,
    pub limit: Option<i32>,
}

fn map_client_error(e: ClientError) -> AppError {
    match e {
        ClientError::NotFound => AppError::NotFound("Client not found".to_string()),
        ClientError::DuplicateEmail(email) => {
            AppError::Conflict(format!("Client with email {} already exists", email))
        }
        ClientError::ValidationError(msg) => AppError::BadRequest(msg),
        ClientError::DatabaseError(msg) => AppError::Database(msg),
    }
}

/// Staff-only: clients are registered by doctors or administrators.
#[axum::debug_handler]
pub async fn create_client(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateClientRequest>,
) -> Result<Json<Value>, AppError> {
    if !user.is_admin() && !user.is_doctor() {
        return Err(AppError::Auth("Not authorized to create client records".to_string()));
    }

    let service = ClientService::new(&state);
    let client = service
        .create_client(request, auth.token())
        .await
        .map_err(map_client_error)?;

    Ok(Json(json!({
        "success": true,
        "client": client
    })))
}

#[axum::debug_handler]
pub async fn get_client(
    State(state): State<Arc<AppConfig>>,
    Path(client_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let is_self = client_id.to_string() == user.id;
    if !is_self && !user.is_admin() && !user.is_doctor() {
        return Err(AppError::Auth("Not authorized to view this client".to_string()));
    }

    let service = ClientService::new(&state);
    let client = service
        .get_client(client_id, auth.token())
        .await
        .map_err(map_client_error)?;

    Ok(Json(json!(client)))
}

#[axum::debug_handler]
pub async fn search_clients(
    State(state): State<Arc<AppConfig>>,
    Query(params): Query<ClientSearchParams>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if !user.is_admin() && !user.is_doctor() {
        return Err(AppError::Auth("Not authorized to search client records".to_string()));
    }

    let service = ClientService::new(&state);
    let clients = service
        .search_clients(params.search.as_deref(), params.limit, auth.token())
        .await
        .map_err(map_client_error)?;

    Ok(Json(json!({
        "clients": clients,
        "total": clients.len()
    })))
}

#[axum::debug_handler]
pub async fn update_client(
    State(state): State<Arc<AppConfig>>,
    Path(client_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateClientRequest>,
) -> Result<Json<Value>, AppError> {
    let is_self = client_id.to_string() == user.id;
    if !is_self && !user.is_admin() && !user.is_doctor() {
        return Err(AppError::Auth("Not authorized to update this client".to_string()));
    }

    let service = ClientService::new(&state);
    let client = service
        .update_client(client_id, request, auth.token())
        .await
        .map_err(map_client_error)?;

    Ok(Json(json!({
        "success": true,
        "client": client
    })))
}
