use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Client, ClientError, CreateClientRequest, UpdateClientRequest};

pub struct ClientService {
    supabase: SupabaseClient,
}

impl ClientService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_client(
        &self,
        request: CreateClientRequest,
        auth_token: &str,
    ) -> Result<Client, ClientError> {
        debug!("Creating client record for: {}", request.email);

        if request.first_name.trim().is_empty() || request.last_name.trim().is_empty() {
            return Err(ClientError::ValidationError(
                "First and last name are required".to_string(),
            ));
        }

        let existing_path = format!("/rest/v1/clients?email=eq.{}", request.email);
        let existing: Vec<Value> = self
            .supabase
            .request(Method::GET, &existing_path, Some(auth_token), None)
            .await
            .map_err(|e| ClientError::DatabaseError(e.to_string()))?;

        if !existing.is_empty() {
            return Err(ClientError::DuplicateEmail(request.email));
        }

        let now = Utc::now();
        let client_data = json!({
            "first_name": request.first_name,
            "last_name": request.last_name,
            "email": request.email,
            "phone_number": request.phone_number,
            "date_of_birth": request.date_of_birth.map(|d| d.format("%Y-%m-%d").to_string()),
            "notes": request.notes,
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
                "/rest/v1/clients",
                Some(auth_token),
                Some(client_data),
                Some(headers),
            )
            .await
            .map_err(|e| ClientError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(ClientError::DatabaseError(
                "Failed to create client record".to_string(),
            ));
        }

        let client: Client = serde_json::from_value(result[0].clone())
            .map_err(|e| ClientError::DatabaseError(format!("Failed to parse client: {}", e)))?;

        debug!("Client record created with ID: {}", client.id);
        Ok(client)
    }

    pub async fn get_client(&self, client_id: Uuid, auth_token: &str) -> Result<Client, ClientError> {
        debug!("Fetching client: {}", client_id);

        let path = format!("/rest/v1/clients?id=eq.{}", client_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ClientError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(ClientError::NotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| ClientError::DatabaseError(format!("Failed to parse client: {}", e)))
    }

    pub async fn search_clients(
        &self,
        search: Option<&str>,
        limit: Option<i32>,
        auth_token: &str,
    ) -> Result<Vec<Client>, ClientError> {
        let mut path = "/rest/v1/clients?order=last_name.asc,first_name.asc".to_string();

        if let Some(term) = search {
            let encoded = urlencoding::encode(term);
            path.push_str(&format!(
                "&or=(first_name.ilike.*{}*,last_name.ilike.*{}*,email.ilike.*{}*)",
                encoded, encoded, encoded
            ));
        }
        if let Some(limit) = limit {
            path.push_str(&format!("&limit={}", limit));
        }

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ClientError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Client>, _>>()
            .map_err(|e| ClientError::DatabaseError(format!("Failed to parse clients: {}", e)))
    }

    pub async fn update_client(
        &self,
        client_id: Uuid,
        request: UpdateClientRequest,
        auth_token: &str,
    ) -> Result<Client, ClientError> {
        debug!("Updating client: {}", client_id);

        let mut update_data = serde_json::Map::new();

        if let Some(first_name) = request.first_name {
            update_data.insert("first_name".to_string(), json!(first_name));
        }
        if let Some(last_name) = request.last_name {
            update_data.insert("last_name".to_string(), json!(last_name));
        }
        if let Some(phone_number) = request.phone_number {
            update_data.insert("phone_number".to_string(), json!(phone_number));
        }
        if let Some(date_of_birth) = request.date_of_birth {
            update_data.insert(
                "date_of_birth".to_string(),
                json!(date_of_birth.format("%Y-%m-%d").to_string()),
            );
        }
        if let Some(notes) = request.notes {
            update_data.insert("notes".to_string(), json!(notes));
        }

        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/clients?id=eq.{}", client_id);
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
            .map_err(|e| ClientError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(ClientError::NotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| ClientError::DatabaseError(format!("Failed to parse client: {}", e)))
    }
}
