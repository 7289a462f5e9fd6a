use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{NewNotification, Notification, NotificationError};

/// Delivery seam for post-booking notifications. Implementations must be
/// safe to call after the appointment row is already committed.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn send(
        &self,
        notification: NewNotification,
        auth_token: &str,
    ) -> Result<Notification, NotificationError>;
}

pub struct SupabaseNotificationDispatcher {
    supabase: SupabaseClient,
}

impl SupabaseNotificationDispatcher {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }
}

#[async_trait]
impl NotificationDispatcher for SupabaseNotificationDispatcher {
    async fn send(
        &self,
        notification: NewNotification,
        auth_token: &str,
    ) -> Result<Notification, NotificationError> {
        debug!(
            "Dispatching notification to recipient: {}",
            notification.recipient_id
        );

        let notification_data = json!({
            "recipient_id": notification.recipient_id,
            "title": notification.title,
            "message": notification.message,
            "status": notification.status,
            "link": notification.link,
            "is_read": false,
            "created_at": chrono::Utc::now().to_rfc3339()
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
                "/rest/v1/notifications",
                Some(auth_token),
                Some(notification_data),
                Some(headers),
            )
            .await
            .map_err(|e| NotificationError::DatabaseError(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| NotificationError::DatabaseError("notification insert returned no row".to_string()))?;

        let created: Notification = serde_json::from_value(row)
            .map_err(|e| NotificationError::DatabaseError(e.to_string()))?;

        debug!("Notification created with ID: {}", created.id);
        Ok(created)
    }
}
