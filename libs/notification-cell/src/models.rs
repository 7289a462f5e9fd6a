use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationStatus::Info => write!(f, "info"),
            NotificationStatus::Success => write!(f, "success"),
            NotificationStatus::Warning => write!(f, "warning"),
            NotificationStatus::Error => write!(f, "error"),
        }
    }
}

/// A notification row as stored. `link` is a relative portal path the UI
/// navigates to when the notification is opened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub title: String,
    pub message: String,
    pub status: NotificationStatus,
    pub link: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNotification {
    pub recipient_id: Uuid,
    pub title: String,
    pub message: String,
    pub status: NotificationStatus,
    pub link: Option<String>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum NotificationError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_as_snake_case() {
        assert_eq!(
            serde_json::to_string(&NotificationStatus::Warning).ok(),
            Some("\"warning\"".to_string())
        );
        let parsed: NotificationStatus = serde_json::from_str("\"success\"").unwrap();
        assert_eq!(parsed, NotificationStatus::Success);
    }

    #[test]
    fn status_display_matches_storage_form() {
        assert_eq!(NotificationStatus::Info.to_string(), "info");
        assert_eq!(NotificationStatus::Error.to_string(), "error");
    }
}
