//! # Collaborator Traits
//!
//! The expiry notification core only talks to the outside world through
//! these traits. Production implementations live next to this module;
//! tests swap in in-memory doubles.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{Map, Value};
use shared::{DriverRecord, User};

/// Read access to driver records
#[async_trait]
pub trait DriverStore: Send + Sync {
    /// Drivers whose license expires between `start` and `end` (both inclusive),
    /// ordered by expiry date, then surname, then name
    async fn find_expiring_within(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DriverRecord>>;
}

/// Resolution of named user groups
#[async_trait]
pub trait GroupDirectory: Send + Sync {
    /// Members of a group, or `None` if the group does not exist
    async fn members_of(&self, group: &str) -> Result<Option<Vec<User>>>;

    /// Whether the user is a platform administrator
    async fn is_admin(&self, user_id: &str) -> Result<bool>;
}

/// A single addressee of an email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailRecipient {
    pub address: String,
    pub display_name: String,
}

/// Sender of HTML email to several recipients at once
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(
        &self,
        subject: &str,
        html_body: &str,
        recipients: &[EmailRecipient],
        from: &EmailRecipient,
    ) -> Result<()>;
}

/// An in-app notification addressed to one user
#[derive(Debug, Clone, PartialEq)]
pub struct PushNotification {
    pub user_id: String,
    /// Subject key understood by the notification formatter
    pub subject: String,
    /// Per-bucket counts and the total, keyed by name
    pub subject_params: Map<String, Value>,
    pub message: String,
    /// `message` and `drivers` parameters for the formatter
    pub message_params: Map<String, Value>,
    pub rich_subject: String,
    pub rich_message: String,
    /// Absolute link to the driver list view
    pub link: String,
    pub object_type: String,
    /// Unique per run so separate days never collapse into one notification
    pub object_id: String,
}

/// Delivery of in-app notifications
#[async_trait]
pub trait PushNotifier: Send + Sync {
    async fn notify(&self, notification: &PushNotification) -> Result<()>;
}

/// Persistent application settings
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn get_value(&self, key: &str) -> Result<Option<String>>;

    async fn set_value(&self, key: &str, value: &str) -> Result<()>;
}
