use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A driver and the expiry date of their driving license
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverRecord {
    pub id: i64,
    pub name: String,
    pub surname: String,
    pub license_number: String,
    /// Calendar date the license stops being valid (YYYY-MM-DD)
    pub license_expiry: NaiveDate,
    /// User who created the record in the admin module
    pub owner_user_id: String,
}

impl DriverRecord {
    /// "Name Surname", as shown in notification summaries
    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.surname)
    }
}

/// Urgency tier of an expiring license.
///
/// Variants are declared in priority order, so `Ord` puts the most
/// urgent bucket first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrgencyBucket {
    /// License already expired
    Expired,
    /// Expires today or tomorrow
    Critical,
    /// Expires within 2 to 7 days
    Urgent,
    /// Expires later inside the notification horizon
    Warning,
}

impl UrgencyBucket {
    /// All buckets, most urgent first
    pub const ALL: [UrgencyBucket; 4] = [
        UrgencyBucket::Expired,
        UrgencyBucket::Critical,
        UrgencyBucket::Urgent,
        UrgencyBucket::Warning,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UrgencyBucket::Expired => "expired",
            UrgencyBucket::Critical => "critical",
            UrgencyBucket::Urgent => "urgent",
            UrgencyBucket::Warning => "warning",
        }
    }
}

impl fmt::Display for UrgencyBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A platform user that may receive notifications
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub display_name: String,
    /// Users without a registered address only receive push notifications
    pub email: Option<String>,
}

/// Summary of one dispatch across the email and push channels
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryOutcome {
    pub email_sent: bool,
    pub email_recipient_count: usize,
    pub push_sent: usize,
    pub push_failed: usize,
    /// One entry per failed channel or recipient
    pub errors: Vec<String>,
}

impl DeliveryOutcome {
    /// True when nothing at all was delivered
    pub fn nothing_delivered(&self) -> bool {
        !self.email_sent && self.push_sent == 0
    }
}

/// Response for POST /api/notifications/test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRunResponse {
    pub message: String,
    pub total_count: usize,
    pub outcome: DeliveryOutcome,
}

/// A notification prepared for display in a user's inbox
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationView {
    pub object_id: String,
    pub subject: String,
    pub message: String,
    pub link: String,
    /// RFC 3339 timestamp
    pub created_at: String,
}

/// Response for GET /api/notifications
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationListResponse {
    pub notifications: Vec<NotificationView>,
}

/// Response for GET /api/notifications/status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStatusResponse {
    pub last_run_date: Option<NaiveDate>,
    pub state: String,
}
