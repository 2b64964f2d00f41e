//! # Notification Formatter
//!
//! Prepares stored in-app notifications for display. Subjects are stored as
//! keys plus counts and only turned into text here, so wording can follow
//! the counts (singular or plural) at display time.

use serde_json::{Map, Value};
use shared::NotificationView;

use crate::storage::StoredNotification;

const FALLBACK_SUBJECT: &str = "Driver license expiry notification";
const FALLBACK_MESSAGE: &str = "Driver licenses expiring soon";
const DEFAULT_HORIZON_DAYS: u64 = 30;

fn count_param(params: &Map<String, Value>, key: &str) -> Option<u64> {
    params.get(key).and_then(Value::as_u64)
}

fn pluralize(count: u64, singular: &str, plural: &str) -> String {
    let template = if count == 1 { singular } else { plural };
    template.replace("%n", &count.to_string())
}

/// Display subject for a subject key and its parameters
pub fn parse_subject(key: &str, params: &Map<String, Value>) -> String {
    match key {
        "driver_licenses_expired" => pluralize(
            count_param(params, "expired").unwrap_or(1),
            "%n driver license has EXPIRED!",
            "%n driver licenses have EXPIRED!",
        ),
        "driver_licenses_critical" => pluralize(
            count_param(params, "critical").unwrap_or(1),
            "🚨 %n license expires within 24 hours!",
            "🚨 %n licenses expire within 24 hours!",
        ),
        "driver_licenses_urgent" => pluralize(
            count_param(params, "urgent").unwrap_or(1),
            "⚠️ %n license expires within 7 days",
            "⚠️ %n licenses expire within 7 days",
        ),
        "driver_licenses_warning" => {
            let horizon = count_param(params, "horizon").unwrap_or(DEFAULT_HORIZON_DAYS);
            pluralize(
                count_param(params, "warning")
                    .or_else(|| count_param(params, "count"))
                    .unwrap_or(1),
                &format!("📢 %n license expires within {} days", horizon),
                &format!("📢 %n licenses expire within {} days", horizon),
            )
        }
        _ => FALLBACK_SUBJECT.to_string(),
    }
}

fn parse_message(stored: &StoredNotification) -> String {
    let notification = &stored.notification;
    let params = &notification.message_params;

    if params.is_empty() {
        return notification.rich_message.clone();
    }

    let mut message = params
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or(FALLBACK_MESSAGE)
        .to_string();
    if let Some(drivers) = params.get("drivers").and_then(Value::as_str) {
        if !drivers.is_empty() {
            message.push_str(": ");
            message.push_str(drivers);
        }
    }
    message
}

/// Prepare a stored notification for a user's inbox
pub fn prepare(stored: &StoredNotification, default_link: &str) -> NotificationView {
    let notification = &stored.notification;
    let link = if notification.link.is_empty() {
        default_link.to_string()
    } else {
        notification.link.clone()
    };

    NotificationView {
        object_id: notification.object_id.clone(),
        subject: parse_subject(&notification.subject, &notification.subject_params),
        message: parse_message(stored),
        link,
        created_at: stored.created_at.clone(),
    }
}
