//! # Notification Inbox
//!
//! Stores in-app notifications in the `notifications` table. A notification
//! is identified by user, object type and object id; notifying the same
//! object twice replaces the earlier entry instead of duplicating it.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::debug;

use super::traits::{PushNotification, PushNotifier};
use crate::db::DbConnection;

/// A notification as stored for one user
#[derive(Debug, Clone, PartialEq)]
pub struct StoredNotification {
    pub id: i64,
    pub notification: PushNotification,
    /// RFC 3339 creation timestamp
    pub created_at: String,
}

#[derive(Clone)]
pub struct NotificationRepository {
    db: DbConnection,
}

impl NotificationRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Notifications of a user, newest first
    pub async fn list_for_user(
        &self,
        user_id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<StoredNotification>> {
        let limit = i64::from(limit.unwrap_or(50).min(200));

        let rows = sqlx::query(
            r#"
            SELECT id, user_id, object_type, object_id, subject, subject_params,
                   message, message_params, rich_subject, rich_message, link, created_at
            FROM notifications
            WHERE user_id = ?
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        rows.iter().map(Self::row_to_notification).collect()
    }

    fn row_to_notification(row: &SqliteRow) -> Result<StoredNotification> {
        let subject_params: String = row.get("subject_params");
        let message_params: String = row.get("message_params");

        Ok(StoredNotification {
            id: row.get("id"),
            notification: PushNotification {
                user_id: row.get("user_id"),
                subject: row.get("subject"),
                subject_params: parse_params(&subject_params)
                    .context("Invalid subject parameters")?,
                message: row.get("message"),
                message_params: parse_params(&message_params)
                    .context("Invalid message parameters")?,
                rich_subject: row.get("rich_subject"),
                rich_message: row.get("rich_message"),
                link: row.get("link"),
                object_type: row.get("object_type"),
                object_id: row.get("object_id"),
            },
            created_at: row.get("created_at"),
        })
    }
}

fn parse_params(raw: &str) -> Result<Map<String, Value>> {
    Ok(serde_json::from_str(raw)?)
}

#[async_trait]
impl PushNotifier for NotificationRepository {
    async fn notify(&self, notification: &PushNotification) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO notifications
                (user_id, object_type, object_id, subject, subject_params, message,
                 message_params, rich_subject, rich_message, link, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&notification.user_id)
        .bind(&notification.object_type)
        .bind(&notification.object_id)
        .bind(&notification.subject)
        .bind(serde_json::to_string(&notification.subject_params)?)
        .bind(&notification.message)
        .bind(serde_json::to_string(&notification.message_params)?)
        .bind(&notification.rich_subject)
        .bind(&notification.rich_message)
        .bind(&notification.link)
        .bind(Utc::now().to_rfc3339())
        .execute(self.db.pool())
        .await
        .with_context(|| format!("Failed to store notification for {}", notification.user_id))?;

        debug!(
            "Stored notification {}/{} for {}",
            notification.object_type, notification.object_id, notification.user_id
        );
        Ok(())
    }
}
