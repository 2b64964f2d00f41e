//! # Notification Dispatcher
//!
//! Delivers one report through both channels:
//!
//! - **Email**: a single HTML message addressed to every group member with
//!   an email address
//! - **Push**: one in-app notification per group member, sent one after
//!   another
//!
//! Failures never propagate. Each failed channel or recipient is logged and
//! recorded in the returned [`DeliveryOutcome`], and the remaining
//! deliveries still go out.

use lettre::Address;
use shared::{DeliveryOutcome, User};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::render::{email_html, email_subject, push_content};
use super::report::ExpiryReport;
use crate::config::AppConfig;
use crate::error::ExpiryError;
use crate::storage::{EmailRecipient, GroupDirectory, Mailer, PushNotification, PushNotifier};

/// Object type of every notification sent for expiring licenses
pub const OBJECT_TYPE: &str = "drivers";

/// Sender identity and link target for outgoing notifications
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub from: EmailRecipient,
    /// Absolute URL of the driver list view
    pub app_url: String,
}

impl DispatchSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            from: EmailRecipient {
                address: config.mail.sender_address(),
                display_name: config.mail.from_name.clone(),
            },
            app_url: config.notifications.app_url.clone(),
        }
    }
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    directory: Arc<dyn GroupDirectory>,
    mailer: Option<Arc<dyn Mailer>>,
    push: Arc<dyn PushNotifier>,
    settings: DispatchSettings,
}

impl NotificationDispatcher {
    /// Create a dispatcher; without a mailer the email channel is skipped
    pub fn new(
        directory: Arc<dyn GroupDirectory>,
        mailer: Option<Arc<dyn Mailer>>,
        push: Arc<dyn PushNotifier>,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            directory,
            mailer,
            push,
            settings,
        }
    }

    pub async fn dispatch(&self, report: &ExpiryReport, recipient_group: &str) -> DeliveryOutcome {
        let mut outcome = DeliveryOutcome::default();

        if report.is_empty() {
            info!("No expiring licenses, nothing to dispatch");
            return outcome;
        }

        let members = match self.resolve_group(recipient_group).await {
            Ok(members) => members,
            Err(e) => {
                warn!("Skipping email and push notifications: {}", e);
                outcome.errors.push(e.to_string());
                return outcome;
            }
        };

        self.send_email(report, recipient_group, &members, &mut outcome).await;
        self.send_push(report, &members, &mut outcome).await;

        info!(
            "Dispatch summary: email sent: {} ({} recipients), push: {} sent, {} failed, for {} expiring drivers",
            outcome.email_sent,
            outcome.email_recipient_count,
            outcome.push_sent,
            outcome.push_failed,
            report.total_count
        );
        outcome
    }

    async fn resolve_group(&self, group: &str) -> Result<Vec<User>, ExpiryError> {
        let members = self
            .directory
            .members_of(group)
            .await
            .map_err(|e| ExpiryError::RecipientResolution {
                group: group.to_string(),
                reason: format!("{:#}", e),
            })?;

        match members {
            None => Err(ExpiryError::RecipientResolution {
                group: group.to_string(),
                reason: "group not found".to_string(),
            }),
            Some(members) if members.is_empty() => Err(ExpiryError::RecipientResolution {
                group: group.to_string(),
                reason: "group has no members".to_string(),
            }),
            Some(members) => Ok(members),
        }
    }

    async fn send_email(
        &self,
        report: &ExpiryReport,
        recipient_group: &str,
        members: &[User],
        outcome: &mut DeliveryOutcome,
    ) {
        let Some(mailer) = &self.mailer else {
            warn!("📧 No mailer configured, skipping email notification");
            return;
        };

        let mut recipients = Vec::new();
        for user in members {
            let Some(address) = &user.email else {
                continue;
            };
            if let Err(e) = address.parse::<Address>() {
                let failure = ExpiryError::Delivery {
                    channel: "email",
                    recipient: user.id.clone(),
                    reason: format!("invalid address '{}': {}", address, e),
                };
                warn!("📧 {}", failure);
                outcome.errors.push(failure.to_string());
                continue;
            }
            recipients.push(EmailRecipient {
                address: address.clone(),
                display_name: user.display_name.clone(),
            });
        }

        if recipients.is_empty() {
            warn!("📧 No email addresses found for members of '{}'", recipient_group);
            return;
        }

        let subject = email_subject(report);
        let body = email_html(report, recipient_group);

        match mailer.send(&subject, &body, &recipients, &self.settings.from).await {
            Ok(()) => {
                info!(
                    "📧 Sent expiry notification email to {} recipients for {} expiring drivers",
                    recipients.len(),
                    report.total_count
                );
                outcome.email_sent = true;
                outcome.email_recipient_count = recipients.len();
            }
            Err(e) => {
                let failure = ExpiryError::Delivery {
                    channel: "email",
                    recipient: format!("group '{}'", recipient_group),
                    reason: format!("{:#}", e),
                };
                error!("📧 {}", failure);
                outcome.errors.push(failure.to_string());
            }
        }
    }

    async fn send_push(
        &self,
        report: &ExpiryReport,
        members: &[User],
        outcome: &mut DeliveryOutcome,
    ) {
        let content = push_content(report);
        let object_id = format!("expiring_{}", report.generated_at.format("%Y%m%d_%H%M%S"));

        info!("Starting push notifications for {} users", members.len());

        for user in members {
            let notification = PushNotification {
                user_id: user.id.clone(),
                subject: content.subject_key.clone(),
                subject_params: content.subject_params.clone(),
                message: content.message.clone(),
                message_params: content.message_params.clone(),
                rich_subject: content.rich_subject.clone(),
                rich_message: content.rich_message.clone(),
                link: self.settings.app_url.clone(),
                object_type: OBJECT_TYPE.to_string(),
                object_id: object_id.clone(),
            };

            match self.push.notify(&notification).await {
                Ok(()) => {
                    info!("Sent push notification to user: {}", user.id);
                    outcome.push_sent += 1;
                }
                Err(e) => {
                    let failure = ExpiryError::Delivery {
                        channel: "push",
                        recipient: user.id.clone(),
                        reason: format!("{:#}", e),
                    };
                    error!("{}", failure);
                    outcome.push_failed += 1;
                    outcome.errors.push(failure.to_string());
                }
            }
        }
    }
}
