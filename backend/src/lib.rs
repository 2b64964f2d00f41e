//! # Driver Manager Backend
//!
//! Daily driver license expiry notifications.
//!
//! A background job scans the driver records once per calendar day,
//! buckets licenses by how soon they expire and reports them to the
//! members of a recipient group by email and in-app notification.
//!
//! ## Architecture
//!
//! ```text
//! REST API (rest)           Job ticker (domain::job)
//!        \                      /
//!         ExpiryScheduler (domain)
//!                 |
//!   classifier -> report -> render -> dispatcher
//!                 |
//!   Storage (drivers, key values, inbox, directory, SMTP)
//! ```

pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod rest;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_utils;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::db::DbConnection;
use crate::domain::{
    DispatchSettings, ExpiryScheduler, NotificationDispatcher, SchedulerSettings, SystemClock,
};
use crate::rest::AppState;
use crate::storage::{
    ConfigGroupDirectory, DriverRepository, Mailer, NotificationRepository, SmtpMailer, ValueStore,
};

/// Initialize the backend with all required services
pub async fn initialize_backend(config: &AppConfig) -> Result<AppState> {
    info!("Setting up database");
    let db = DbConnection::new(&config.database.url)
        .await
        .context("Failed to set up the database")?;

    info!("Setting up collaborators");
    let directory = Arc::new(ConfigGroupDirectory::new(config.directory.clone()));
    let notifications = NotificationRepository::new(db.clone());
    let mailer = if config.mail.is_enabled() {
        let smtp = SmtpMailer::new(&config.mail)?;
        Some(Arc::new(smtp) as Arc<dyn Mailer>)
    } else {
        warn!("📧 No SMTP server configured, email notifications are disabled");
        None
    };

    info!("Setting up domain model");
    let dispatcher = NotificationDispatcher::new(
        directory.clone(),
        mailer,
        Arc::new(notifications.clone()),
        DispatchSettings::from_config(config),
    );
    let scheduler = ExpiryScheduler::new(
        Arc::new(DriverRepository::new(db.clone())),
        dispatcher,
        Arc::new(ValueStore::new(db)),
        Arc::new(SystemClock),
        SchedulerSettings::from(&config.notifications),
    );

    info!("Setting up application state");
    Ok(AppState::new(
        Arc::new(scheduler),
        directory,
        notifications,
        config.notifications.app_url.clone(),
    ))
}
