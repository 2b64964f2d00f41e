//! # Storage Module
//!
//! Persistence and delivery collaborators of the expiry notification core.
//!
//! The domain layer only sees the traits in [`traits`]; this module also
//! ships the production implementations:
//!
//! - **DriverRepository**: SQLite `drivers` table, queried by expiry window
//! - **ValueStore**: SQLite `key_values` table, holds the last run date
//! - **NotificationRepository**: SQLite inbox of in-app notifications
//! - **ConfigGroupDirectory**: users, groups and admins from the config file
//! - **SmtpMailer**: HTML email over SMTP

pub mod driver_repository;
pub mod group_directory;
pub mod mailer;
pub mod notification_repository;
pub mod traits;
pub mod value_store;

pub use driver_repository::DriverRepository;
pub use group_directory::ConfigGroupDirectory;
pub use mailer::SmtpMailer;
pub use notification_repository::{NotificationRepository, StoredNotification};
pub use traits::*;
pub use value_store::ValueStore;
