//! In-memory collaborators and record builders for unit tests

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate};
use shared::{DriverRecord, User};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::domain::clock::{Clock, FixedClock};
use crate::storage::{
    ConfigStore, DriverStore, EmailRecipient, GroupDirectory, Mailer, PushNotification,
    PushNotifier,
};

pub fn driver(id: i64, name: &str, surname: &str, license_expiry: NaiveDate) -> DriverRecord {
    DriverRecord {
        id,
        name: name.to_string(),
        surname: surname.to_string(),
        license_number: format!("LIC-{:04}", id),
        license_expiry,
        owner_user_id: "admin".to_string(),
    }
}

pub fn user(id: &str, email: Option<&str>) -> User {
    let mut display_name = id.to_string();
    if let Some(first) = display_name.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    User {
        id: id.to_string(),
        display_name,
        email: email.map(str::to_string),
    }
}

/// 06:00 local time on `date`
pub fn generated_at(date: NaiveDate) -> DateTime<Local> {
    FixedClock::at_date(date).now()
}

pub struct MemoryDriverStore {
    records: Mutex<Vec<DriverRecord>>,
    failing: AtomicBool,
    queries: AtomicUsize,
    last_window: Mutex<Option<(NaiveDate, NaiveDate)>>,
}

impl MemoryDriverStore {
    pub fn new(records: Vec<DriverRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            failing: AtomicBool::new(false),
            queries: AtomicUsize::new(0),
            last_window: Mutex::new(None),
        }
    }

    pub fn set_records(&self, records: Vec<DriverRecord>) {
        *self.records.lock().unwrap() = records;
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of queries that reached the store
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn last_window(&self) -> Option<(NaiveDate, NaiveDate)> {
        *self.last_window.lock().unwrap()
    }
}

#[async_trait]
impl DriverStore for MemoryDriverStore {
    async fn find_expiring_within(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DriverRecord>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        *self.last_window.lock().unwrap() = Some((start, end));

        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("database is locked"));
        }

        let mut records: Vec<DriverRecord> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.license_expiry >= start && r.license_expiry <= end)
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            (a.license_expiry, &a.surname, &a.name).cmp(&(b.license_expiry, &b.surname, &b.name))
        });
        Ok(records)
    }
}

#[derive(Default)]
pub struct MemoryDirectory {
    groups: HashMap<String, Vec<User>>,
    admins: Vec<String>,
    failing: AtomicBool,
    lookups: AtomicUsize,
}

impl MemoryDirectory {
    pub fn with_group(group: &str, members: Vec<User>) -> Self {
        let mut directory = Self::default();
        directory.groups.insert(group.to_string(), members);
        directory
    }

    pub fn with_admin(mut self, user_id: &str) -> Self {
        self.admins.push(user_id.to_string());
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GroupDirectory for MemoryDirectory {
    async fn members_of(&self, group: &str) -> Result<Option<Vec<User>>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("directory unavailable"));
        }
        Ok(self.groups.get(group).cloned())
    }

    async fn is_admin(&self, user_id: &str) -> Result<bool> {
        Ok(self.admins.iter().any(|admin| admin == user_id))
    }
}

#[derive(Debug, Clone)]
pub struct SentEmail {
    pub subject: String,
    pub html_body: String,
    pub recipients: Vec<EmailRecipient>,
    pub from: EmailRecipient,
}

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentEmail>>,
    failing: AtomicBool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(
        &self,
        subject: &str,
        html_body: &str,
        recipients: &[EmailRecipient],
        from: &EmailRecipient,
    ) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("SMTP connection refused"));
        }
        self.sent.lock().unwrap().push(SentEmail {
            subject: subject.to_string(),
            html_body: html_body.to_string(),
            recipients: recipients.to_vec(),
            from: from.clone(),
        });
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingPushNotifier {
    sent: Mutex<Vec<PushNotification>>,
    failing_users: Mutex<Vec<String>>,
}

impl RecordingPushNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, user_id: &str) {
        self.failing_users.lock().unwrap().push(user_id.to_string());
    }

    pub fn sent(&self) -> Vec<PushNotification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl PushNotifier for RecordingPushNotifier {
    async fn notify(&self, notification: &PushNotification) -> Result<()> {
        if self.failing_users.lock().unwrap().contains(&notification.user_id) {
            return Err(anyhow!("push service rejected {}", notification.user_id));
        }
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryConfigStore {
    values: Mutex<HashMap<String, String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: &str, value: &str) {
        self.values.lock().unwrap().insert(key.to_string(), value.to_string());
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }

    pub fn set_fail_reads(&self, failing: bool) {
        self.fail_reads.store(failing, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, failing: bool) {
        self.fail_writes.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn get_value(&self, key: &str) -> Result<Option<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(anyhow!("config store unavailable"));
        }
        Ok(self.value(key))
    }

    async fn set_value(&self, key: &str, value: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(anyhow!("config store is read-only"));
        }
        self.insert(key, value);
        Ok(())
    }
}
