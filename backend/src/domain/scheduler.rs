//! # Expiry Scheduler
//!
//! Runs the expiry check at most once per calendar day.
//!
//! ## States
//!
//! ```text
//! Idle -> Checking -> Running -> Completed
//!      -> Checking -> SkippedAlreadyRan
//! ```
//!
//! A daily run compares the stored last run date with today and stops in
//! `SkippedAlreadyRan` when they match. Otherwise it queries the store,
//! builds the report, dispatches it and finally stores today as the last
//! run date. Test runs skip the date check and never touch the stored date.
//!
//! Runs in one process are serialized by an async mutex; the stored date is
//! what keeps runs idempotent across restarts.

use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDate;
use shared::DeliveryOutcome;
use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use super::clock::Clock;
use super::dispatcher::NotificationDispatcher;
use super::job::Job;
use super::report::{ExpiryWindow, ReportBuilder};
use crate::config::NotificationConfig;
use crate::error::{ExpiryError, ExpiryResult};
use crate::storage::{ConfigStore, DriverStore};

/// Config key of the last completed daily run
pub const LAST_RUN_KEY: &str = "drivermanager_last_notification_run";

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Checking,
    Running,
    Completed,
    SkippedAlreadyRan,
}

impl SchedulerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchedulerState::Idle => "idle",
            SchedulerState::Checking => "checking",
            SchedulerState::Running => "running",
            SchedulerState::Completed => "completed",
            SchedulerState::SkippedAlreadyRan => "skipped_already_ran",
        }
    }
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunTrigger {
    /// Background job, gated by the last run date
    Daily,
    /// Manual trigger, bypasses the gate
    Test,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub date: NaiveDate,
    pub trigger: RunTrigger,
    pub total_count: usize,
    pub outcome: DeliveryOutcome,
    pub watermark_updated: bool,
    /// Set when storing the last run date failed
    pub watermark_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed(RunSummary),
    SkippedAlreadyRan { date: NaiveDate },
}

/// Last run date kept in the config store
#[derive(Clone)]
pub struct RunWatermark {
    store: Arc<dyn ConfigStore>,
}

impl RunWatermark {
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self { store }
    }

    pub async fn load(&self) -> ExpiryResult<Option<NaiveDate>> {
        let raw = self
            .store
            .get_value(LAST_RUN_KEY)
            .await
            .map_err(ExpiryError::WatermarkRead)?;

        Ok(raw.and_then(|value| match NaiveDate::parse_from_str(value.trim(), DATE_FORMAT) {
            Ok(date) => Some(date),
            Err(e) => {
                warn!("Ignoring unreadable last run date '{}': {}", value, e);
                None
            }
        }))
    }

    pub async fn save(&self, date: NaiveDate) -> ExpiryResult<()> {
        self.store
            .set_value(LAST_RUN_KEY, &date.format(DATE_FORMAT).to_string())
            .await
            .with_context(|| format!("Failed to store last run date {}", date))
            .map_err(ExpiryError::ConfigPersist)
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub recipient_group: String,
    pub horizon_days: u32,
    pub lookback_days: u32,
    pub check_interval: Duration,
}

impl From<&NotificationConfig> for SchedulerSettings {
    fn from(config: &NotificationConfig) -> Self {
        Self {
            recipient_group: config.recipient_group.clone(),
            horizon_days: config.horizon_days,
            lookback_days: config.lookback_days,
            check_interval: Duration::from_secs(config.check_interval_secs),
        }
    }
}

pub struct ExpiryScheduler {
    store: Arc<dyn DriverStore>,
    dispatcher: NotificationDispatcher,
    watermark: RunWatermark,
    clock: Arc<dyn Clock>,
    settings: SchedulerSettings,
    state: RwLock<SchedulerState>,
    run_lock: Mutex<()>,
}

impl ExpiryScheduler {
    pub fn new(
        store: Arc<dyn DriverStore>,
        dispatcher: NotificationDispatcher,
        config_store: Arc<dyn ConfigStore>,
        clock: Arc<dyn Clock>,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            store,
            dispatcher,
            watermark: RunWatermark::new(config_store),
            clock,
            settings,
            state: RwLock::new(SchedulerState::Idle),
            run_lock: Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    /// Last observed state
    pub fn state(&self) -> SchedulerState {
        match self.state.read() {
            Ok(state) => *state,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn set_state(&self, next: SchedulerState) {
        match self.state.write() {
            Ok(mut state) => *state = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }

    pub async fn last_run_date(&self) -> ExpiryResult<Option<NaiveDate>> {
        self.watermark.load().await
    }

    /// Daily run, skipped when it already ran today
    pub async fn run_daily(&self) -> ExpiryResult<RunOutcome> {
        let _guard = self.run_lock.lock().await;
        let today = self.clock.today();

        self.set_state(SchedulerState::Checking);
        let last_run = match self.watermark.load().await {
            Ok(last_run) => last_run,
            Err(e) => {
                error!("Aborting expiry check for {}: {}", today, e);
                self.set_state(SchedulerState::Idle);
                return Err(e);
            }
        };

        if last_run == Some(today) {
            info!("Driver expiry notification already ran on {}, skipping", today);
            self.set_state(SchedulerState::SkippedAlreadyRan);
            return Ok(RunOutcome::SkippedAlreadyRan { date: today });
        }

        self.execute(today, RunTrigger::Daily).await.map(RunOutcome::Completed)
    }

    /// Manual run that ignores and keeps the last run date
    pub async fn run_test(&self) -> ExpiryResult<RunSummary> {
        let _guard = self.run_lock.lock().await;
        let today = self.clock.today();
        info!("Running test notification (manual trigger)");

        self.execute(today, RunTrigger::Test).await
    }

    async fn execute(&self, today: NaiveDate, trigger: RunTrigger) -> ExpiryResult<RunSummary> {
        self.set_state(SchedulerState::Running);
        let test_mode = if trigger == RunTrigger::Test { " (TEST MODE)" } else { "" };
        info!("Running driver license expiry check for {}{}", today, test_mode);

        let window = ExpiryWindow::new(
            today,
            self.settings.horizon_days,
            self.settings.lookback_days,
        );
        let (start, end) = match window.bounds() {
            Ok(bounds) => bounds,
            Err(e) => {
                error!("Error in driver expiry notification: {}", e);
                self.set_state(SchedulerState::Idle);
                return Err(e);
            }
        };
        let records = match self.store.find_expiring_within(start, end).await {
            Ok(records) => records,
            Err(e) => {
                let e = ExpiryError::QueryFailure(e);
                error!("Error in driver expiry notification: {}", e);
                self.set_state(SchedulerState::Idle);
                return Err(e);
            }
        };

        let report = ReportBuilder::build(records, window, self.clock.now());
        if report.is_empty() {
            info!(
                "No drivers found with licenses expiring within {} days",
                self.settings.horizon_days
            );
        } else {
            info!(
                "Found {} drivers with licenses expiring between {} and {}",
                report.total_count, start, end
            );
        }

        let outcome = self.dispatcher.dispatch(&report, &self.settings.recipient_group).await;

        let mut summary = RunSummary {
            date: today,
            trigger,
            total_count: report.total_count,
            outcome,
            watermark_updated: false,
            watermark_error: None,
        };

        if trigger == RunTrigger::Daily {
            match self.watermark.save(today).await {
                Ok(()) => summary.watermark_updated = true,
                Err(e) => {
                    error!("{}", e);
                    summary.watermark_error = Some(e.to_string());
                }
            }
        }

        info!(
            "Expiry check for {}{} completed: {} drivers, email sent: {}, push sent: {}, push failed: {}",
            today,
            test_mode,
            summary.total_count,
            summary.outcome.email_sent,
            summary.outcome.push_sent,
            summary.outcome.push_failed
        );
        self.set_state(SchedulerState::Completed);
        Ok(summary)
    }
}

#[async_trait]
impl Job for ExpiryScheduler {
    fn name(&self) -> &str {
        "driver-license-expiry"
    }

    fn interval(&self) -> Duration {
        self.settings.check_interval
    }

    async fn tick(&self) -> anyhow::Result<()> {
        self.run_daily().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::FixedClock;
    use crate::domain::dispatcher::DispatchSettings;
    use crate::storage::{EmailRecipient, Mailer};
    use crate::test_utils::{
        driver, user, MemoryConfigStore, MemoryDirectory, MemoryDriverStore, RecordingMailer,
        RecordingPushNotifier,
    };
    use chrono::Duration as ChronoDuration;

    const GROUP: &str = "driver notifications";

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
    }

    struct Fixture {
        store: Arc<MemoryDriverStore>,
        config: Arc<MemoryConfigStore>,
        clock: Arc<FixedClock>,
        mailer: Arc<RecordingMailer>,
        push: Arc<RecordingPushNotifier>,
        scheduler: ExpiryScheduler,
    }

    fn setup_test() -> Fixture {
        setup_test_with_window(30, 30)
    }

    fn setup_test_with_window(horizon_days: u32, lookback_days: u32) -> Fixture {
        let store = Arc::new(MemoryDriverStore::new(vec![
            driver(1, "Ana", "Alba", today() - ChronoDuration::days(5)),
            driver(2, "Ben", "Bell", today() + ChronoDuration::days(10)),
        ]));
        let config = Arc::new(MemoryConfigStore::new());
        let clock = Arc::new(FixedClock::at_date(today()));
        let mailer = Arc::new(RecordingMailer::new());
        let push = Arc::new(RecordingPushNotifier::new());
        let directory = Arc::new(MemoryDirectory::with_group(
            GROUP,
            vec![user("alice", Some("alice@example.com")), user("bob", None)],
        ));

        let dispatcher = NotificationDispatcher::new(
            directory,
            Some(mailer.clone() as Arc<dyn Mailer>),
            push.clone(),
            DispatchSettings {
                from: EmailRecipient {
                    address: "noreply@example.com".to_string(),
                    display_name: "Driver Manager System".to_string(),
                },
                app_url: "http://localhost:3000/apps/drivermanager/".to_string(),
            },
        );
        let scheduler = ExpiryScheduler::new(
            store.clone(),
            dispatcher,
            config.clone(),
            clock.clone(),
            SchedulerSettings {
                recipient_group: GROUP.to_string(),
                horizon_days,
                lookback_days,
                check_interval: Duration::from_secs(3600),
            },
        );

        Fixture {
            store,
            config,
            clock,
            mailer,
            push,
            scheduler,
        }
    }

    fn completed(outcome: RunOutcome) -> RunSummary {
        match outcome {
            RunOutcome::Completed(summary) => summary,
            other => panic!("expected a completed run, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_daily_run_is_idempotent() {
        let fixture = setup_test();

        let summary = completed(fixture.scheduler.run_daily().await.unwrap());
        assert_eq!(summary.total_count, 2);
        assert!(summary.outcome.email_sent);
        assert_eq!(summary.outcome.push_sent, 2);
        assert!(summary.watermark_updated);
        assert_eq!(fixture.scheduler.state(), SchedulerState::Completed);
        assert_eq!(
            fixture.config.value(LAST_RUN_KEY).as_deref(),
            Some("2025-03-01")
        );

        let second = fixture.scheduler.run_daily().await.unwrap();
        assert_eq!(second, RunOutcome::SkippedAlreadyRan { date: today() });
        assert_eq!(fixture.scheduler.state(), SchedulerState::SkippedAlreadyRan);
        assert_eq!(fixture.store.queries(), 1);
        assert_eq!(fixture.mailer.sent().len(), 1);
        assert_eq!(fixture.push.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_query_window() {
        let fixture = setup_test();
        fixture.scheduler.run_daily().await.unwrap();

        let (start, end) = fixture.store.last_window().unwrap();
        assert_eq!(start, today() - ChronoDuration::days(30));
        assert_eq!(end, today() + ChronoDuration::days(30));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_daily_runs_dispatch_once() {
        let Fixture {
            store,
            mailer,
            push,
            scheduler,
            ..
        } = setup_test();
        let scheduler = Arc::new(scheduler);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let scheduler = scheduler.clone();
                tokio::spawn(async move { scheduler.run_daily().await })
            })
            .collect();

        let mut completed_runs = 0;
        let mut skipped_runs = 0;
        for handle in handles {
            match handle.await.unwrap().unwrap() {
                RunOutcome::Completed(_) => completed_runs += 1,
                RunOutcome::SkippedAlreadyRan { date } => {
                    assert_eq!(date, today());
                    skipped_runs += 1;
                }
            }
        }

        assert_eq!(completed_runs, 1);
        assert_eq!(skipped_runs, 7);
        assert_eq!(store.queries(), 1);
        assert_eq!(mailer.sent().len(), 1);
        assert_eq!(push.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_out_of_range_window_aborts_run() {
        let fixture = setup_test_with_window(4_000_000_000, 30);

        let result = fixture.scheduler.run_test().await;
        assert!(matches!(result, Err(ExpiryError::InvalidWindow { .. })));
        assert_eq!(fixture.scheduler.state(), SchedulerState::Idle);
        assert_eq!(fixture.store.queries(), 0);
        assert!(fixture.mailer.sent().is_empty());
        assert!(fixture.push.sent().is_empty());
    }

    #[tokio::test]
    async fn test_next_day_runs_again() {
        let fixture = setup_test();
        fixture.scheduler.run_daily().await.unwrap();

        let tomorrow = today() + ChronoDuration::days(1);
        fixture.clock.set_date(tomorrow);
        let summary = completed(fixture.scheduler.run_daily().await.unwrap());

        assert_eq!(summary.date, tomorrow);
        assert_eq!(fixture.store.queries(), 2);
        assert_eq!(
            fixture.config.value(LAST_RUN_KEY).as_deref(),
            Some("2025-03-02")
        );
    }

    #[tokio::test]
    async fn test_test_run_leaves_watermark_alone() {
        let fixture = setup_test();

        let summary = fixture.scheduler.run_test().await.unwrap();
        assert_eq!(summary.trigger, RunTrigger::Test);
        assert!(!summary.watermark_updated);
        assert_eq!(fixture.config.value(LAST_RUN_KEY), None);

        // The daily gate is unaffected by the test run
        let daily = fixture.scheduler.run_daily().await.unwrap();
        assert!(matches!(daily, RunOutcome::Completed(_)));

        // And test runs still go through once the daily run happened
        fixture.scheduler.run_test().await.unwrap();
        assert_eq!(fixture.store.queries(), 3);
        assert_eq!(
            fixture.config.value(LAST_RUN_KEY).as_deref(),
            Some("2025-03-01")
        );
    }

    #[tokio::test]
    async fn test_store_failure_keeps_watermark() {
        let fixture = setup_test();
        fixture.store.set_failing(true);

        let result = fixture.scheduler.run_daily().await;
        assert!(matches!(result, Err(ExpiryError::QueryFailure(_))));
        assert_eq!(fixture.config.value(LAST_RUN_KEY), None);
        assert!(fixture.push.sent().is_empty());
        assert_eq!(fixture.scheduler.state(), SchedulerState::Idle);

        // The next trigger retries
        fixture.store.set_failing(false);
        let summary = completed(fixture.scheduler.run_daily().await.unwrap());
        assert!(summary.watermark_updated);
    }

    #[tokio::test]
    async fn test_watermark_write_failure_still_completes() {
        let fixture = setup_test();
        fixture.config.set_fail_writes(true);

        let summary = completed(fixture.scheduler.run_daily().await.unwrap());
        assert!(!summary.watermark_updated);
        assert!(summary.watermark_error.is_some());
        assert_eq!(summary.outcome.push_sent, 2);
        assert_eq!(fixture.scheduler.state(), SchedulerState::Completed);
    }

    #[tokio::test]
    async fn test_watermark_read_failure_aborts() {
        let fixture = setup_test();
        fixture.config.set_fail_reads(true);

        let result = fixture.scheduler.run_daily().await;
        assert!(matches!(result, Err(ExpiryError::WatermarkRead(_))));
        assert_eq!(fixture.store.queries(), 0);
    }

    #[tokio::test]
    async fn test_unreadable_watermark_counts_as_never_ran() {
        let fixture = setup_test();
        fixture.config.insert(LAST_RUN_KEY, "yesterday");

        assert_eq!(fixture.scheduler.last_run_date().await.unwrap(), None);
        let outcome = fixture.scheduler.run_daily().await.unwrap();
        assert!(matches!(outcome, RunOutcome::Completed(_)));
    }

    #[tokio::test]
    async fn test_empty_report_still_updates_watermark() {
        let fixture = setup_test();
        fixture.store.set_records(Vec::new());

        let summary = completed(fixture.scheduler.run_daily().await.unwrap());
        assert_eq!(summary.total_count, 0);
        assert!(!summary.outcome.email_sent);
        assert_eq!(summary.outcome.push_sent, 0);
        assert!(summary.outcome.errors.is_empty());
        assert!(summary.watermark_updated);
        assert_eq!(
            fixture.scheduler.last_run_date().await.unwrap(),
            Some(today())
        );
    }

    #[tokio::test]
    async fn test_job_tick_runs_daily_check() {
        let fixture = setup_test();

        fixture.scheduler.tick().await.unwrap();
        fixture.scheduler.tick().await.unwrap();

        assert_eq!(fixture.store.queries(), 1);
        assert_eq!(fixture.scheduler.interval(), Duration::from_secs(3600));
    }
}
