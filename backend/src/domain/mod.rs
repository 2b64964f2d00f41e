//! # Domain Module
//!
//! Business logic of the driver license expiry notifications.
//!
//! ## Module Organization
//!
//! - **clock**: injectable time source
//! - **classifier**: urgency bucket and status text for one driver
//! - **report**: expiry window and the bucketed report
//! - **render**: email subject, HTML body and push content for a report
//! - **dispatcher**: delivery over email and push with per-recipient isolation
//! - **scheduler**: the once-per-day run state machine and its watermark
//! - **formatter**: display text for stored in-app notifications
//! - **job**: periodic ticker driving the daily run
//!
//! ## Business Rules
//!
//! - A daily run happens at most once per calendar day
//! - Test runs bypass that gate and never record a run date
//! - One failed recipient or channel never stops the others
//! - An empty report is a successful run, not an error

pub mod classifier;
pub mod clock;
pub mod dispatcher;
pub mod formatter;
pub mod job;
pub mod render;
pub mod report;
pub mod scheduler;

pub use classifier::{classify, Classification};
pub use clock::{Clock, FixedClock, SystemClock};
pub use dispatcher::{DispatchSettings, NotificationDispatcher};
pub use job::{spawn_job, Job};
pub use report::{ClassifiedDriver, ExpiryReport, ExpiryWindow, ReportBuilder};
pub use scheduler::{
    ExpiryScheduler, RunOutcome, RunSummary, RunTrigger, SchedulerSettings, SchedulerState,
};
