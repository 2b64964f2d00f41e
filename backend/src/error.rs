use chrono::NaiveDate;
use thiserror::Error;

/// Failures of an expiry notification run
#[derive(Debug, Error)]
pub enum ExpiryError {
    /// The driver store could not be queried; the run is aborted
    #[error("failed to query expiring drivers: {0:#}")]
    QueryFailure(#[source] anyhow::Error),

    /// The scanned date range does not fit the calendar
    #[error("expiry window around {today} (-{lookback_days}/+{horizon_days} days) is out of range")]
    InvalidWindow {
        today: NaiveDate,
        horizon_days: u32,
        lookback_days: u32,
    },

    /// The last-run watermark could not be read; the daily run is aborted
    #[error("failed to read the last run date: {0:#}")]
    WatermarkRead(#[source] anyhow::Error),

    /// The recipient group is missing, empty or could not be resolved
    #[error("recipient group '{group}' could not be resolved: {reason}")]
    RecipientResolution { group: String, reason: String },

    /// A single channel or recipient failed
    #[error("{channel} delivery to {recipient} failed: {reason}")]
    Delivery {
        channel: &'static str,
        recipient: String,
        reason: String,
    },

    /// The watermark could not be written after notifications were attempted
    #[error("failed to persist the last run date: {0:#}")]
    ConfigPersist(#[source] anyhow::Error),
}

pub type ExpiryResult<T> = std::result::Result<T, ExpiryError>;
