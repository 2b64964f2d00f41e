//! # Expiry Classifier
//!
//! Maps a driver record and the current calendar date to an urgency
//! bucket and the status text shown in reports.
//!
//! | Days until expiry | Bucket   | Status text              |
//! |-------------------|----------|--------------------------|
//! | negative          | Expired  | `EXPIRED {n} days ago`   |
//! | 0                 | Critical | `EXPIRES TODAY`          |
//! | 1                 | Critical | `EXPIRES TOMORROW`       |
//! | 2 to 7            | Urgent   | `EXPIRES IN {n} DAYS`    |
//! | more than 7       | Warning  | `Expires in {n} days`    |

use chrono::NaiveDate;
use shared::{DriverRecord, UrgencyBucket};

/// Result of classifying one record against one date
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub bucket: UrgencyBucket,
    pub urgency_text: String,
    /// Signed whole days from today to the expiry date
    pub days_until_expiry: i64,
}

pub fn classify(record: &DriverRecord, today: NaiveDate) -> Classification {
    let days = (record.license_expiry - today).num_days();

    let (bucket, urgency_text) = match days {
        d if d < 0 => (UrgencyBucket::Expired, format!("EXPIRED {} days ago", d.abs())),
        0 => (UrgencyBucket::Critical, "EXPIRES TODAY".to_string()),
        1 => (UrgencyBucket::Critical, "EXPIRES TOMORROW".to_string()),
        2..=7 => (UrgencyBucket::Urgent, format!("EXPIRES IN {} DAYS", days)),
        _ => (UrgencyBucket::Warning, format!("Expires in {} days", days)),
    };

    Classification {
        bucket,
        urgency_text,
        days_until_expiry: days,
    }
}
