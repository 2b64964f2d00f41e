//! # Expiry Report
//!
//! Groups classified drivers into urgency buckets. A report is built once
//! per run and every output channel renders from the same value, so email
//! and push always agree on counts and ordering.

use chrono::{DateTime, Duration, Local, NaiveDate};
use shared::{DriverRecord, UrgencyBucket};
use std::collections::BTreeMap;

use super::classifier::{classify, Classification};
use crate::error::{ExpiryError, ExpiryResult};

/// Date range scanned by a run, both ends inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryWindow {
    pub today: NaiveDate,
    pub horizon_days: u32,
    pub lookback_days: u32,
}

impl ExpiryWindow {
    pub fn new(today: NaiveDate, horizon_days: u32, lookback_days: u32) -> Self {
        Self {
            today,
            horizon_days,
            lookback_days,
        }
    }

    /// First day of the window, `None` when out of the calendar range
    pub fn start(&self) -> Option<NaiveDate> {
        self.today
            .checked_sub_signed(Duration::days(i64::from(self.lookback_days)))
    }

    /// Last day of the window, `None` when out of the calendar range
    pub fn end(&self) -> Option<NaiveDate> {
        self.today
            .checked_add_signed(Duration::days(i64::from(self.horizon_days)))
    }

    pub fn bounds(&self) -> ExpiryResult<(NaiveDate, NaiveDate)> {
        match (self.start(), self.end()) {
            (Some(start), Some(end)) => Ok((start, end)),
            _ => Err(ExpiryError::InvalidWindow {
                today: self.today,
                horizon_days: self.horizon_days,
                lookback_days: self.lookback_days,
            }),
        }
    }
}

/// A driver together with its classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedDriver {
    pub record: DriverRecord,
    pub classification: Classification,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpiryReport {
    pub generated_at: DateTime<Local>,
    pub window: ExpiryWindow,
    /// Every bucket is present, possibly empty; iteration is priority order
    pub buckets: BTreeMap<UrgencyBucket, Vec<ClassifiedDriver>>,
    pub total_count: usize,
}

impl ExpiryReport {
    /// Most urgent non-empty bucket
    pub fn headline(&self) -> Option<UrgencyBucket> {
        self.buckets
            .iter()
            .find(|(_, drivers)| !drivers.is_empty())
            .map(|(bucket, _)| *bucket)
    }

    pub fn count(&self, bucket: UrgencyBucket) -> usize {
        self.buckets.get(&bucket).map_or(0, Vec::len)
    }

    pub fn bucket(&self, bucket: UrgencyBucket) -> &[ClassifiedDriver] {
        self.buckets.get(&bucket).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.total_count == 0
    }

    /// All drivers, bucket by bucket in priority order
    pub fn drivers(&self) -> impl Iterator<Item = &ClassifiedDriver> {
        self.buckets.values().flatten()
    }
}

pub struct ReportBuilder;

impl ReportBuilder {
    pub fn build(
        records: Vec<DriverRecord>,
        window: ExpiryWindow,
        generated_at: DateTime<Local>,
    ) -> ExpiryReport {
        let mut buckets: BTreeMap<UrgencyBucket, Vec<ClassifiedDriver>> =
            UrgencyBucket::ALL.iter().map(|bucket| (*bucket, Vec::new())).collect();

        let total_count = records.len();
        for record in records {
            let classification = classify(&record, window.today);
            buckets
                .entry(classification.bucket)
                .or_default()
                .push(ClassifiedDriver { record, classification });
        }

        for drivers in buckets.values_mut() {
            drivers.sort_by(|a, b| {
                a.record
                    .license_expiry
                    .cmp(&b.record.license_expiry)
                    .then_with(|| a.record.surname.cmp(&b.record.surname))
                    .then_with(|| a.record.name.cmp(&b.record.name))
            });
        }

        ExpiryReport {
            generated_at,
            window,
            buckets,
            total_count,
        }
    }
}
