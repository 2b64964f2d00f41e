use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use shared::DriverRecord;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::{debug, warn};

use super::traits::DriverStore;
use crate::db::DbConnection;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Repository for the `drivers` table
#[derive(Clone)]
pub struct DriverRepository {
    db: DbConnection,
}

impl DriverRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Insert a driver and return its new id
    pub async fn insert_driver(
        &self,
        name: &str,
        surname: &str,
        license_number: &str,
        license_expiry: NaiveDate,
        owner_user_id: &str,
    ) -> Result<i64> {
        if license_number.trim().is_empty() {
            return Err(anyhow::anyhow!("License number must not be empty"));
        }

        let result = sqlx::query(
            r#"
            INSERT INTO drivers (name, surname, license_number, license_expiry, user_id)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(name)
        .bind(surname)
        .bind(license_number)
        .bind(license_expiry.format(DATE_FORMAT).to_string())
        .bind(owner_user_id)
        .execute(self.db.pool())
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Map a row to a record, rejecting rows that break the record invariants
    fn row_to_record(row: &SqliteRow) -> Option<DriverRecord> {
        let id: i64 = row.get("id");
        let raw_expiry: String = row.get("license_expiry");
        let license_number: String = row.get("license_number");

        let license_expiry = match NaiveDate::parse_from_str(raw_expiry.trim(), DATE_FORMAT) {
            Ok(date) => date,
            Err(e) => {
                warn!("Skipping driver {}: invalid license expiry '{}': {}", id, raw_expiry, e);
                return None;
            }
        };
        if license_number.trim().is_empty() {
            warn!("Skipping driver {}: empty license number", id);
            return None;
        }

        Some(DriverRecord {
            id,
            name: row.get("name"),
            surname: row.get("surname"),
            license_number,
            license_expiry,
            owner_user_id: row.get("user_id"),
        })
    }
}

#[async_trait]
impl DriverStore for DriverRepository {
    async fn find_expiring_within(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DriverRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, surname, license_number, license_expiry, user_id
            FROM drivers
            WHERE license_expiry >= ? AND license_expiry <= ?
            ORDER BY license_expiry ASC, surname ASC, name ASC
            "#,
        )
        .bind(start.format(DATE_FORMAT).to_string())
        .bind(end.format(DATE_FORMAT).to_string())
        .fetch_all(self.db.pool())
        .await?;

        let drivers: Vec<DriverRecord> = rows.iter().filter_map(Self::row_to_record).collect();
        debug!("Found {} drivers expiring between {} and {}", drivers.len(), start, end);
        Ok(drivers)
    }
}
