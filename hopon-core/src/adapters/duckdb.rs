//! DuckDB ride store implementation

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use duckdb::{params, Connection};
use uuid::Uuid;

use super::record::{format_timestamp, into_rides, RideRecord};
use crate::domain::result::{Error, Result};
use crate::domain::{CreatePolicy, Identity, Ride};
use crate::ports::{RidePatch, RideStore, UpdateOutcome};
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

const RIDE_COLUMNS: &str = "id, created_by, created_by_email, from_type, from_value, to_type, to_value,
     departure_time, CAST(total_price AS VARCHAR), seats_total, seats_filled, gender_pref, phone,
     passenger_emails, created_at";

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
        || lower.contains("could not set lock on file")
}

/// DuckDB-backed ride store
///
/// A single connection guarded by a mutex; every statement runs to
/// completion while the lock is held, so the conditional update is atomic
/// with respect to other callers of the same store.
pub struct DuckDbRideStore {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
    policy: CreatePolicy,
}

impl DuckDbRideStore {
    /// Open (or create) a ride database file and bring its schema up to date
    ///
    /// Includes retry logic with exponential backoff for file locking errors,
    /// which can occur when two `hopon` processes start at the same time.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    let store = Self {
                        conn: Mutex::new(conn),
                        db_path: Some(db_path.to_path_buf()),
                        policy: CreatePolicy::default(),
                    };
                    store.ensure_schema()?;
                    return Ok(store);
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        eprintln!(
                            "[hopon] Database busy, retrying in {}ms (attempt {}/{}): {}",
                            delay.as_millis(),
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }

        Err(last_error.map(Error::from).unwrap_or_else(|| {
            Error::store(format!("failed to open database after {} retries", MAX_RETRIES))
        }))
    }

    /// In-memory store, used by tests and throwaway sessions
    pub fn in_memory() -> Result<Self> {
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_in_memory_with_flags(config)?;
        let store = Self {
            conn: Mutex::new(conn),
            db_path: None,
            policy: CreatePolicy::default(),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    /// Use `policy` when reading back records with naive timestamps or
    /// unprefixed phone numbers
    pub fn with_policy(mut self, policy: CreatePolicy) -> Self {
        self.policy = policy;
        self
    }

    fn try_open_connection(db_path: &Path) -> duckdb::Result<Connection> {
        // Extension autoloading stays off; JSON support is compiled in
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Connection::open_with_flags(db_path, config)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::store(format!("lock poisoned: {}", e)))
    }

    /// Run database migrations using the MigrationService
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.lock()?;
        MigrationService::new(&conn).run_pending().map_err(Error::store)
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    /// Path of the database file, `None` when in memory
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn row_to_record(row: &duckdb::Row) -> duckdb::Result<RideRecord> {
        // Column order follows RIDE_COLUMNS
        let passengers: String = row.get(13)?;
        Ok(RideRecord {
            id: row.get(0)?,
            created_by: row.get(1)?,
            created_by_email: row.get(2)?,
            from_type: row.get(3)?,
            from_value: row.get(4)?,
            to_type: row.get(5)?,
            to_value: row.get(6)?,
            departure_time: row.get(7)?,
            total_price: row
                .get::<_, Option<String>>(8)?
                .and_then(|price| price.parse().ok()),
            seats_total: row.get(9)?,
            seats_filled: row.get(10)?,
            gender_pref: row.get(11)?,
            phone: row.get(12)?,
            passenger_emails: serde_json::from_str(&passengers).ok(),
            created_at: row.get(14)?,
            ..Default::default()
        })
    }

    /// Raw record of one ride, read under an already held lock
    fn record_by_id(conn: &Connection, id: &str) -> Result<Option<RideRecord>> {
        let mut records = Self::query_records(
            conn,
            &format!("SELECT {} FROM rides WHERE id = ?", RIDE_COLUMNS),
            &[&id],
        )?;
        Ok(records.pop())
    }

    fn query_records(
        conn: &Connection,
        sql: &str,
        params: &[&dyn duckdb::ToSql],
    ) -> Result<Vec<RideRecord>> {
        let mut stmt = conn.prepare(sql)?;
        let records = stmt
            .query_map(params, Self::row_to_record)?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(records)
    }
}

#[async_trait]
impl RideStore for DuckDbRideStore {
    async fn fetch_all(&self) -> Result<Vec<Ride>> {
        let records = {
            let conn = self.lock()?;
            Self::query_records(
                &conn,
                &format!("SELECT {} FROM rides ORDER BY created_at DESC", RIDE_COLUMNS),
                &[],
            )?
        };
        Ok(into_rides(records, &self.policy))
    }

    async fn fetch_by_creator(&self, creator: &Identity) -> Result<Vec<Ride>> {
        let records = {
            let conn = self.lock()?;
            let user_id = creator.user_id.clone().unwrap_or_default();
            Self::query_records(
                &conn,
                &format!(
                    "SELECT {} FROM rides
                     WHERE lower(created_by_email) = ? OR (created_by IS NOT NULL AND created_by = ?)
                     ORDER BY created_at DESC",
                    RIDE_COLUMNS
                ),
                &[&creator.email.to_lowercase(), &user_id],
            )?
        };
        Ok(into_rides(records, &self.policy)
            .into_iter()
            .filter(|ride| ride.is_created_by(creator))
            .collect())
    }

    async fn insert(&self, ride: &Ride) -> Result<Ride> {
        let passengers = serde_json::to_string(&ride.passengers)?;
        let id = ride.id.to_string();
        let stored = {
            let conn = self.lock()?;
            conn.execute(
                "INSERT INTO rides (id, created_by, created_by_email, from_type, from_value, to_type,
                                    to_value, departure_time, total_price, seats_total, seats_filled,
                                    gender_pref, phone, passenger_emails, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, CAST(? AS DECIMAL(12, 2)), ?, ?, ?, ?, ?, ?)",
                params![
                    id,
                    ride.created_by.user_id,
                    ride.created_by.email,
                    ride.from.kind.as_str(),
                    ride.from.value,
                    ride.to.kind.as_str(),
                    ride.to.value,
                    format_timestamp(ride.departure_time),
                    ride.total_price.to_string(),
                    ride.seats_total,
                    ride.seats_filled,
                    ride.gender_preference.as_str(),
                    ride.contact_phone.as_str(),
                    passengers,
                    format_timestamp(ride.created_at),
                ],
            )?;
            // Timestamps are stored at millisecond precision; return what a
            // later read will see
            Self::record_by_id(&conn, &id)?
        };
        match stored {
            Some(record) => record.into_ride(&self.policy),
            None => Err(Error::not_found(ride.id)),
        }
    }

    async fn fetch_one(&self, id: Uuid) -> Result<Ride> {
        let record = {
            let conn = self.lock()?;
            Self::record_by_id(&conn, &id.to_string())?
        };
        match record {
            Some(record) => record.into_ride(&self.policy),
            None => Err(Error::not_found(id)),
        }
    }

    async fn update(&self, id: Uuid, patch: &RidePatch) -> Result<UpdateOutcome> {
        let passengers = serde_json::to_string(&patch.passengers)?;
        let id_str = id.to_string();

        // Compare, write and read back under the same lock. The compare runs
        // on the normalized row, so a row repaired on read is still writable.
        let conn = self.lock()?;
        let current = Self::record_by_id(&conn, &id_str)?
            .ok_or_else(|| Error::not_found(id))?
            .into_ride(&self.policy)?;
        if !patch.expects(&current) {
            return Ok(UpdateOutcome::Stale);
        }

        conn.execute(
            "UPDATE rides SET seats_filled = ?, passenger_emails = ? WHERE id = ?",
            params![patch.seats_filled, passengers, id_str],
        )?;
        match Self::record_by_id(&conn, &id_str)? {
            Some(record) => Ok(UpdateOutcome::Applied(record.into_ride(&self.policy)?)),
            None => Err(Error::not_found(id)),
        }
    }

    async fn remove(&self, id: Uuid) -> Result<()> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM rides WHERE id = ?", [id.to_string()])?;
        if removed == 0 {
            return Err(Error::not_found(id));
        }
        Ok(())
    }
}
