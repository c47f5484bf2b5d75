//! Command log - one row per `hopon` command in logs.duckdb
//!
//! Each row says which command ran, which ride it acted on and how it ended.
//! Failures carry the domain error kind (`conflict`, `ride_full`, ...) so a
//! ride that keeps failing to join can be traced. Error text is scrubbed of
//! email addresses and phone numbers before it is stored.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, OnceLock};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Utc};
use duckdb::{params_from_iter, Connection};
use regex::Regex;
use serde::Serialize;

use crate::domain::result::Error;
use crate::log_migrations::LOG_MIGRATIONS;
use crate::services::MigrationService;

/// File name of the command log
pub const LOGS_DB: &str = "logs.duckdb";

/// Error kind recorded for failures that are not domain errors
const OTHER_KIND: &str = "other";

/// How a command ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Ok,
    Failed,
}

impl Outcome {
    fn as_str(&self) -> &'static str {
        match self {
            Outcome::Ok => "ok",
            Outcome::Failed => "failed",
        }
    }

    fn from_stored(raw: &str) -> Self {
        if raw == "failed" {
            Outcome::Failed
        } else {
            Outcome::Ok
        }
    }
}

fn email_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)[a-z0-9._%+\-]+@[a-z0-9\-]+(\.[a-z0-9\-]+)+").expect("email pattern is valid")
    })
}

fn phone_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\+\d[\d ]{8,}\d|\b\d{10}\b").expect("phone pattern is valid"))
}

/// Replace anything that looks like an email address or phone number
pub fn scrub(text: &str) -> String {
    let text = email_pattern().replace_all(text, "<email>");
    phone_pattern().replace_all(&text, "<phone>").into_owned()
}

/// A finished command, ready to be recorded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandEvent {
    pub command: String,
    pub ride_id: Option<String>,
    pub outcome: Outcome,
    pub error_kind: Option<String>,
    pub error_message: Option<String>,
}

impl CommandEvent {
    pub fn ok(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ride_id: None,
            outcome: Outcome::Ok,
            error_kind: None,
            error_message: None,
        }
    }

    /// A failed command; domain errors are recorded by kind
    pub fn failed(command: impl Into<String>, error: &anyhow::Error) -> Self {
        let kind = error
            .downcast_ref::<Error>()
            .map(Error::kind)
            .unwrap_or(OTHER_KIND);
        Self {
            command: command.into(),
            ride_id: None,
            outcome: Outcome::Failed,
            error_kind: Some(kind.to_string()),
            error_message: Some(scrub(&format!("{:#}", error))),
        }
    }

    pub fn on_ride(mut self, ride_id: impl Into<String>) -> Self {
        self.ride_id = Some(ride_id.into());
        self
    }
}

/// A recorded command
#[derive(Debug, Clone, Serialize)]
pub struct LoggedCommand {
    pub seq: i64,
    pub logged_at: DateTime<Utc>,
    pub app_version: String,
    pub command: String,
    pub ride_id: Option<String>,
    pub outcome: Outcome,
    pub error_kind: Option<String>,
    pub error_message: Option<String>,
}

/// Which recorded commands to list
#[derive(Debug, Clone)]
pub struct LogQuery {
    /// Only failed commands
    pub failed_only: bool,
    /// Only commands on rides whose id starts with this
    pub ride_prefix: Option<String>,
    pub limit: usize,
}

impl Default for LogQuery {
    fn default() -> Self {
        Self {
            failed_only: false,
            ride_prefix: None,
            limit: 20,
        }
    }
}

/// Runs and failures of one command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandTally {
    pub command: String,
    pub runs: u64,
    pub failures: u64,
}

/// Totals over the whole log
#[derive(Debug, Clone, Serialize)]
pub struct LogSummary {
    pub total: u64,
    pub failed: u64,
    /// Most used command first
    pub by_command: Vec<CommandTally>,
    /// Failure counts per error kind, most frequent first
    pub failures_by_kind: Vec<(String, u64)>,
}

/// The command log in logs.duckdb
pub struct LoggingService {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    app_version: String,
}

impl LoggingService {
    /// Open or create the log in `hopon_dir`, bringing its schema up to date
    pub fn open(hopon_dir: &Path, app_version: impl Into<String>) -> Result<Self> {
        let db_path = hopon_dir.join(LOGS_DB);
        let conn = Connection::open(&db_path)?;
        MigrationService::with_migrations(&conn, LOG_MIGRATIONS).run_pending()?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
            app_version: app_version.into(),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| anyhow!("command log lock poisoned: {}", e))
    }

    pub fn record(&self, event: &CommandEvent) -> Result<()> {
        self.record_at(event, Utc::now())
    }

    fn record_at(&self, event: &CommandEvent, at: DateTime<Utc>) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO command_log (logged_at_ms, app_version, command, ride_id, outcome,
                                      error_kind, error_message)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            duckdb::params![
                at.timestamp_millis(),
                &self.app_version,
                &event.command,
                &event.ride_id,
                event.outcome.as_str(),
                &event.error_kind,
                &event.error_message,
            ],
        )?;
        Ok(())
    }

    /// Matching commands, newest first
    pub fn query(&self, query: &LogQuery) -> Result<Vec<LoggedCommand>> {
        let mut conditions = Vec::new();
        let mut args: Vec<String> = Vec::new();
        if query.failed_only {
            conditions.push("outcome = 'failed'");
        }
        if let Some(prefix) = &query.ride_prefix {
            conditions.push("starts_with(lower(ride_id), ?)");
            args.push(prefix.trim().to_lowercase());
        }
        let filter = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT seq, logged_at_ms, app_version, command, ride_id, outcome, error_kind,
                    error_message
             FROM command_log {} ORDER BY seq DESC LIMIT {}",
            filter, query.limit
        ))?;
        let rows = stmt.query_map(params_from_iter(args.iter()), |row| {
            let logged_at_ms: i64 = row.get(1)?;
            let outcome: String = row.get(5)?;
            Ok(LoggedCommand {
                seq: row.get(0)?,
                logged_at: DateTime::from_timestamp_millis(logged_at_ms).unwrap_or_default(),
                app_version: row.get(2)?,
                command: row.get(3)?,
                ride_id: row.get(4)?,
                outcome: Outcome::from_stored(&outcome),
                error_kind: row.get(6)?,
                error_message: row.get(7)?,
            })
        })?;
        Ok(rows.collect::<duckdb::Result<Vec<_>>>()?)
    }

    pub fn summary(&self) -> Result<LogSummary> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT command, COUNT(*), COUNT(*) FILTER (WHERE outcome = 'failed')
             FROM command_log GROUP BY command ORDER BY COUNT(*) DESC, command",
        )?;
        let by_command = stmt
            .query_map([], |row| {
                Ok(CommandTally {
                    command: row.get(0)?,
                    runs: row.get::<_, i64>(1)? as u64,
                    failures: row.get::<_, i64>(2)? as u64,
                })
            })?
            .collect::<duckdb::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(
            "SELECT error_kind, COUNT(*) FROM command_log
             WHERE outcome = 'failed' GROUP BY error_kind ORDER BY COUNT(*) DESC, error_kind",
        )?;
        let failures_by_kind = stmt
            .query_map([], |row| {
                let kind: Option<String> = row.get(0)?;
                let count: i64 = row.get(1)?;
                Ok((kind.unwrap_or_else(|| OTHER_KIND.to_string()), count as u64))
            })?
            .collect::<duckdb::Result<Vec<_>>>()?;

        Ok(LogSummary {
            total: by_command.iter().map(|t| t.runs).sum(),
            failed: by_command.iter().map(|t| t.failures).sum(),
            by_command,
            failures_by_kind,
        })
    }

    /// Forget commands logged more than `age` ago, returning how many
    pub fn prune_older_than(&self, age: Duration) -> Result<u64> {
        let cutoff = (Utc::now() - age).timestamp_millis();
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM command_log WHERE logged_at_ms < ?", [cutoff])?;
        Ok(deleted as u64)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}
