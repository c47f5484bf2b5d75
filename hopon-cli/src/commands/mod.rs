//! CLI command implementations

pub mod delete;
pub mod demo;
pub mod join;
pub mod locations;
pub mod login;
pub mod logs;
pub mod post;
pub mod rides;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, FixedOffset, Utc};
use uuid::Uuid;

use hopon_core::{CommandEvent, HopOnContext, LoggingService, Ride};

/// Open the command log in the hopon directory
pub fn open_log() -> Result<LoggingService> {
    let hopon_dir = get_hopon_dir()?;
    std::fs::create_dir_all(&hopon_dir)
        .with_context(|| format!("Failed to create hopon directory: {:?}", hopon_dir))?;
    LoggingService::open(&hopon_dir, env!("CARGO_PKG_VERSION"))
}

/// Record a finished command; a log that cannot be written never fails it
pub fn record(event: &CommandEvent) {
    if let Ok(log) = open_log() {
        let _ = log.record(event);
    }
}

/// Get the hopon directory from environment or default
pub fn get_hopon_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("HOPON_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".hopon"))
        .ok_or_else(|| anyhow!("Could not find home directory; set HOPON_DIR"))
}

/// Get or create the hopon context
pub fn get_context() -> Result<HopOnContext> {
    let hopon_dir = get_hopon_dir()?;

    std::fs::create_dir_all(&hopon_dir)
        .with_context(|| format!("Failed to create hopon directory: {:?}", hopon_dir))?;

    HopOnContext::new(&hopon_dir).context("Failed to initialize hopon context")
}

/// Parse a ride id given on the command line
pub fn parse_ride_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| anyhow!("'{}' is not a ride id", raw.trim()))
}

/// Render a timestamp in the campus offset, e.g. `Sat 01 Mar, 18:30`
pub fn format_departure(time: DateTime<Utc>, offset: FixedOffset) -> String {
    time.with_timezone(&offset).format("%a %d %b, %H:%M").to_string()
}

/// Short form of a ride id for tables
pub fn short_id(ride: &Ride) -> String {
    ride.id.to_string()[..8].to_string()
}
