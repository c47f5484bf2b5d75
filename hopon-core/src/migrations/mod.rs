//! Ride store migrations - embedded SQL files
//!
//! Compiled in with include_str! and applied by name order through
//! `MigrationService`, which records each one in sys_migrations.

/// Ride store migrations as (filename, sql_content).
///
/// IMPORTANT: never edit a shipped migration; add NNN_description.sql and
/// append it here.
pub const MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_rides.sql", include_str!("001_rides.sql")),
];
