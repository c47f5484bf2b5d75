//! Command log migrations
//!
//! Separate from the ride schema so that logs.duckdb can be opened, cleared
//! or deleted without touching ride data.

/// Command log migrations as (filename, sql_content), applied in order.
pub const LOG_MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_command_log.sql", include_str!("001_command_log.sql")),
];
