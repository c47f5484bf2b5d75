//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for a local ride store (also used in demo mode)
//! - PostgREST HTTP client for the hosted ride store
//! - Demo data for trying the board without real rides

pub mod demo;
pub mod duckdb;
pub mod postgrest;
pub mod record;

#[cfg(test)]
pub mod postgrest_mock;
