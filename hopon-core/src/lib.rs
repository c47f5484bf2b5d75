//! HopOn Core - Business logic for the campus ride board
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Rides, identities and the pure lifecycle/view rules
//! - **ports**: Trait definitions for external dependencies (RideStore)
//! - **services**: Business logic orchestration
//! - **adapters**: Concrete implementations (DuckDB, PostgREST, demo data)

pub mod domain;
pub mod ports;
pub mod services;
pub mod adapters;
pub mod config;
pub mod migrations;
pub mod log_migrations;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use adapters::duckdb::DuckDbRideStore;
use adapters::postgrest::RestRideStore;
use config::Config;
use ports::RideStore;
use services::*;

// Re-export commonly used types at crate root
pub use domain::{
    DestinationFilter, GenderFilter, Identity, JoinOutcome, LeaveOutcome, Ride, RideInput,
    ViewQuery,
};
pub use domain::result::{Error, OperationResult};
pub use services::{CommandEvent, LogQuery, LoggingService};

/// File name of the local ride database
pub const RIDES_DB: &str = "rides.duckdb";

/// Main context for HopOn operations
///
/// Holds the configuration, the selected ride store and the services
/// built on top of it.
pub struct HopOnContext {
    pub config: Config,
    pub store: Arc<dyn RideStore>,
    pub ride_service: RideService,
    pub session_service: SessionService,
}

impl HopOnContext {
    /// Create a new HopOn context
    ///
    /// Demo mode uses demo.duckdb; a configured remote store is used next;
    /// otherwise rides live in rides.duckdb in the hopon directory.
    pub fn new(hopon_dir: &Path) -> Result<Self> {
        let config = Config::load(hopon_dir)?;
        let policy = config.create_policy()?;

        let store: Arc<dyn RideStore> = if config.demo_mode {
            Arc::new(DuckDbRideStore::new(&hopon_dir.join(DEMO_DB))?.with_policy(policy.clone()))
        } else if let Some(remote) = config.remote_store()? {
            Arc::new(
                RestRideStore::new(&remote.url, &remote.api_key, &remote.table)?
                    .with_policy(policy.clone()),
            )
        } else {
            std::fs::create_dir_all(hopon_dir)?;
            Arc::new(DuckDbRideStore::new(&hopon_dir.join(RIDES_DB))?.with_policy(policy.clone()))
        };

        let ride_service = RideService::new(Arc::clone(&store), policy);
        let session_service = SessionService::new(hopon_dir, config.identity_gate());

        Ok(Self {
            config,
            store,
            ride_service,
            session_service,
        })
    }
}
