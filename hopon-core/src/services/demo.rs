//! Demo service - manage demo mode
//!
//! Demo mode swaps the ride store for a local demo.duckdb seeded with a
//! sample board, so the app can be tried without touching real rides.

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Utc;

use crate::adapters::demo::generate_demo_rides;
use crate::adapters::duckdb::DuckDbRideStore;
use crate::config::Config;
use crate::ports::RideStore;

/// File name of the demo ride database
pub const DEMO_DB: &str = "demo.duckdb";

/// Demo service for managing demo mode
pub struct DemoService {
    hopon_dir: PathBuf,
}

impl DemoService {
    pub fn new(hopon_dir: &Path) -> Self {
        Self {
            hopon_dir: hopon_dir.to_path_buf(),
        }
    }

    pub fn is_enabled(&self) -> Result<bool> {
        let config = Config::load(&self.hopon_dir)?;
        Ok(config.demo_mode)
    }

    /// Enable demo mode
    ///
    /// Starts from a fresh demo database every time, then flips the config
    /// flag and seeds the sample board. Returns the number of rides seeded.
    pub async fn enable(&self) -> Result<usize> {
        self.remove_demo_db()?;

        let mut config = Config::load(&self.hopon_dir).unwrap_or_default();
        config.enable_demo_mode();
        config.save(&self.hopon_dir)?;

        let store = DuckDbRideStore::new(&self.hopon_dir.join(DEMO_DB))?
            .with_policy(config.create_policy()?);
        let rides = generate_demo_rides(Utc::now());
        for ride in &rides {
            store.insert(ride).await?;
        }

        Ok(rides.len())
    }

    /// Disable demo mode, optionally deleting the demo database
    pub fn disable(&self, clean: bool) -> Result<()> {
        let mut config = Config::load(&self.hopon_dir).unwrap_or_default();
        config.disable_demo_mode();
        config.save(&self.hopon_dir)?;

        if clean {
            self.remove_demo_db()?;
        }

        Ok(())
    }

    fn remove_demo_db(&self) -> Result<()> {
        let demo_db = self.hopon_dir.join(DEMO_DB);
        let demo_wal = self.hopon_dir.join(format!("{}.wal", DEMO_DB));
        if demo_db.exists() {
            std::fs::remove_file(&demo_db)?;
        }
        if demo_wal.exists() {
            std::fs::remove_file(&demo_wal)?;
        }
        Ok(())
    }
}
