//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

mod demo;
pub mod logging;
pub mod migration;
pub mod ride;
mod session;

pub use demo::{DemoService, DEMO_DB};
pub use logging::{CommandEvent, LogQuery, LogSummary, LoggedCommand, LoggingService, Outcome, LOGS_DB};
pub use migration::{MigrationResult, MigrationService, MigrationSet};
pub use ride::{RideService, MAX_ATTEMPTS};
pub use session::SessionService;
