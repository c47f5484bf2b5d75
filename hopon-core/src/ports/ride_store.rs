//! Ride store port - persistence abstraction for ride records

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::result::Result;
use crate::domain::{Identity, Ride};

/// Conditional change to the seat state of a ride
///
/// Applied only while the persisted seat state, as normalized on read,
/// still equals the expected one. The expected state is what the caller saw
/// through `fetch_one`, so rows repaired on read stay writable and the
/// repair is persisted by the first update that applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RidePatch {
    pub expected_seats_filled: u32,
    pub expected_passengers: Vec<String>,
    pub seats_filled: u32,
    pub passengers: Vec<String>,
}

impl RidePatch {
    /// Patch moving the seat state from `before` to `after`
    pub fn between(before: &Ride, after: &Ride) -> Self {
        Self {
            expected_seats_filled: before.seats_filled,
            expected_passengers: before.passengers.clone(),
            seats_filled: after.seats_filled,
            passengers: after.passengers.clone(),
        }
    }

    /// Whether `current` still has the expected seat state
    pub fn expects(&self, current: &Ride) -> bool {
        current.seats_filled == self.expected_seats_filled
            && current.passengers.len() == self.expected_passengers.len()
            && current
                .passengers
                .iter()
                .zip(&self.expected_passengers)
                .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }
}

/// Outcome of a conditional update
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// The patch was written; carries the ride as now persisted
    Applied(Ride),
    /// Someone else changed the seats since they were read
    Stale,
}

/// Ride store abstraction
///
/// Implementations own the wire format and hand back canonical rides only.
#[async_trait]
pub trait RideStore: Send + Sync {
    /// Every ride, newest `created_at` first
    async fn fetch_all(&self) -> Result<Vec<Ride>>;

    /// Rides posted by `creator`, newest first
    async fn fetch_by_creator(&self, creator: &Identity) -> Result<Vec<Ride>>;

    /// Persist a new ride and return it as stored
    async fn insert(&self, ride: &Ride) -> Result<Ride>;

    /// Fetch one ride, `RideNotFound` if absent
    async fn fetch_one(&self, id: Uuid) -> Result<Ride>;

    /// Compare-and-swap the seat state, `RideNotFound` if absent
    async fn update(&self, id: Uuid, patch: &RidePatch) -> Result<UpdateOutcome>;

    /// Delete a ride, `RideNotFound` if absent
    async fn remove(&self, id: Uuid) -> Result<()>;
}
