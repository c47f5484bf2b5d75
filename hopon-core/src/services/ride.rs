//! Ride service - board queries and seat transitions against a store
//!
//! Each mutation reads the current ride, applies the pure lifecycle rule and
//! writes the result back with a conditional update. A stale write means
//! someone else changed the seats in between; the service then starts over
//! from a fresh read, a bounded number of times.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::view::{self, ViewQuery};
use crate::domain::{lifecycle, CreatePolicy, Deletion, Identity, JoinOutcome, LeaveOutcome, Ride, RideInput};
use crate::ports::{RidePatch, RideStore, UpdateOutcome};

/// Attempts at a conditional write before giving up with `Conflict`
pub const MAX_ATTEMPTS: usize = 5;

/// Service for browsing and changing rides
pub struct RideService {
    store: Arc<dyn RideStore>,
    policy: CreatePolicy,
}

impl RideService {
    pub fn new(store: Arc<dyn RideStore>, policy: CreatePolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &CreatePolicy {
        &self.policy
    }

    /// Upcoming rides matching `query`, soonest first
    pub async fn board(&self, query: &ViewQuery, now: DateTime<Utc>) -> Result<Vec<Ride>> {
        let rides = self.store.fetch_all().await?;
        Ok(view::view(&rides, query, now).into_iter().cloned().collect())
    }

    /// Rides posted by `identity`, newest first, departed ones included
    pub async fn posted_by(&self, identity: &Identity) -> Result<Vec<Ride>> {
        self.store.fetch_by_creator(identity).await
    }

    /// Rides where `identity` holds a seat, newest first
    pub async fn joined_by(&self, identity: &Identity) -> Result<Vec<Ride>> {
        let rides = self.store.fetch_all().await?;
        Ok(view::joined_by(&rides, identity).into_iter().cloned().collect())
    }

    pub async fn get(&self, id: Uuid) -> Result<Ride> {
        self.store.fetch_one(id).await
    }

    /// Validate and publish a new ride
    pub async fn post(&self, input: &RideInput, creator: &Identity, now: DateTime<Utc>) -> Result<Ride> {
        let ride = lifecycle::create(input, creator, &self.policy, now)?;
        self.store.insert(&ride).await
    }

    /// Take a seat, retrying when the seats change underneath
    pub async fn join(&self, id: Uuid, identity: &Identity) -> Result<JoinOutcome> {
        for _ in 0..MAX_ATTEMPTS {
            let current = self.store.fetch_one(id).await?;
            let next = match lifecycle::join(&current, identity)? {
                JoinOutcome::Joined(next) => next,
                already @ JoinOutcome::AlreadyJoined(_) => return Ok(already),
            };
            match self.store.update(id, &RidePatch::between(&current, &next)).await? {
                UpdateOutcome::Applied(saved) => return Ok(JoinOutcome::Joined(saved)),
                UpdateOutcome::Stale => continue,
            }
        }
        Err(Error::Conflict(format!(
            "ride {} kept changing, gave up after {} attempts",
            id, MAX_ATTEMPTS
        )))
    }

    /// Give up a seat, retrying when the seats change underneath
    pub async fn leave(&self, id: Uuid, identity: &Identity) -> Result<LeaveOutcome> {
        for _ in 0..MAX_ATTEMPTS {
            let current = self.store.fetch_one(id).await?;
            let next = match lifecycle::leave(&current, identity)? {
                LeaveOutcome::Left(next) => next,
                LeaveOutcome::NotAPassenger => return Ok(LeaveOutcome::NotAPassenger),
            };
            match self.store.update(id, &RidePatch::between(&current, &next)).await? {
                UpdateOutcome::Applied(saved) => return Ok(LeaveOutcome::Left(saved)),
                UpdateOutcome::Stale => continue,
            }
        }
        Err(Error::Conflict(format!(
            "ride {} kept changing, gave up after {} attempts",
            id, MAX_ATTEMPTS
        )))
    }

    /// Remove a ride; only its creator may
    pub async fn delete(&self, id: Uuid, requester: &Identity) -> Result<Deletion> {
        let ride = self.store.fetch_one(id).await?;
        let deletion = lifecycle::delete(&ride, requester)?;
        self.store.remove(deletion.ride_id).await?;
        Ok(deletion)
    }
}
