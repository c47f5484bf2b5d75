//! Ride lifecycle rules
//!
//! Pure transitions over a ride snapshot: create, join, leave and delete.
//! Nothing here touches a store; callers persist the returned snapshot.
//! Each transition either returns a complete, consistent ride or an error,
//! never a half-applied change.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::identity::Identity;
use super::result::{Error, Result};
use super::ride::{ContactPhone, Ride, RideInput, MAX_SEATS};

/// Local formats accepted for departure times without an offset
const LOCAL_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Campus-wide settings applied when a ride is posted
#[derive(Debug, Clone)]
pub struct CreatePolicy {
    /// Prepended to 10-digit numbers entered without one, e.g. `+91`
    pub default_country_code: String,
    /// Offset used to read departure times typed without one
    pub utc_offset: FixedOffset,
}

impl Default for CreatePolicy {
    fn default() -> Self {
        Self {
            default_country_code: "+91".to_string(),
            // IST
            utc_offset: FixedOffset::east_opt(330 * 60).expect("IST offset is in range"),
        }
    }
}

/// Parse a departure time
///
/// RFC 3339 values carry their own offset; `YYYY-MM-DDTHH:MM[:SS]` and
/// `YYYY-MM-DD HH:MM[:SS]` are read in `offset`.
pub fn parse_departure(raw: &str, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    LOCAL_FORMATS.iter().find_map(|fmt| {
        NaiveDateTime::parse_from_str(raw, fmt)
            .ok()
            .and_then(|naive| offset.from_local_datetime(&naive).single())
            .map(|dt| dt.with_timezone(&Utc))
    })
}

fn field_error(field: &str, err: Error) -> Error {
    match err {
        Error::InvalidInput(msg) => Error::InvalidInput(format!("{}: {}", field, msg)),
        other => other,
    }
}

/// Validate input and build a new, empty ride owned by `creator`
///
/// Checks run in a fixed order and the first failure is reported.
pub fn create(
    input: &RideInput,
    creator: &Identity,
    policy: &CreatePolicy,
    now: DateTime<Utc>,
) -> Result<Ride> {
    let from = input.from.normalized().map_err(|e| field_error("from", e))?;
    let to = input.to.normalized().map_err(|e| field_error("to", e))?;

    if input.seats_total < 1 || input.seats_total > MAX_SEATS {
        return Err(Error::invalid_input(format!(
            "seats total must be between 1 and {}",
            MAX_SEATS
        )));
    }

    if input.total_price <= Decimal::ZERO {
        return Err(Error::invalid_input("total price must be greater than zero"));
    }

    let contact_phone = ContactPhone::parse(&input.contact_phone, &policy.default_country_code)
        .map_err(|e| field_error("phone", e))?;

    let departure_time = parse_departure(&input.departure_time, policy.utc_offset).ok_or_else(|| {
        Error::invalid_input(format!(
            "departure time '{}' is not a valid date and time",
            input.departure_time
        ))
    })?;
    if departure_time <= now {
        return Err(Error::invalid_input("departure time must be in the future"));
    }

    Ok(Ride {
        id: Uuid::new_v4(),
        created_by: creator.clone(),
        from,
        to,
        departure_time,
        total_price: input.total_price.normalize(),
        seats_total: input.seats_total,
        seats_filled: 0,
        gender_preference: input.gender_preference,
        contact_phone,
        passengers: Vec::new(),
        created_at: now,
    })
}

/// Result of a join attempt that did not fail
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "ride", rename_all = "snake_case")]
pub enum JoinOutcome {
    /// A seat was taken; the ride must be persisted
    Joined(Ride),
    /// The identity already holds a seat; the ride is returned unchanged
    AlreadyJoined(Ride),
}

impl JoinOutcome {
    pub fn ride(&self) -> &Ride {
        match self {
            JoinOutcome::Joined(ride) | JoinOutcome::AlreadyJoined(ride) => ride,
        }
    }

    pub fn into_ride(self) -> Ride {
        match self {
            JoinOutcome::Joined(ride) | JoinOutcome::AlreadyJoined(ride) => ride,
        }
    }
}

/// Take a seat on `ride`
pub fn join(ride: &Ride, identity: &Identity) -> Result<JoinOutcome> {
    ride.check_invariants()?;

    if ride.has_passenger(identity) {
        return Ok(JoinOutcome::AlreadyJoined(ride.clone()));
    }
    if ride.is_created_by(identity) {
        return Err(Error::CreatorCannotJoin);
    }
    if ride.is_full() {
        return Err(Error::RideFull);
    }

    let mut joined = ride.clone();
    joined.seats_filled += 1;
    joined.passengers.push(identity.email.clone());
    Ok(JoinOutcome::Joined(joined))
}

/// Result of a leave attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "ride", rename_all = "snake_case")]
pub enum LeaveOutcome {
    /// The seat was released; the ride must be persisted
    Left(Ride),
    /// The identity held no seat; nothing to do
    NotAPassenger,
}

/// Give up a seat on `ride`
pub fn leave(ride: &Ride, identity: &Identity) -> Result<LeaveOutcome> {
    ride.check_invariants()?;

    if !ride.has_passenger(identity) {
        return Ok(LeaveOutcome::NotAPassenger);
    }

    let mut left = ride.clone();
    left.passengers
        .retain(|p| !p.eq_ignore_ascii_case(&identity.email));
    left.seats_filled = left.seats_filled.saturating_sub(1);
    Ok(LeaveOutcome::Left(left))
}

/// Authorization to remove a ride record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Deletion {
    pub ride_id: Uuid,
}

/// Check that `requester` may delete `ride`
pub fn delete(ride: &Ride, requester: &Identity) -> Result<Deletion> {
    if !ride.is_created_by(requester) {
        return Err(Error::Unauthorized);
    }
    Ok(Deletion { ride_id: ride.id })
}
