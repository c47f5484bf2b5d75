//! Board view: filtering and ordering of ride listings

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identity::Identity;
use super::result::{Error, Result};
use super::ride::{GenderPreference, LocationType, Ride};

/// Destination dropdown selection
///
/// The hostel choices are wider than a destination match: `MH` also lists
/// rides leaving a men's hostel, so an MH→Airport ride shows up under `MH`.
/// Place names only ever match the destination.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DestinationFilter {
    #[default]
    All,
    /// Rides touching this hostel, as origin or destination
    Hostel(LocationType),
    /// Case-insensitive substring of the destination value
    Place(String),
}

impl DestinationFilter {
    pub fn matches(&self, ride: &Ride) -> bool {
        match self {
            DestinationFilter::All => true,
            DestinationFilter::Hostel(kind) => ride.to.kind == *kind || ride.from.kind == *kind,
            DestinationFilter::Place(needle) => ride
                .to
                .value
                .to_lowercase()
                .contains(&needle.to_lowercase()),
        }
    }
}

impl FromStr for DestinationFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            return Ok(DestinationFilter::All);
        }
        match s.to_uppercase().as_str() {
            "MH" => Ok(DestinationFilter::Hostel(LocationType::HostelMH)),
            "LH" => Ok(DestinationFilter::Hostel(LocationType::HostelLH)),
            _ => Ok(DestinationFilter::Place(s.to_string())),
        }
    }
}

impl fmt::Display for DestinationFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DestinationFilter::All => f.write_str("All"),
            DestinationFilter::Hostel(kind) => write!(f, "{}", kind),
            DestinationFilter::Place(place) => f.write_str(place),
        }
    }
}

/// Gender dropdown selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GenderFilter {
    #[default]
    All,
    Only(GenderPreference),
}

impl GenderFilter {
    pub fn matches(&self, ride: &Ride) -> bool {
        match self {
            GenderFilter::All => true,
            GenderFilter::Only(pref) => ride.gender_preference == *pref,
        }
    }
}

impl FromStr for GenderFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            return Ok(GenderFilter::All);
        }
        Ok(GenderFilter::Only(s.parse()?))
    }
}

/// Filters applied to the public board
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewQuery {
    pub destination: DestinationFilter,
    pub gender: GenderFilter,
}

impl ViewQuery {
    pub fn new(destination: DestinationFilter, gender: GenderFilter) -> Self {
        Self { destination, gender }
    }
}

/// Upcoming rides matching `query`, soonest departure first
///
/// Rides departing at or before `now` are dropped. Ties keep their input
/// order.
pub fn view<'a>(rides: &'a [Ride], query: &ViewQuery, now: DateTime<Utc>) -> Vec<&'a Ride> {
    let mut visible: Vec<&Ride> = rides
        .iter()
        .filter(|ride| ride.departure_time > now)
        .filter(|ride| query.destination.matches(ride))
        .filter(|ride| query.gender.matches(ride))
        .collect();
    visible.sort_by_key(|ride| ride.departure_time);
    visible
}

/// Rides where `identity` holds a seat, in input order
pub fn joined_by<'a>(rides: &'a [Ride], identity: &Identity) -> Vec<&'a Ride> {
    rides
        .iter()
        .filter(|ride| ride.has_passenger(identity))
        .collect()
}
