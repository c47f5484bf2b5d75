//! Core domain entities
//!
//! Rides, identities and the pure rules over them. No I/O happens here;
//! stores and services live in `ports`, `adapters` and `services`.

mod identity;
pub mod lifecycle;
pub mod result;
mod ride;
pub mod view;

pub use identity::{Identity, IdentityGate, DEFAULT_ALLOWED_DOMAIN};
pub use lifecycle::{CreatePolicy, Deletion, JoinOutcome, LeaveOutcome};
pub use ride::{
    ContactPhone, GenderPreference, Location, LocationType, Ride, RideInput, CITY_LOCATIONS,
    LH_BLOCKS, MAX_SEATS, MH_BLOCKS,
};
pub use view::{DestinationFilter, GenderFilter, ViewQuery};
