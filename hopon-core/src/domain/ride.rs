//! Ride domain model

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::identity::Identity;
use super::result::{Error, Result};

/// Men's hostel blocks
pub const MH_BLOCKS: &[&str] = &[
    "A", "B", "B ANNEX", "C", "D", "D ANNEX", "E", "F", "G", "H", "J", "J ANNEX", "K", "L", "M",
    "M ANNEX", "N", "N ANNEX", "P", "Q", "R", "S", "T",
];

/// Ladies' hostel blocks
pub const LH_BLOCKS: &[&str] = &["A", "B", "C", "D", "E", "F", "G", "H", "J", "RGT H", "GH ANNEX"];

/// Common city pick-up and drop points
pub const CITY_LOCATIONS: &[&str] = &[
    "Main Gate",
    "Railway Station",
    "City Center",
    "Airport",
    "Katpadi Jn",
    "Chennai Airport",
    "Bangalore Airport",
];

/// Seat counts offered when posting a ride
pub const MAX_SEATS: u32 = 6;

/// Kind of place a ride departs from or arrives at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocationType {
    #[serde(rename = "MH")]
    HostelMH,
    #[serde(rename = "LH")]
    HostelLH,
    #[serde(rename = "CITY", alias = "City", alias = "city")]
    City,
}

impl LocationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationType::HostelMH => "MH",
            LocationType::HostelLH => "LH",
            LocationType::City => "CITY",
        }
    }

    pub fn is_hostel(&self) -> bool {
        !matches!(self, LocationType::City)
    }

    /// Known blocks for hostel types, empty for the city
    pub fn blocks(&self) -> &'static [&'static str] {
        match self {
            LocationType::HostelMH => MH_BLOCKS,
            LocationType::HostelLH => LH_BLOCKS,
            LocationType::City => &[],
        }
    }
}

impl FromStr for LocationType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "MH" => Ok(LocationType::HostelMH),
            "LH" => Ok(LocationType::HostelLH),
            "CITY" => Ok(LocationType::City),
            other => Err(Error::invalid_input(format!("unknown location type '{}'", other))),
        }
    }
}

impl fmt::Display for LocationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A departure or arrival point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub kind: LocationType,
    pub value: String,
}

impl Location {
    pub fn new(kind: LocationType, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    pub fn hostel_mh(block: impl Into<String>) -> Self {
        Self::new(LocationType::HostelMH, block)
    }

    pub fn hostel_lh(block: impl Into<String>) -> Self {
        Self::new(LocationType::HostelLH, block)
    }

    pub fn city(place: impl Into<String>) -> Self {
        Self::new(LocationType::City, place)
    }

    /// Parse the textual forms used by the board
    ///
    /// Accepts `MH:J`, `LH:C`, the dropdown encodings `Hostel-MH-J` and
    /// `Airport-Chennai`, and plain text (a city place).
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();

        if let Some(rest) = raw.strip_prefix("Hostel-") {
            if let Some((kind, block)) = rest.split_once('-') {
                if let Ok(kind) = kind.parse::<LocationType>() {
                    return Self::new(kind, block.trim());
                }
            }
        }

        if let Some(airport) = raw.strip_prefix("Airport-") {
            return Self::city(format!("{} Airport", airport.trim()));
        }

        if let Some((kind, value)) = raw.split_once(':') {
            if let Ok(kind) = kind.parse::<LocationType>() {
                return Self::new(kind, value.trim());
            }
        }

        Self::city(raw)
    }

    /// Check the location and return its canonical form
    ///
    /// Hostel blocks are matched case-insensitively against the known list
    /// and stored upper-case; city places only need to be non-empty.
    pub fn normalized(&self) -> Result<Self> {
        let value = self.value.split_whitespace().collect::<Vec<_>>().join(" ");
        if value.is_empty() {
            return Err(Error::invalid_input("location cannot be empty"));
        }

        if self.kind.is_hostel() {
            let upper = value.to_uppercase();
            if !self.kind.blocks().contains(&upper.as_str()) {
                return Err(Error::invalid_input(format!(
                    "unknown {} block '{}'",
                    self.kind, value
                )));
            }
            return Ok(Self::new(self.kind, upper));
        }

        Ok(Self::city(value))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            LocationType::City => f.write_str(&self.value),
            kind => write!(f, "{} {}", kind, self.value),
        }
    }
}

/// Who the ride creator would prefer to share with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GenderPreference {
    #[default]
    Any,
    Male,
    Female,
}

impl GenderPreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenderPreference::Any => "Any",
            GenderPreference::Male => "Male",
            GenderPreference::Female => "Female",
        }
    }
}

impl FromStr for GenderPreference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "any" | "" => Ok(GenderPreference::Any),
            "male" | "m" => Ok(GenderPreference::Male),
            "female" | "f" => Ok(GenderPreference::Female),
            other => Err(Error::invalid_input(format!("unknown gender preference '{}'", other))),
        }
    }
}

impl fmt::Display for GenderPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contact number normalized to `+<country code><10 digits>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContactPhone(String);

impl ContactPhone {
    /// Parse a phone number
    ///
    /// Spaces, dashes, dots and parentheses are ignored. A leading `+` must be
    /// followed by a 1-3 digit country code and exactly 10 more digits.
    /// Without a `+` the number must be exactly 10 digits and the default
    /// country code is prepended.
    pub fn parse(raw: &str, default_country_code: &str) -> Result<Self> {
        let cleaned: String = raw
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
            .collect();

        let (country, local) = match cleaned.strip_prefix('+') {
            Some(digits) => {
                if !digits.chars().all(|c| c.is_ascii_digit()) {
                    return Err(Error::invalid_input("contact number must contain only digits"));
                }
                if digits.len() < 11 || digits.len() > 13 {
                    return Err(Error::invalid_input(
                        "contact number must be a country code followed by exactly 10 digits",
                    ));
                }
                let split = digits.len() - 10;
                (digits[..split].to_string(), digits[split..].to_string())
            }
            None => {
                let country = default_country_code.trim().trim_start_matches('+').to_string();
                (country, cleaned)
            }
        };

        if country.is_empty()
            || country.len() > 3
            || !country.chars().all(|c| c.is_ascii_digit())
        {
            return Err(Error::invalid_input(format!("invalid country code '+{}'", country)));
        }
        if local.len() != 10 || !local.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::invalid_input("contact number must be exactly 10 digits"));
        }

        Ok(Self(format!("+{}{}", country, local)))
    }

    /// Wrap a number read back from a store without re-validating it
    pub(crate) fn from_stored(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The trailing 10-digit subscriber number
    pub fn local_number(&self) -> &str {
        self.0
            .get(self.0.len().saturating_sub(10)..)
            .unwrap_or(&self.0)
    }
}

impl fmt::Display for ContactPhone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unvalidated input for posting a ride
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RideInput {
    pub from: Location,
    pub to: Location,
    /// RFC 3339, or a local `YYYY-MM-DDTHH:MM` reading
    pub departure_time: String,
    pub total_price: Decimal,
    pub seats_total: u32,
    #[serde(default)]
    pub gender_preference: GenderPreference,
    pub contact_phone: String,
}

/// A shared-cab offer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ride {
    pub id: Uuid,
    pub created_by: Identity,
    pub from: Location,
    pub to: Location,
    pub departure_time: DateTime<Utc>,
    pub total_price: Decimal,
    pub seats_total: u32,
    pub seats_filled: u32,
    pub gender_preference: GenderPreference,
    pub contact_phone: ContactPhone,
    /// Passenger emails in join order
    pub passengers: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Ride {
    pub fn seats_left(&self) -> u32 {
        self.seats_total.saturating_sub(self.seats_filled)
    }

    pub fn is_full(&self) -> bool {
        self.seats_filled >= self.seats_total
    }

    pub fn has_passenger(&self, identity: &Identity) -> bool {
        self.passengers
            .iter()
            .any(|p| p.eq_ignore_ascii_case(&identity.email))
    }

    pub fn is_created_by(&self, identity: &Identity) -> bool {
        self.created_by.matches(identity)
    }

    /// The ride as `viewer` may see it
    ///
    /// The contact number and passenger emails are blanked unless the viewer
    /// posted the ride or holds a seat on it. The seat counter is kept.
    pub fn visible_to(&self, viewer: Option<&Identity>) -> Ride {
        let member = viewer.is_some_and(|me| self.is_created_by(me) || self.has_passenger(me));
        if member {
            return self.clone();
        }
        Ride {
            contact_phone: ContactPhone::from_stored(String::new()),
            passengers: Vec::new(),
            ..self.clone()
        }
    }

    /// Verify the seat counter, passenger list and creator rules
    pub fn check_invariants(&self) -> Result<()> {
        if self.seats_total == 0 {
            return Err(Error::invalid_input("seats total must be at least 1"));
        }
        if self.seats_filled > self.seats_total {
            return Err(Error::invalid_input(format!(
                "{} seats filled out of {}",
                self.seats_filled, self.seats_total
            )));
        }
        if self.passengers.len() != self.seats_filled as usize {
            return Err(Error::invalid_input(format!(
                "{} passengers recorded for {} filled seats",
                self.passengers.len(),
                self.seats_filled
            )));
        }
        let mut seen = HashSet::new();
        for passenger in &self.passengers {
            if !seen.insert(passenger.to_lowercase()) {
                return Err(Error::invalid_input(format!("duplicate passenger {}", passenger)));
            }
            if passenger.eq_ignore_ascii_case(&self.created_by.email) {
                return Err(Error::invalid_input("creator listed as a passenger"));
            }
        }
        Ok(())
    }
}
