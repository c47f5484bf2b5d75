//! Persisted ride record shape
//!
//! Rows written by older versions of the board used different column names
//! (`from`, `travel_date`, `cab_price`, ...). This module is the only place
//! that knows about them: everything past `RideRecord::into_ride` is a
//! canonical `Ride`.

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::domain::lifecycle::parse_departure;
use crate::domain::result::{Error, Result};
use crate::domain::{ContactPhone, CreatePolicy, GenderPreference, Identity, Location, LocationType, Ride};

/// Format a timestamp the way it is stored (sortable, millisecond precision)
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A row of the `rides` table
///
/// Canonical columns are snake_case and also accepted in camelCase. Legacy
/// columns are separate fields because a single row may carry both.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RideRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Stable user id of the creator
    #[serde(default, alias = "createdBy")]
    pub created_by: Option<String>,
    #[serde(default, alias = "createdByEmail", alias = "createdbyemail")]
    pub created_by_email: Option<String>,
    #[serde(default, alias = "fromType")]
    pub from_type: Option<String>,
    #[serde(default, alias = "fromValue")]
    pub from_value: Option<String>,
    #[serde(default, alias = "toType")]
    pub to_type: Option<String>,
    #[serde(default, alias = "toValue")]
    pub to_value: Option<String>,
    #[serde(default, alias = "departureTime", alias = "datetime")]
    pub departure_time: Option<String>,
    #[serde(default, alias = "totalPrice")]
    pub total_price: Option<Decimal>,
    #[serde(default, alias = "seatsTotal")]
    pub seats_total: Option<i64>,
    #[serde(default, alias = "seatsFilled")]
    pub seats_filled: Option<i64>,
    #[serde(default, alias = "genderPref")]
    pub gender_pref: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, alias = "passengerEmails")]
    pub passenger_emails: Option<Vec<String>>,
    #[serde(default, alias = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    // Legacy columns, read only
    #[serde(default, skip_serializing)]
    pub from: Option<String>,
    #[serde(default, skip_serializing)]
    pub to: Option<String>,
    #[serde(default, skip_serializing)]
    pub travel_date: Option<String>,
    #[serde(default, skip_serializing)]
    pub travel_time: Option<String>,
    #[serde(default, skip_serializing)]
    pub preferred_gender: Option<String>,
    #[serde(default, skip_serializing)]
    pub cab_price: Option<Decimal>,
    #[serde(default, skip_serializing)]
    pub seats: Option<i64>,
    #[serde(default, skip_serializing)]
    pub contact: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn stored_location(kind: Option<String>, value: Option<String>, legacy: Option<String>) -> Result<Location> {
    let location = match (non_empty(kind), non_empty(legacy)) {
        (Some(kind), _) => Location::new(kind.parse::<LocationType>()?, value.unwrap_or_default()),
        (None, Some(legacy)) => Location::parse(&legacy),
        (None, None) => Location::city(value.unwrap_or_default()),
    };

    let value = location.value.split_whitespace().collect::<Vec<_>>().join(" ");
    if value.is_empty() {
        return Err(Error::invalid_input("location is missing"));
    }
    let value = if location.kind.is_hostel() {
        value.to_uppercase()
    } else {
        value
    };
    Ok(Location::new(location.kind, value))
}

fn count(value: Option<i64>, field: &str) -> Result<u32> {
    let raw = value.ok_or_else(|| Error::invalid_input(format!("{} is missing", field)))?;
    u32::try_from(raw).map_err(|_| Error::invalid_input(format!("{} is out of range: {}", field, raw)))
}

impl RideRecord {
    /// Decode one raw JSON row
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| Error::invalid_input(format!("malformed record: {}", e)))
    }

    /// Record for a canonical ride
    pub fn from_ride(ride: &Ride) -> Self {
        Self {
            id: Some(ride.id.to_string()),
            created_by: ride.created_by.user_id.clone(),
            created_by_email: Some(ride.created_by.email.clone()),
            from_type: Some(ride.from.kind.as_str().to_string()),
            from_value: Some(ride.from.value.clone()),
            to_type: Some(ride.to.kind.as_str().to_string()),
            to_value: Some(ride.to.value.clone()),
            departure_time: Some(format_timestamp(ride.departure_time)),
            total_price: Some(ride.total_price),
            seats_total: Some(ride.seats_total as i64),
            seats_filled: Some(ride.seats_filled as i64),
            gender_pref: Some(ride.gender_preference.as_str().to_string()),
            phone: Some(ride.contact_phone.as_str().to_string()),
            passenger_emails: Some(ride.passengers.clone()),
            created_at: Some(format_timestamp(ride.created_at)),
            ..Default::default()
        }
    }

    /// Normalize the record into a canonical ride
    ///
    /// Legacy columns fill in for missing canonical ones. The passenger list
    /// is lower-cased, deduplicated and stripped of the creator, and the
    /// seat counter is set to its length. Records that cannot be repaired
    /// fail with `InvalidInput`.
    pub fn into_ride(self, policy: &CreatePolicy) -> Result<Ride> {
        let id = non_empty(self.id)
            .ok_or_else(|| Error::invalid_input("id is missing"))
            .and_then(|id| {
                Uuid::parse_str(&id).map_err(|_| Error::invalid_input(format!("invalid id '{}'", id)))
            })?;

        let email = non_empty(self.created_by_email)
            .ok_or_else(|| Error::invalid_input("creator email is missing"))?
            .to_lowercase();
        let created_by = match non_empty(self.created_by) {
            Some(user_id) => Identity::new(email).with_user_id(user_id),
            None => Identity::new(email),
        };

        let from = stored_location(self.from_type, self.from_value, self.from)?;
        let to = stored_location(self.to_type, self.to_value, self.to)?;

        let departure_raw = non_empty(self.departure_time).or_else(|| {
            match (non_empty(self.travel_date), non_empty(self.travel_time)) {
                (Some(date), Some(time)) => Some(format!("{}T{}", date, time)),
                _ => None,
            }
        });
        let departure_time = departure_raw
            .as_deref()
            .and_then(|raw| parse_departure(raw, policy.utc_offset))
            .ok_or_else(|| {
                Error::invalid_input(format!(
                    "unparseable departure time {:?}",
                    departure_raw.as_deref().unwrap_or_default()
                ))
            })?;

        let total_price = self
            .total_price
            .or(self.cab_price)
            .ok_or_else(|| Error::invalid_input("total price is missing"))?;

        let seats_total = count(self.seats_total.or(self.seats), "seats total")?;
        if seats_total == 0 {
            return Err(Error::invalid_input("seats total must be at least 1"));
        }

        let gender_preference = non_empty(self.gender_pref)
            .or_else(|| non_empty(self.preferred_gender))
            .and_then(|g| g.parse::<GenderPreference>().ok())
            .unwrap_or_default();

        let phone_raw = non_empty(self.phone)
            .or_else(|| non_empty(self.contact))
            .ok_or_else(|| Error::invalid_input("contact number is missing"))?;
        let contact_phone = ContactPhone::parse(&phone_raw, &policy.default_country_code)
            .unwrap_or_else(|_| ContactPhone::from_stored(phone_raw));

        let mut seen = HashSet::new();
        let passengers: Vec<String> = self
            .passenger_emails
            .unwrap_or_default()
            .into_iter()
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty() && *p != created_by.email)
            .filter(|p| seen.insert(p.clone()))
            .collect();
        if passengers.len() > seats_total as usize {
            return Err(Error::invalid_input(format!(
                "{} passengers recorded for {} seats",
                passengers.len(),
                seats_total
            )));
        }

        let seats_filled = passengers.len() as u32;
        if let Some(stored) = self.seats_filled {
            if stored != seats_filled as i64 {
                eprintln!(
                    "[hopon] Ride {} stored {} filled seats for {} passengers, using {}",
                    id,
                    stored,
                    passengers.len(),
                    seats_filled
                );
            }
        }

        let created_at = non_empty(self.created_at)
            .and_then(|raw| parse_departure(&raw, policy.utc_offset))
            .unwrap_or_default();

        Ok(Ride {
            id,
            created_by,
            from,
            to,
            departure_time,
            total_price,
            seats_total,
            seats_filled,
            gender_preference,
            contact_phone,
            passengers,
            created_at,
        })
    }
}

fn skip(id: &str, error: &Error) {
    eprintln!("[hopon] Skipping ride record '{}': {}", id, error);
}

/// Normalize a batch of records, skipping the ones that cannot be read
pub fn into_rides(records: Vec<RideRecord>, policy: &CreatePolicy) -> Vec<Ride> {
    records
        .into_iter()
        .filter_map(|record| {
            let id = record.id.clone().unwrap_or_default();
            record.into_ride(policy).map_err(|e| skip(&id, &e)).ok()
        })
        .collect()
}

/// Decode and normalize raw JSON rows
///
/// A row whose columns have the wrong JSON types is skipped like any other
/// unreadable record instead of failing the whole batch.
pub fn json_into_rides(rows: Vec<serde_json::Value>, policy: &CreatePolicy) -> Vec<Ride> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row
                .get("id")
                .and_then(|id| id.as_str())
                .unwrap_or_default()
                .to_string();
            RideRecord::from_json(row)
                .and_then(|record| record.into_ride(policy))
                .map_err(|e| skip(&id, &e))
                .ok()
        })
        .collect()
}
