//! Demo ride data
//!
//! A small, believable board: airport and station runs from both hostels,
//! one ride that is already full, and one that has already left (hidden
//! from the board but still visible under "mine").

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::{ContactPhone, GenderPreference, Identity, Location, Ride};

/// Email of the demo account that owns the "mine" rides
pub const DEMO_EMAIL: &str = "demo.user2024@vitstudent.ac.in";

struct DemoRide {
    id: &'static str,
    creator: &'static str,
    from: Location,
    to: Location,
    hours_ahead: i64,
    price: i64,
    seats_total: u32,
    gender: GenderPreference,
    phone: &'static str,
    passengers: &'static [&'static str],
}

fn demo_rides() -> Vec<DemoRide> {
    vec![
        DemoRide {
            id: "11111111-1111-4111-8111-111111111111",
            creator: "arjun.mehta2022@vitstudent.ac.in",
            from: Location::hostel_mh("J"),
            to: Location::city("Airport"),
            hours_ahead: 12,
            price: 900,
            seats_total: 4,
            gender: GenderPreference::Any,
            phone: "+919876543210",
            passengers: &["rahul.nair2023@vitstudent.ac.in"],
        },
        DemoRide {
            id: "22222222-2222-4222-8222-222222222222",
            creator: "sneha.iyer2023@vitstudent.ac.in",
            from: Location::hostel_lh("C"),
            to: Location::city("Railway Station"),
            hours_ahead: 24,
            price: 450,
            seats_total: 3,
            gender: GenderPreference::Female,
            phone: "+919988776655",
            passengers: &[],
        },
        DemoRide {
            id: "33333333-3333-4333-8333-333333333333",
            creator: DEMO_EMAIL,
            from: Location::hostel_mh("B ANNEX"),
            to: Location::city("Chennai Airport"),
            hours_ahead: 30,
            price: 2400,
            seats_total: 4,
            gender: GenderPreference::Any,
            phone: "+919123456780",
            passengers: &[
                "karthik.r2022@vitstudent.ac.in",
                "vikram.s2024@vitstudent.ac.in",
            ],
        },
        DemoRide {
            id: "44444444-4444-4444-8444-444444444444",
            creator: "priya.das2021@vitstudent.ac.in",
            from: Location::city("Katpadi Jn"),
            to: Location::hostel_lh("RGT H"),
            hours_ahead: 6,
            price: 300,
            seats_total: 2,
            gender: GenderPreference::Female,
            phone: "+918877665544",
            passengers: &[
                "ananya.k2022@vitstudent.ac.in",
                "meera.j2023@vitstudent.ac.in",
            ],
        },
        DemoRide {
            id: "55555555-5555-4555-8555-555555555555",
            creator: "rohan.gupta2022@vitstudent.ac.in",
            from: Location::hostel_mh("Q"),
            to: Location::city("Bangalore Airport"),
            hours_ahead: 48,
            price: 3600,
            seats_total: 6,
            gender: GenderPreference::Male,
            phone: "+917766554433",
            passengers: &[DEMO_EMAIL],
        },
        DemoRide {
            id: "66666666-6666-4666-8666-666666666666",
            creator: DEMO_EMAIL,
            from: Location::city("Main Gate"),
            to: Location::city("City Center"),
            hours_ahead: -20,
            price: 200,
            seats_total: 3,
            gender: GenderPreference::Any,
            phone: "+919123456780",
            passengers: &["rahul.nair2023@vitstudent.ac.in"],
        },
    ]
}

/// Generate the demo board relative to `now`
pub fn generate_demo_rides(now: DateTime<Utc>) -> Vec<Ride> {
    demo_rides()
        .into_iter()
        .enumerate()
        .map(|(i, demo)| Ride {
            id: Uuid::parse_str(demo.id).unwrap_or_else(|_| Uuid::new_v4()),
            created_by: Identity::new(demo.creator),
            from: demo.from,
            to: demo.to,
            departure_time: now + Duration::hours(demo.hours_ahead),
            total_price: Decimal::new(demo.price, 0),
            seats_total: demo.seats_total,
            seats_filled: demo.passengers.len() as u32,
            gender_preference: demo.gender,
            contact_phone: ContactPhone::from_stored(demo.phone),
            passengers: demo.passengers.iter().map(|p| p.to_string()).collect(),
            created_at: now - Duration::days(2) + Duration::hours(i as i64),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::domain::view::{view, ViewQuery};

    #[test]
    fn test_demo_rides_are_consistent() {
        let rides = generate_demo_rides(Utc::now());
        assert_eq!(rides.len(), 6);
        for ride in &rides {
            ride.check_invariants().unwrap();
            assert!(ride.from.normalized().is_ok());
            assert!(ride.to.normalized().is_ok());
        }
        let ids: HashSet<_> = rides.iter().map(|r| r.id).collect();
        assert_eq!(ids.len(), rides.len());
    }

    #[test]
    fn test_demo_board_hides_departed_ride() {
        let now = Utc::now();
        let rides = generate_demo_rides(now);
        let board = view(&rides, &ViewQuery::default(), now);
        assert_eq!(board.len(), 5);
        assert!(board.iter().all(|r| r.departure_time > now));
    }
}
