//! Concurrent seat-taking tests
//!
//! Many students racing for the last seats of one ride must never overbook
//! it, and the seat count must always agree with the passenger list.
//!
//! Run with: cargo test --test concurrent_join_test -- --nocapture

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use tokio::sync::Barrier;

use hopon_core::adapters::duckdb::DuckDbRideStore;
use hopon_core::domain::{CreatePolicy, GenderPreference, Location};
use hopon_core::ports::RideStore;
use hopon_core::services::RideService;
use hopon_core::{Error, Identity, JoinOutcome, LeaveOutcome, RideInput};

/// Number of students racing for seats
const RACERS: usize = 6;

fn service() -> Arc<RideService> {
    let store: Arc<dyn RideStore> = Arc::new(DuckDbRideStore::in_memory().unwrap());
    Arc::new(RideService::new(store, CreatePolicy::default()))
}

fn input(seats_total: u32) -> RideInput {
    RideInput {
        from: Location::hostel_mh("J"),
        to: Location::city("Railway Station"),
        departure_time: (Utc::now() + Duration::hours(4)).to_rfc3339(),
        total_price: Decimal::new(500, 0),
        seats_total,
        gender_preference: GenderPreference::Any,
        contact_phone: "+919876543210".to_string(),
    }
}

fn racer(i: usize) -> Identity {
    Identity::new(format!("racer{}.s2024@vitstudent.ac.in", i))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_joins_never_overbook() {
    let service = service();
    let owner = Identity::new("owner.k2022@vitstudent.ac.in");
    let ride = service.post(&input(3), &owner, Utc::now()).await.unwrap();

    let barrier = Arc::new(Barrier::new(RACERS));
    let mut handles = Vec::new();
    for i in 0..RACERS {
        let service = Arc::clone(&service);
        let barrier = Arc::clone(&barrier);
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            service.join(ride.id, &racer(i)).await
        }));
    }

    let mut joined = 0;
    let mut full = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(JoinOutcome::Joined(_)) => joined += 1,
            Err(Error::RideFull) => full += 1,
            other => panic!("unexpected join result: {:?}", other),
        }
    }

    println!("joined: {}, full: {}", joined, full);
    assert_eq!(joined, 3);
    assert_eq!(full, RACERS - 3);

    let final_ride = service.get(ride.id).await.unwrap();
    assert_eq!(final_ride.seats_filled, 3);
    assert_eq!(final_ride.passengers.len(), 3);
    final_ride.check_invariants().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_join_and_leave_keep_count_consistent() {
    let service = service();
    let owner = Identity::new("owner.k2022@vitstudent.ac.in");
    let ride = service.post(&input(6), &owner, Utc::now()).await.unwrap();
    // Fewer writers than retry attempts, so nobody can lose every round
    const MIXED: usize = 4;

    // Half the racers already hold seats and leave while the rest join
    for i in 0..MIXED / 2 {
        service.join(ride.id, &racer(i)).await.unwrap();
    }

    let barrier = Arc::new(Barrier::new(MIXED));
    let mut handles = Vec::new();
    for i in 0..MIXED {
        let service = Arc::clone(&service);
        let barrier = Arc::clone(&barrier);
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            if i < MIXED / 2 {
                service
                    .leave(ride.id, &racer(i))
                    .await
                    .map(|outcome| matches!(outcome, LeaveOutcome::Left(_)))
            } else {
                service
                    .join(ride.id, &racer(i))
                    .await
                    .map(|outcome| matches!(outcome, JoinOutcome::Joined(_)))
            }
        }));
    }

    for handle in handles {
        assert!(handle.await.unwrap().unwrap());
    }

    let final_ride = service.get(ride.id).await.unwrap();
    final_ride.check_invariants().unwrap();
    let mut passengers = final_ride.passengers.clone();
    passengers.sort();
    let mut expected: Vec<_> = (MIXED / 2..MIXED).map(|i| racer(i).email).collect();
    expected.sort();
    assert_eq!(passengers, expected);
}
