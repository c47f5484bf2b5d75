//! Hosted ride store over PostgREST
//!
//! Talks to a Supabase/PostgREST `rides` table. Row filters use PostgREST's
//! query syntax (`id=eq.<uuid>`); the conditional seat update is a PATCH
//! filtered on both the id and the seat count as stored.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::{json, Value as JsonValue};
use url::Url;
use uuid::Uuid;

use super::record::{json_into_rides, RideRecord};
use crate::domain::result::{Error, Result};
use crate::domain::{CreatePolicy, Identity, Ride};
use crate::ports::{RidePatch, RideStore, UpdateOutcome};

/// Request timeout for every call to the hosted store
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default table name
pub const DEFAULT_TABLE: &str = "rides";

/// PostgREST-backed ride store
#[derive(Debug)]
pub struct RestRideStore {
    client: Client,
    endpoint: String,
    api_key: String,
    policy: CreatePolicy,
}

impl RestRideStore {
    /// Create a store for `<base_url>/rest/v1/<table>`
    pub fn new(base_url: &str, api_key: &str, table: &str) -> Result<Self> {
        let parsed = Url::parse(base_url.trim())
            .map_err(|e| Error::Config(format!("invalid store URL '{}': {}", base_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "store URL must use http or https, got '{}'",
                parsed.scheme()
            )));
        }
        if api_key.trim().is_empty() {
            return Err(Error::Config("store API key cannot be empty".to_string()));
        }
        let table = table.trim();
        if table.is_empty() || !table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(Error::Config(format!("invalid table name '{}'", table)));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/rest/v1/{}",
                parsed.as_str().trim_end_matches('/'),
                table
            ),
            api_key: api_key.trim().to_string(),
            policy: CreatePolicy::default(),
        })
    }

    pub fn with_policy(mut self, policy: CreatePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
    }

    /// Send a request and return the raw rows it produced
    ///
    /// Rows are decoded one at a time later, so a single mistyped row cannot
    /// fail the whole response.
    async fn send(&self, request: RequestBuilder) -> Result<Vec<JsonValue>> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(map_request_error)?;
        let response = check_response_status(response).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }
        response
            .json::<Vec<JsonValue>>()
            .await
            .map_err(|e| Error::store(format!("unexpected response from ride store: {}", e)))
    }

    async fn select(&self, filters: &[(&str, String)]) -> Result<Vec<JsonValue>> {
        let request = self
            .client
            .get(&self.endpoint)
            .query(&[("select", "*")])
            .query(filters)
            .query(&[("order", "created_at.desc")]);
        self.send(request).await
    }

    /// Raw record of one ride, `RideNotFound` if absent
    async fn select_one(&self, id: Uuid) -> Result<RideRecord> {
        let mut rows = self.select(&[("id", Self::eq(id))]).await?;
        match rows.pop() {
            Some(row) => RideRecord::from_json(row),
            None => Err(Error::not_found(id)),
        }
    }

    fn eq(value: impl std::fmt::Display) -> String {
        format!("eq.{}", value)
    }
}

fn map_request_error(error: reqwest::Error) -> Error {
    if error.is_timeout() {
        Error::store(format!("request timed out after {} seconds", REQUEST_TIMEOUT_SECS))
    } else if error.is_connect() {
        Error::store("unable to connect to the ride store")
    } else {
        Error::store(error)
    }
}

async fn check_response_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let detail = if body.trim().is_empty() {
        String::new()
    } else {
        format!(": {}", body.trim())
    };
    match status.as_u16() {
        401 | 403 => Err(Error::store(format!(
            "authentication failed (HTTP {}), check the store API key{}",
            status.as_u16(),
            detail
        ))),
        404 => Err(Error::store(format!("ride table not found{}", detail))),
        code => Err(Error::store(format!("HTTP {}{}", code, detail))),
    }
}

#[async_trait]
impl RideStore for RestRideStore {
    async fn fetch_all(&self) -> Result<Vec<Ride>> {
        let rows = self.select(&[]).await?;
        Ok(json_into_rides(rows, &self.policy))
    }

    async fn fetch_by_creator(&self, creator: &Identity) -> Result<Vec<Ride>> {
        let filter = match &creator.user_id {
            Some(user_id) => (
                "or",
                format!(
                    "(created_by.eq.\"{}\",created_by_email.eq.\"{}\")",
                    user_id, creator.email
                ),
            ),
            None => ("created_by_email", Self::eq(&creator.email)),
        };
        let rows = self.select(&[filter]).await?;
        Ok(json_into_rides(rows, &self.policy)
            .into_iter()
            .filter(|ride| ride.is_created_by(creator))
            .collect())
    }

    async fn insert(&self, ride: &Ride) -> Result<Ride> {
        let request = self
            .client
            .post(&self.endpoint)
            .header("Prefer", "return=representation")
            .json(&RideRecord::from_ride(ride));
        let mut rows = self.send(request).await?;
        match rows.pop() {
            Some(row) => RideRecord::from_json(row)?.into_ride(&self.policy),
            None => Ok(ride.clone()),
        }
    }

    async fn fetch_one(&self, id: Uuid) -> Result<Ride> {
        self.select_one(id).await?.into_ride(&self.policy)
    }

    async fn update(&self, id: Uuid, patch: &RidePatch) -> Result<UpdateOutcome> {
        // Compare against the normalized row, then guard the write with the
        // counter as actually stored so a repaired row can still be written
        let record = self.select_one(id).await?;
        let stored_seats = match record.seats_filled {
            Some(seats) => Self::eq(seats),
            None => "is.null".to_string(),
        };
        if !patch.expects(&record.into_ride(&self.policy)?) {
            return Ok(UpdateOutcome::Stale);
        }

        let request = self
            .client
            .patch(&self.endpoint)
            .query(&[("id", Self::eq(id)), ("seats_filled", stored_seats)])
            .header("Prefer", "return=representation")
            .json(&json!({
                "seats_filled": patch.seats_filled,
                "passenger_emails": patch.passengers,
            }));
        let mut rows = self.send(request).await?;
        match rows.pop() {
            Some(row) => Ok(UpdateOutcome::Applied(
                RideRecord::from_json(row)?.into_ride(&self.policy)?,
            )),
            None => {
                // Nothing matched: either the ride is gone or the seats moved
                self.fetch_one(id).await?;
                Ok(UpdateOutcome::Stale)
            }
        }
    }

    async fn remove(&self, id: Uuid) -> Result<()> {
        let request = self
            .client
            .delete(&self.endpoint)
            .query(&[("id", Self::eq(id))])
            .header("Prefer", "return=representation");
        let removed = self.send(request).await?;
        if removed.is_empty() {
            return Err(Error::not_found(id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration as ChronoDuration, Utc};
    use rust_decimal::Decimal;

    use std::sync::Arc;

    use super::super::postgrest_mock::MockPostgrestServer;
    use super::*;
    use crate::domain::{lifecycle, GenderPreference, JoinOutcome, Location, RideInput};
    use crate::services::RideService;

    const KEY: &str = "anon-test-key";

    fn owner() -> Identity {
        Identity::new("owner.k2022@vitstudent.ac.in").with_user_id("uid-owner")
    }

    fn sample_ride() -> Ride {
        let now = Utc::now();
        let input = RideInput {
            from: Location::hostel_lh("C"),
            to: Location::city("Railway Station"),
            departure_time: (now + ChronoDuration::hours(6)).to_rfc3339(),
            total_price: Decimal::new(450, 0),
            seats_total: 2,
            gender_preference: GenderPreference::Female,
            contact_phone: "+91 99887 76655".to_string(),
        };
        lifecycle::create(&input, &owner(), &CreatePolicy::default(), now).unwrap()
    }

    fn store(server: &MockPostgrestServer) -> RestRideStore {
        RestRideStore::new(&server.base_url(), KEY, DEFAULT_TABLE).unwrap()
    }

    #[test]
    fn test_rejects_bad_configuration() {
        assert!(matches!(RestRideStore::new("not a url", KEY, "rides"), Err(Error::Config(_))));
        assert!(matches!(RestRideStore::new("ftp://example.com", KEY, "rides"), Err(Error::Config(_))));
        assert!(matches!(RestRideStore::new("https://x.supabase.co", " ", "rides"), Err(Error::Config(_))));
        assert!(matches!(
            RestRideStore::new("https://x.supabase.co", KEY, "rides; drop"),
            Err(Error::Config(_))
        ));

        let store = RestRideStore::new("https://x.supabase.co/", KEY, "rides").unwrap();
        assert_eq!(store.endpoint(), "https://x.supabase.co/rest/v1/rides");
    }

    #[tokio::test]
    async fn test_insert_fetch_and_remove() {
        let server = MockPostgrestServer::start(KEY).unwrap();
        let store = store(&server);
        let ride = sample_ride();

        let stored = store.insert(&ride).await.unwrap();
        assert_eq!(stored.id, ride.id);

        let fetched = store.fetch_one(ride.id).await.unwrap();
        assert_eq!(fetched.contact_phone.as_str(), "+919988776655");
        assert_eq!(fetched.from, Location::hostel_lh("C"));

        assert_eq!(store.fetch_all().await.unwrap().len(), 1);
        assert_eq!(store.fetch_by_creator(&owner()).await.unwrap().len(), 1);
        let stranger = Identity::new("x.y2020@vitstudent.ac.in");
        assert!(store.fetch_by_creator(&stranger).await.unwrap().is_empty());

        store.remove(ride.id).await.unwrap();
        assert!(matches!(store.fetch_one(ride.id).await, Err(Error::RideNotFound(_))));
        assert!(matches!(store.remove(ride.id).await, Err(Error::RideNotFound(_))));
    }

    #[tokio::test]
    async fn test_conditional_patch() {
        let server = MockPostgrestServer::start(KEY).unwrap();
        let store = store(&server);
        let ride = sample_ride();
        store.insert(&ride).await.unwrap();

        let joined = lifecycle::join(&ride, &Identity::new("a.b2023@vitstudent.ac.in"))
            .unwrap()
            .into_ride();
        let patch = RidePatch::between(&ride, &joined);

        match store.update(ride.id, &patch).await.unwrap() {
            UpdateOutcome::Applied(updated) => assert_eq!(updated.seats_filled, 1),
            UpdateOutcome::Stale => panic!("first write should apply"),
        }
        assert_eq!(store.update(ride.id, &patch).await.unwrap(), UpdateOutcome::Stale);
        assert!(matches!(
            store.update(Uuid::new_v4(), &patch).await,
            Err(Error::RideNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_legacy_rows_are_normalized() {
        let server = MockPostgrestServer::start(KEY).unwrap();
        server.seed(json!({
            "id": "6f1f7c6e-3c39-4d8e-9a49-0d2b8f3f9a10",
            "created_by": "uid-owner",
            "createdbyemail": "owner.k2022@vitstudent.ac.in",
            "from": "Hostel-MH-J",
            "to": "Airport-Chennai",
            "travel_date": "2099-01-01",
            "travel_time": "05:00",
            "cab_price": 1500,
            "seats": 4,
            "contact": "9876543210",
            "created_at": "2024-12-31T10:00:00Z"
        }));
        server.seed(json!({ "id": "broken", "from": "nowhere" }));

        let rides = store(&server).fetch_all().await.unwrap();
        assert_eq!(rides.len(), 1);
        assert_eq!(rides[0].to, Location::city("Chennai Airport"));
        assert_eq!(rides[0].total_price, Decimal::new(1500, 0));
    }

    #[tokio::test]
    async fn test_mistyped_row_does_not_hide_the_board() {
        let server = MockPostgrestServer::start(KEY).unwrap();
        let store = store(&server);
        let ride = sample_ride();
        store.insert(&ride).await.unwrap();
        server.seed(json!({
            "id": "0b6c1f0e-7d7a-4a43-9d55-3f1c9a0c2b11",
            "createdbyemail": "owner.k2022@vitstudent.ac.in",
            "from": "Hostel-MH-J",
            "to": "Airport-Chennai",
            "travel_date": "2099-01-01",
            "travel_time": "05:00",
            "cab_price": 1500,
            "seats": "4",
            "contact": "9876543210"
        }));

        let rides = store.fetch_all().await.unwrap();
        assert_eq!(rides.len(), 1);
        assert_eq!(rides[0].id, ride.id);
        assert_eq!(store.fetch_by_creator(&owner()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_repaired_row_can_be_joined() {
        let server = MockPostgrestServer::start(KEY).unwrap();
        // Creator listed as a passenger and counted in seats_filled
        server.seed(json!({
            "id": "6f1f7c6e-3c39-4d8e-9a49-0d2b8f3f9a10",
            "created_by": "uid-owner",
            "created_by_email": "owner.k2022@vitstudent.ac.in",
            "from_type": "MH",
            "from_value": "J",
            "to_type": "CITY",
            "to_value": "Chennai Airport",
            "departure_time": "2099-01-01T00:00:00.000Z",
            "total_price": 1200,
            "seats_total": 4,
            "seats_filled": 1,
            "gender_pref": "Any",
            "phone": "+919876543210",
            "passenger_emails": ["owner.k2022@vitstudent.ac.in"],
            "created_at": "2024-12-31T10:00:00.000Z"
        }));
        let store: Arc<dyn RideStore> = Arc::new(store(&server));
        let service = RideService::new(Arc::clone(&store), CreatePolicy::default());
        let id = Uuid::parse_str("6f1f7c6e-3c39-4d8e-9a49-0d2b8f3f9a10").unwrap();

        let rider = Identity::new("a.b2023@vitstudent.ac.in");
        match service.join(id, &rider).await.unwrap() {
            JoinOutcome::Joined(ride) => {
                assert_eq!(ride.seats_filled, 1);
                assert_eq!(ride.passengers, vec![rider.email.clone()]);
            }
            other => panic!("expected a seat, got {:?}", other),
        }

        // The repair was written back, so the next join compares cleanly too
        let second = Identity::new("c.d2024@vitstudent.ac.in");
        assert!(matches!(service.join(id, &second).await.unwrap(), JoinOutcome::Joined(_)));
        let stored = store.fetch_one(id).await.unwrap();
        assert_eq!(stored.seats_filled, 2);
        stored.check_invariants().unwrap();
    }

    #[tokio::test]
    async fn test_row_without_seat_counter_can_be_joined() {
        let server = MockPostgrestServer::start(KEY).unwrap();
        server.seed(json!({
            "id": "6f1f7c6e-3c39-4d8e-9a49-0d2b8f3f9a10",
            "createdbyemail": "owner.k2022@vitstudent.ac.in",
            "from": "Hostel-MH-J",
            "to": "Airport-Chennai",
            "travel_date": "2099-01-01",
            "travel_time": "05:00",
            "cab_price": 1500,
            "seats": 4,
            "contact": "9876543210"
        }));
        let store = store(&server);
        let id = Uuid::parse_str("6f1f7c6e-3c39-4d8e-9a49-0d2b8f3f9a10").unwrap();
        let ride = store.fetch_one(id).await.unwrap();
        let joined = lifecycle::join(&ride, &Identity::new("a.b2023@vitstudent.ac.in"))
            .unwrap()
            .into_ride();

        let outcome = store.update(id, &RidePatch::between(&ride, &joined)).await.unwrap();
        assert!(matches!(outcome, UpdateOutcome::Applied(ref r) if r.seats_filled == 1));
    }

    #[tokio::test]
    async fn test_bad_key_is_store_error() {
        let server = MockPostgrestServer::start(KEY).unwrap();
        let store = RestRideStore::new(&server.base_url(), "wrong", DEFAULT_TABLE).unwrap();
        let err = store.fetch_all().await.unwrap_err();
        assert!(matches!(err, Error::StoreUnavailable(_)));
        assert!(err.to_string().contains("authentication failed"));
    }

    #[tokio::test]
    async fn test_unreachable_store() {
        let store = RestRideStore::new("http://127.0.0.1:9", KEY, DEFAULT_TABLE).unwrap();
        assert!(matches!(store.fetch_all().await, Err(Error::StoreUnavailable(_))));
    }
}
