use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use mechanicsmatch::clock::FixedClock;
use mechanicsmatch::config::AppConfig;
use mechanicsmatch::db;
use mechanicsmatch::handlers;
use mechanicsmatch::services::availability::AlwaysAvailable;
use mechanicsmatch::services::vehicle_data::{
    VehicleDataCache, VehicleDataService, VehicleDataSource,
};
use mechanicsmatch::state::AppState;

// ── Mock Providers ──

/// Vehicle API stand-in. Counts calls so tests can tell cache hits apart.
struct MockVehicleApi {
    calls: Arc<AtomicUsize>,
    offline: bool,
}

#[async_trait]
impl VehicleDataSource for MockVehicleApi {
    async fn makes(&self, vehicle_type: &str) -> anyhow::Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline {
            anyhow::bail!("connection refused");
        }
        match vehicle_type {
            "car" => Ok(vec![
                "Toyota ".to_string(),
                "Honda".to_string(),
                "HONDA".to_string(),
                "Ford".to_string(),
            ]),
            _ => Ok(vec![]),
        }
    }

    async fn models(&self, make: &str, _year: i32) -> anyhow::Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline {
            anyhow::bail!("connection refused");
        }
        Ok(vec![format!("{make} One"), format!("{make} Two")])
    }
}

// ── Helpers ──

fn test_config() -> AppConfig {
    AppConfig {
        port: 3000,
        database_url: ":memory:".to_string(),
        admin_token: "test-token".to_string(),
        vehicle_api_url: "http://localhost:0".to_string(),
        vehicle_cache_ttl_secs: 60,
        vehicle_api_timeout_secs: 1,
        submit_latency_ms: 0,
    }
}

struct TestHarness {
    state: Arc<AppState>,
    clock: Arc<FixedClock>,
    api_calls: Arc<AtomicUsize>,
}

fn harness_with(offline: bool) -> TestHarness {
    let config = test_config();
    let conn = db::init_db(":memory:").unwrap();
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
    ));
    let api_calls = Arc::new(AtomicUsize::new(0));

    let cache = VehicleDataCache::new(
        chrono::Duration::seconds(config.vehicle_cache_ttl_secs),
        clock.clone(),
    );
    let api = MockVehicleApi {
        calls: api_calls.clone(),
        offline,
    };

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config,
        clock: clock.clone(),
        availability: Box::new(AlwaysAvailable),
        vehicles: VehicleDataService::new(Box::new(api), cache),
        wizards: Mutex::new(HashMap::new()),
    });

    TestHarness {
        state,
        clock,
        api_calls,
    }
}

fn harness() -> TestHarness {
    harness_with(false)
}

fn test_app(state: &Arc<AppState>) -> Router {
    handlers::router(state.clone())
}

async fn send(state: &Arc<AppState>, req: Request<Body>) -> (StatusCode, Value) {
    let res = test_app(state).oneshot(req).await.unwrap();
    let status = res.status();
    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn authed(method: &str, uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .header("Authorization", format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn create_customer(state: &Arc<AppState>, id: &str) {
    let (status, _) = send(
        state,
        json_request(
            "POST",
            "/api/users",
            json!({
                "id": id,
                "email": "sam@example.com",
                "first_name": "Sam",
                "last_name": "Rivera",
                "user_type": "customer",
                "phone": "555-0100",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

/// Walks a wizard up to the contact step. Returns the session's base uri.
async fn wizard_at_contact(state: &Arc<AppState>, customer_id: &str) -> String {
    let (status, wizard) = send(
        state,
        json_request(
            "POST",
            "/api/wizard",
            json!({ "shop_id": "shop-la-precision", "customer_id": customer_id }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = wizard["id"].as_str().unwrap().to_string();
    let base = format!("/api/wizard/{id}");

    let steps = [
        ("PATCH", base.clone(), json!({ "service_id": "svc-la-precision-oil" })),
        ("POST", format!("{base}/next"), json!({})),
        ("POST", format!("{base}/date"), json!({ "appointment_date": "2025-06-10" })),
        ("PATCH", base.clone(), json!({ "appointment_time": "10:00" })),
        ("POST", format!("{base}/next"), json!({})),
        (
            "PATCH",
            base.clone(),
            json!({
                "vehicle_make": "Honda",
                "vehicle_model": "Civic",
                "vehicle_year": "2020",
                "problem_description": "Due for an oil change",
            }),
        ),
        ("POST", format!("{base}/next"), json!({})),
    ];
    for (method, uri, body) in steps {
        let (status, json) = send(state, json_request(method, &uri, body)).await;
        assert_eq!(status, StatusCode::OK, "{method} {uri}: {json}");
    }
    base
}

/// Walks a wizard through every step and submits it. Returns the booking.
async fn book_oil_change(state: &Arc<AppState>, customer_id: &str) -> Value {
    let base = wizard_at_contact(state, customer_id).await;
    let (status, json) = send(state, json_request("POST", &format!("{base}/submit"), json!({}))).await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    json["booking"].clone()
}

async fn set_status(state: &Arc<AppState>, booking_id: &str, status: &str) -> StatusCode {
    let uri = format!("/api/shops/shop-la-precision/bookings/{booking_id}/status");
    send(state, authed("POST", &uri, "test-token", json!({ "status": status })))
        .await
        .0
}

fn ids(shops: &Value) -> Vec<String> {
    shops
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap().to_string())
        .collect()
}

// ── Health ──

#[tokio::test]
async fn test_health() {
    let h = harness();
    let (status, json) = send(&h.state, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

// ── Shop Search Tests ──

#[tokio::test]
async fn test_search_los_angeles_oil() {
    let h = harness();
    let (status, json) = send(&h.state, get("/api/shops?location=Los%20Angeles&service=oil")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&json["shops"]), vec!["shop-la-precision"]);
    assert_eq!(json["total"], 1);
    assert_eq!(json["has_more"], false);
}

#[tokio::test]
async fn test_search_service_sorted_by_rating() {
    let h = harness();
    let (_, json) = send(&h.state, get("/api/shops?service=Oil")).await;
    assert_eq!(
        ids(&json["shops"]),
        vec!["shop-hou-quick", "shop-la-precision"]
    );
}

#[tokio::test]
async fn test_search_min_rating_and_pagination() {
    let h = harness();
    let (_, json) = send(&h.state, get("/api/shops?min_rating=4.6&limit=2")).await;

    assert_eq!(json["total"], 3);
    assert_eq!(json["limit"], 2);
    assert_eq!(json["has_more"], true);
    assert_eq!(ids(&json["shops"]), vec!["shop-hou-quick", "shop-aus-volt"]);

    let (_, json) = send(&h.state, get("/api/shops?min_rating=4.6&limit=2&page=2")).await;
    assert_eq!(ids(&json["shops"]), vec!["shop-sf-bay"]);
    assert_eq!(json["has_more"], false);
}

#[tokio::test]
async fn test_search_sort_by_reviews() {
    let h = harness();
    let (_, json) = send(&h.state, get("/api/shops?location=ca&sort_by=reviews")).await;
    // "ca" also matches Chicago
    assert_eq!(
        ids(&json["shops"]),
        vec!["shop-sf-bay", "shop-la-precision", "shop-la-eastside", "shop-chi-cool"]
    );
}

#[tokio::test]
async fn test_shop_detail_and_services() {
    let h = harness();
    let (status, json) = send(&h.state, get("/api/shops/shop-hou-quick")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["city"], "Houston");

    let (status, json) = send(&h.state, get("/api/shops/shop-la-precision/services")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 3);

    let (status, _) = send(&h.state, get("/api/shops/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&h.state, get("/api/shops/nope/services")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Booking Wizard Tests ──

#[tokio::test]
async fn test_wizard_start_prefills_contact() {
    let h = harness();
    create_customer(&h.state, "cust-1").await;

    let (status, json) = send(
        &h.state,
        json_request(
            "POST",
            "/api/wizard",
            json!({ "shop_id": "shop-la-precision", "customer_id": "cust-1" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["step"], "service_selection");
    assert_eq!(json["step_number"], 1);
    assert_eq!(json["can_advance"], false);
    assert_eq!(json["draft"]["customer_name"], "Sam Rivera");
    assert_eq!(json["draft"]["customer_phone"], "555-0100");
    assert_eq!(json["min_date"], "2025-06-02");
    assert_eq!(json["max_date"], "2025-07-01");
}

#[tokio::test]
async fn test_wizard_start_rejects_unknown_shop_and_shop_accounts() {
    let h = harness();
    create_customer(&h.state, "cust-1").await;

    let (status, _) = send(
        &h.state,
        json_request(
            "POST",
            "/api/wizard",
            json!({ "shop_id": "missing", "customer_id": "cust-1" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    send(
        &h.state,
        json_request(
            "POST",
            "/api/users",
            json!({
                "id": "owner-1",
                "email": "owner@example.com",
                "first_name": "Pat",
                "last_name": "Lee",
                "user_type": "shop",
            }),
        ),
    )
    .await;
    let (status, _) = send(
        &h.state,
        json_request(
            "POST",
            "/api/wizard",
            json!({ "shop_id": "shop-la-precision", "customer_id": "owner-1" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_wizard_blocks_incomplete_steps() {
    let h = harness();
    create_customer(&h.state, "cust-1").await;
    let (_, wizard) = send(
        &h.state,
        json_request(
            "POST",
            "/api/wizard",
            json!({ "shop_id": "shop-la-precision", "customer_id": "cust-1" }),
        ),
    )
    .await;
    let base = format!("/api/wizard/{}", wizard["id"].as_str().unwrap());

    let (status, json) = send(&h.state, json_request("POST", &format!("{base}/next"), json!({}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json["error"].as_str().unwrap().contains("service_id"));

    // Another shop's service is not selectable
    let (status, _) = send(
        &h.state,
        json_request("PATCH", &base, json!({ "service_id": "svc-hou-quick-oil" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(&h.state, json_request("POST", &format!("{base}/back"), json!({}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(&h.state, json_request("POST", &format!("{base}/submit"), json!({}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_wizard_date_bounds_and_slots() {
    let h = harness();
    create_customer(&h.state, "cust-1").await;
    let (_, wizard) = send(
        &h.state,
        json_request(
            "POST",
            "/api/wizard",
            json!({ "shop_id": "shop-la-precision", "customer_id": "cust-1" }),
        ),
    )
    .await;
    let base = format!("/api/wizard/{}", wizard["id"].as_str().unwrap());

    for date in ["2025-06-01", "2025-07-02"] {
        let (status, _) = send(
            &h.state,
            json_request("POST", &format!("{base}/date"), json!({ "appointment_date": date })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{date}");
    }

    let (status, json) = send(
        &h.state,
        json_request("POST", &format!("{base}/date"), json!({ "appointment_date": "2025-07-01" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let slots = json["time_slots"].as_array().unwrap();
    assert_eq!(slots.len(), 7);
    assert_eq!(slots[0]["time"], "09:00");
    assert!(slots.iter().all(|s| s["time"] != "12:00"));

    let (status, _) = send(
        &h.state,
        json_request("PATCH", &base, json!({ "appointment_time": "12:00" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_wizard_full_flow_creates_booking() {
    let h = harness();
    create_customer(&h.state, "cust-1").await;

    let booking = book_oil_change(&h.state, "cust-1").await;
    assert_eq!(booking["status"], "pending");
    assert_eq!(booking["payment_status"], "pending");
    assert_eq!(booking["shop_id"], "shop-la-precision");
    assert_eq!(booking["appointment_date"], "2025-06-10");
    assert_eq!(booking["appointment_time"], "10:00");
    assert_eq!(booking["vehicle_make"], "Honda");

    let id = booking["id"].as_str().unwrap();
    let (status, json) = send(&h.state, get("/api/customers/cust-1/appointments")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["counts"]["active"], 1);
    assert_eq!(json["counts"]["total"], 1);
    assert_eq!(json["active"][0]["id"], id);
    assert_eq!(json["active"][0]["actions"], json!(["reschedule", "view_details"]));
}

#[tokio::test]
async fn test_wizard_session_removed_after_submit() {
    let h = harness();
    create_customer(&h.state, "cust-1").await;
    book_oil_change(&h.state, "cust-1").await;

    assert!(h.state.wizards.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_wizard_next_at_contact_requires_submit() {
    let h = harness();
    create_customer(&h.state, "cust-1").await;
    let (_, wizard) = send(
        &h.state,
        json_request(
            "POST",
            "/api/wizard",
            json!({ "shop_id": "shop-la-precision", "customer_id": "cust-1" }),
        ),
    )
    .await;
    let id = wizard["id"].as_str().unwrap();
    let base = format!("/api/wizard/{id}");

    send(&h.state, json_request("PATCH", &base, json!({ "service_id": "svc-la-precision-oil" }))).await;
    send(&h.state, json_request("POST", &format!("{base}/next"), json!({}))).await;
    send(&h.state, json_request("POST", &format!("{base}/date"), json!({ "appointment_date": "2025-06-03" }))).await;
    send(&h.state, json_request("PATCH", &base, json!({ "appointment_time": "14:00" }))).await;
    send(&h.state, json_request("POST", &format!("{base}/next"), json!({}))).await;
    send(
        &h.state,
        json_request(
            "PATCH",
            &base,
            json!({
                "vehicle_make": "Ford",
                "vehicle_model": "F-150",
                "vehicle_year": "2019",
                "problem_description": "Grinding noise",
            }),
        ),
    )
    .await;
    let (_, json) = send(&h.state, json_request("POST", &format!("{base}/next"), json!({}))).await;
    assert_eq!(json["step"], "contact_info");

    let (status, _) = send(&h.state, json_request("POST", &format!("{base}/next"), json!({}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, json) = send(&h.state, json_request("POST", &format!("{base}/back"), json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["step"], "vehicle_info");
    assert_eq!(json["draft"]["vehicle_make"], "Ford");
}

#[tokio::test]
async fn test_wizard_refuses_blanking_passed_steps() {
    let h = harness();
    create_customer(&h.state, "cust-1").await;
    let base = wizard_at_contact(&h.state, "cust-1").await;

    for body in [
        json!({ "vehicle_make": "", "problem_description": "" }),
        json!({ "appointment_time": "" }),
        json!({ "service_id": "" }),
    ] {
        let (status, json) = send(&h.state, json_request("PATCH", &base, body.clone())).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");
        assert!(json["error"].as_str().unwrap().contains("incomplete"));
    }

    let (status, json) = send(&h.state, get(&base)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["draft"]["vehicle_make"], "Honda");
    assert_eq!(json["draft"]["service_id"], "svc-la-precision-oil");
}

#[tokio::test]
async fn test_wizard_submit_refused_after_date_change_clears_time() {
    let h = harness();
    create_customer(&h.state, "cust-1").await;
    let base = wizard_at_contact(&h.state, "cust-1").await;

    let (status, json) = send(
        &h.state,
        json_request("POST", &format!("{base}/date"), json!({ "appointment_date": "2025-06-12" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["draft"]["appointment_time"], "");

    let (status, json) = send(&h.state, json_request("POST", &format!("{base}/submit"), json!({}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json["error"].as_str().unwrap().contains("appointment_time"));

    let (_, json) = send(&h.state, get("/api/customers/cust-1/appointments")).await;
    assert_eq!(json["counts"]["total"], 0);

    send(&h.state, json_request("PATCH", &base, json!({ "appointment_time": "11:00" }))).await;
    let (status, json) = send(&h.state, json_request("POST", &format!("{base}/submit"), json!({}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["booking"]["appointment_time"], "11:00");
}

#[tokio::test]
async fn test_wizard_unknown_session() {
    let h = harness();
    let (status, _) = send(&h.state, get("/api/wizard/does-not-exist")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Appointment Status Tests ──

#[tokio::test]
async fn test_status_update_requires_auth() {
    let h = harness();
    create_customer(&h.state, "cust-1").await;
    let booking = book_oil_change(&h.state, "cust-1").await;
    let uri = format!(
        "/api/shops/shop-la-precision/bookings/{}/status",
        booking["id"].as_str().unwrap()
    );

    let (status, _) = send(
        &h.state,
        json_request("POST", &uri, json!({ "status": "confirmed" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &h.state,
        authed("POST", &uri, "wrong-token", json!({ "status": "confirmed" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_status_lifecycle_and_projection() {
    let h = harness();
    create_customer(&h.state, "cust-1").await;
    let booking = book_oil_change(&h.state, "cust-1").await;
    let id = booking["id"].as_str().unwrap();

    assert_eq!(set_status(&h.state, id, "completed").await, StatusCode::CONFLICT);
    assert_eq!(set_status(&h.state, id, "confirmed").await, StatusCode::OK);
    assert_eq!(set_status(&h.state, id, "in_progress").await, StatusCode::OK);

    let (_, json) = send(&h.state, get("/api/customers/cust-1/appointments")).await;
    assert_eq!(json["active"][0]["actions"], json!(["track_progress"]));

    assert_eq!(set_status(&h.state, id, "completed").await, StatusCode::OK);
    assert_eq!(set_status(&h.state, id, "cancelled").await, StatusCode::CONFLICT);

    let (_, json) = send(&h.state, get("/api/customers/cust-1/appointments")).await;
    assert_eq!(json["counts"]["active"], 0);
    assert_eq!(json["counts"]["completed"], 1);
    assert_eq!(json["completed"][0]["status"], "completed");
}

#[tokio::test]
async fn test_status_wrong_shop_not_found() {
    let h = harness();
    create_customer(&h.state, "cust-1").await;
    let booking = book_oil_change(&h.state, "cust-1").await;
    let uri = format!(
        "/api/shops/shop-hou-quick/bookings/{}/status",
        booking["id"].as_str().unwrap()
    );

    let (status, _) = send(
        &h.state,
        authed("POST", &uri, "test-token", json!({ "status": "confirmed" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_shop_appointments_filter_by_status() {
    let h = harness();
    create_customer(&h.state, "cust-1").await;
    let first = book_oil_change(&h.state, "cust-1").await;
    book_oil_change(&h.state, "cust-1").await;
    set_status(&h.state, first["id"].as_str().unwrap(), "cancelled").await;

    let (status, json) = send(
        &h.state,
        authed(
            "GET",
            "/api/shops/shop-la-precision/appointments?status=cancelled",
            "test-token",
            Value::Null,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["counts"]["total"], 1);
    assert_eq!(json["cancelled"][0]["actions"], json!(["view_details", "book_again"]));

    let (status, json) = send(
        &h.state,
        authed(
            "GET",
            "/api/shops/shop-la-precision/appointments",
            "test-token",
            Value::Null,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["counts"]["total"], 2);

    let (status, _) = send(
        &h.state,
        authed(
            "GET",
            "/api/shops/shop-la-precision/appointments?status=lost",
            "test-token",
            Value::Null,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

// ── Reschedule & Review Tests ──

#[tokio::test]
async fn test_reschedule_pending_booking() {
    let h = harness();
    create_customer(&h.state, "cust-1").await;
    let booking = book_oil_change(&h.state, "cust-1").await;
    let uri = format!("/api/bookings/{}/reschedule", booking["id"].as_str().unwrap());

    let (status, json) = send(
        &h.state,
        json_request(
            "POST",
            &uri,
            json!({ "appointment_date": "2025-06-20", "appointment_time": "15:00" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["appointment_date"], "2025-06-20");
    assert_eq!(json["appointment_time"], "15:00");

    let (status, _) = send(
        &h.state,
        json_request(
            "POST",
            &uri,
            json!({ "appointment_date": "2025-06-20", "appointment_time": "12:00" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(
        &h.state,
        json_request(
            "POST",
            &uri,
            json!({ "appointment_date": "2025-08-01", "appointment_time": "09:00" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_reschedule_cancelled_booking_rejected() {
    let h = harness();
    create_customer(&h.state, "cust-1").await;
    let booking = book_oil_change(&h.state, "cust-1").await;
    let id = booking["id"].as_str().unwrap();
    set_status(&h.state, id, "cancelled").await;

    let (status, _) = send(
        &h.state,
        json_request(
            "POST",
            &format!("/api/bookings/{id}/reschedule"),
            json!({ "appointment_date": "2025-06-20", "appointment_time": "15:00" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_review_completed_booking_once() {
    let h = harness();
    create_customer(&h.state, "cust-1").await;
    let booking = book_oil_change(&h.state, "cust-1").await;
    let id = booking["id"].as_str().unwrap();
    let uri = format!("/api/bookings/{id}/review");

    // Not reviewable until completed
    let (status, _) = send(&h.state, json_request("POST", &uri, json!({ "rating": 5 }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    for next in ["confirmed", "in_progress", "completed"] {
        assert_eq!(set_status(&h.state, id, next).await, StatusCode::OK);
    }

    let (status, _) = send(&h.state, json_request("POST", &uri, json!({ "rating": 6 }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, json) = send(
        &h.state,
        json_request("POST", &uri, json!({ "rating": 5, "comment": "  Quick and friendly " })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["comment"], "Quick and friendly");

    let (status, _) = send(&h.state, json_request("POST", &uri, json!({ "rating": 4 }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, shop) = send(&h.state, get("/api/shops/shop-la-precision")).await;
    assert_eq!(shop["review_count"], 129);

    let (_, reviews) = send(&h.state, get("/api/shops/shop-la-precision/reviews")).await;
    assert_eq!(reviews.as_array().unwrap().len(), 1);
}

// ── Garage Tests ──

#[tokio::test]
async fn test_cars_add_list_delete() {
    let h = harness();
    create_customer(&h.state, "cust-1").await;

    let (status, car) = send(
        &h.state,
        json_request(
            "POST",
            "/api/customers/cust-1/cars",
            json!({
                "car_make": " Toyota ",
                "car_model": "Camry",
                "car_trim": "SE",
                "car_year": 2021,
                "car_license_plate": "7abc123",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(car["car_make"], "Toyota");
    assert_eq!(car["car_license_plate"], "7ABC123");

    let (_, cars) = send(&h.state, get("/api/customers/cust-1/cars")).await;
    assert_eq!(cars.as_array().unwrap().len(), 1);

    let car_id = car["id"].as_str().unwrap();
    let req = Request::builder()
        .method("DELETE")
        .uri(format!("/api/cars/{car_id}"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&h.state, req).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let req = Request::builder()
        .method("DELETE")
        .uri(format!("/api/cars/{car_id}"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&h.state, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cars_reject_future_year() {
    let h = harness();
    create_customer(&h.state, "cust-1").await;

    let (status, _) = send(
        &h.state,
        json_request(
            "POST",
            "/api/customers/cust-1/cars",
            json!({ "car_make": "Tesla", "car_model": "Model Y", "car_year": 2027 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

// ── Vehicle Data Tests ──

#[tokio::test]
async fn test_vehicle_makes_cached_then_expired() {
    let h = harness();

    let (status, json) = send(&h.state, get("/api/vehicles/makes")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["source"], "api");
    let names: Vec<&str> = json["options"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Ford", "Honda", "Toyota"]);

    h.clock.advance(chrono::Duration::seconds(30));
    let (_, json) = send(&h.state, get("/api/vehicles/makes")).await;
    assert_eq!(json["source"], "cache");
    assert_eq!(h.api_calls.load(Ordering::SeqCst), 1);

    h.clock.advance(chrono::Duration::seconds(31));
    let (_, json) = send(&h.state, get("/api/vehicles/makes")).await;
    assert_eq!(json["source"], "api");
    assert_eq!(h.api_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_vehicle_makes_fall_back_when_offline() {
    let h = harness_with(true);

    let (status, json) = send(&h.state, get("/api/vehicles/makes")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["source"], "static");
    assert_eq!(json["options"].as_array().unwrap().len(), 15);

    // Fallback answers are not cached
    send(&h.state, get("/api/vehicles/makes")).await;
    assert_eq!(h.api_calls.load(Ordering::SeqCst), 2);
    assert!(h.state.vehicles.cache().is_empty());
}

#[tokio::test]
async fn test_vehicle_makes_empty_api_result_uses_table() {
    let h = harness();
    let (_, json) = send(&h.state, get("/api/vehicles/makes?vehicle_type=motorcycle")).await;
    assert_eq!(json["source"], "static");
    assert!(!json["options"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_vehicle_models_and_trims() {
    let h = harness();
    let (status, json) = send(&h.state, get("/api/vehicles/models?make=Honda&year=2020")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["source"], "api");
    assert_eq!(json["options"][0]["name"], "Honda One");

    let (status, _) = send(&h.state, get("/api/vehicles/models?make=Honda&year=1850")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, json) = send(&h.state, get("/api/vehicles/trims?make=Honda&model=Civic")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["source"], "static");
    assert_eq!(json["options"][0]["name"], "LX");
}

// ── Users ──

#[tokio::test]
async fn test_user_roundtrip_and_validation() {
    let h = harness();
    create_customer(&h.state, "cust-9").await;

    let (status, json) = send(&h.state, get("/api/users/cust-9")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["user_type"], "customer");

    let (status, _) = send(
        &h.state,
        json_request(
            "POST",
            "/api/users",
            json!({
                "id": "x",
                "email": "not-an-email",
                "first_name": "A",
                "last_name": "B",
                "user_type": "customer",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(&h.state, get("/api/users/missing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
