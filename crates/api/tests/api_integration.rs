//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use api::AppState;
use api::config::Config;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use common::UserId;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use store::InMemoryReservationStore;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup() -> axum::Router {
    let state = AppState::new(InMemoryReservationStore::new(), &Config::default());
    api::create_app(Arc::new(state), get_metrics_handle())
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    user: Option<UserId>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user.to_string());
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

/// Seeds a schedule departing `departs_in` from now and returns its id and seat ids.
async fn seed_schedule(app: &axum::Router, capacity: u32, departs_in: Duration) -> (String, Vec<String>) {
    let (status, schedule) = send(
        app,
        "POST",
        "/schedules",
        None,
        Some(json!({
            "capacity": capacity,
            "price_minor": 50_000,
            "departure_at": Utc::now() + departs_in,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let schedule_id = schedule["id"].as_str().unwrap().to_string();

    let (status, seat_map) = send(app, "GET", &format!("/schedules/{schedule_id}/seats"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    let seat_ids = seat_map["seats"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap().to_string())
        .collect();
    (schedule_id, seat_ids)
}

fn booking_body<T: AsRef<str>>(schedule_id: &str, seat_ids: &[T]) -> Value {
    let seat_ids: Vec<&str> = seat_ids.iter().map(AsRef::as_ref).collect();
    let passengers: Vec<Value> = seat_ids
        .iter()
        .enumerate()
        .map(|(i, _)| {
            json!({
                "name": format!("Passenger {}", i + 1),
                "age": 30 + i,
                "gender": "other",
                "seat_number": format!("S{}", i + 1),
            })
        })
        .collect();
    json!({
        "schedule_id": schedule_id,
        "seat_ids": seat_ids,
        "passengers": passengers,
        "payment_method": "credit_card",
    })
}

#[tokio::test]
async fn test_health_check() {
    let app = setup();
    let (status, json) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_seat_map_is_created_lazily() {
    let app = setup();
    let (schedule_id, seat_ids) = seed_schedule(&app, 6, Duration::days(1)).await;
    assert_eq!(seat_ids.len(), 6);

    let (status, json) = send(&app, "GET", &format!("/schedules/{schedule_id}/seats"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["schedule"]["available_seats"], 6);
    assert_eq!(json["seats"][0]["seat_number"], "S1");
    assert_eq!(json["seats"][0]["seat_type"], "window");
    assert_eq!(json["seats"][2]["seat_type"], "aisle");
    assert_eq!(json["seats"][0]["status"], "free");

    let (status, json) = send(&app, "GET", &format!("/schedules/{}/seats", UserId::new()), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["kind"], "not_found");
}

#[tokio::test]
async fn test_book_then_cancel_with_refund() {
    let app = setup();
    let user = UserId::new();
    let (schedule_id, seats) = seed_schedule(&app, 40, Duration::hours(10)).await;

    let (status, json) = send(
        &app,
        "POST",
        "/bookings",
        Some(user),
        Some(booking_body(&schedule_id, &[&seats[0], &seats[1]])),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["booking"]["total_amount_minor"], 100_000);
    assert_eq!(json["booking"]["booking_status"], "confirmed");
    assert_eq!(json["booking"]["payment_status"], "paid");
    assert_eq!(json["payment"]["status"], "completed");
    let booking_id = json["booking"]["id"].as_str().unwrap().to_string();
    let reference = json["booking"]["booking_reference"].as_str().unwrap().to_string();
    assert!(reference.starts_with("BK"));

    let (_, seat_map) = send(&app, "GET", &format!("/schedules/{schedule_id}/seats"), None, None).await;
    assert_eq!(seat_map["schedule"]["available_seats"], 38);
    assert_eq!(seat_map["seats"][0]["status"], "booked");

    let (status, json) = send(
        &app,
        "GET",
        &format!("/bookings/reference/{reference}"),
        Some(user),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], booking_id.as_str());

    let (status, json) = send(
        &app,
        "PUT",
        &format!("/bookings/{booking_id}/cancel"),
        Some(user),
        Some(json!({ "reason": "Trip postponed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["booking_status"], "cancelled");
    assert_eq!(json["payment_status"], "refunded");
    assert_eq!(json["cancellation_reason"], "Trip postponed");

    // 10 hours out falls in the 50% tier.
    let (status, json) = send(
        &app,
        "GET",
        &format!("/bookings/{booking_id}/payment"),
        Some(user),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "refunded");
    assert_eq!(json["refund_amount_minor"], 50_000);

    let (_, seat_map) = send(&app, "GET", &format!("/schedules/{schedule_id}/seats"), None, None).await;
    assert_eq!(seat_map["schedule"]["available_seats"], 40);

    let (status, json) = send(
        &app,
        "PUT",
        &format!("/bookings/{booking_id}/cancel"),
        Some(user),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["kind"], "invalid_state");
}

#[tokio::test]
async fn test_identity_is_required() {
    let app = setup();
    let (schedule_id, seats) = seed_schedule(&app, 4, Duration::days(1)).await;

    let (status, json) = send(
        &app,
        "POST",
        "/bookings",
        None,
        Some(booking_body(&schedule_id, &[&seats[0]])),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"]["kind"], "unauthenticated");

    let request = Request::builder()
        .uri("/bookings")
        .header("x-user-id", "not-a-uuid")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_other_users_booking_is_forbidden() {
    let app = setup();
    let owner = UserId::new();
    let (schedule_id, seats) = seed_schedule(&app, 4, Duration::days(1)).await;
    let (_, json) = send(
        &app,
        "POST",
        "/bookings",
        Some(owner),
        Some(booking_body(&schedule_id, &[&seats[0]])),
    )
    .await;
    let booking_id = json["booking"]["id"].as_str().unwrap().to_string();

    let intruder = Some(UserId::new());
    let (status, json) = send(&app, "GET", &format!("/bookings/{booking_id}"), intruder, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"]["kind"], "unauthorized");

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/bookings/{booking_id}/cancel"),
        intruder,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, json) = send(&app, "GET", &format!("/bookings/{booking_id}"), Some(owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["booking_status"], "confirmed");
}

#[tokio::test]
async fn test_taken_seat_conflicts() {
    let app = setup();
    let (schedule_id, seats) = seed_schedule(&app, 4, Duration::days(1)).await;
    let body = booking_body(&schedule_id, &[&seats[2]]);

    let (status, _) = send(&app, "POST", "/bookings", Some(UserId::new()), Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, json) = send(&app, "POST", "/bookings", Some(UserId::new()), Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["kind"], "seat_unavailable");
}

#[tokio::test]
async fn test_request_validation() {
    let app = setup();
    let user = Some(UserId::new());
    let (schedule_id, seats) = seed_schedule(&app, 4, Duration::days(1)).await;

    let mut bad_age = booking_body(&schedule_id, &[&seats[0]]);
    bad_age["passengers"][0]["age"] = json!(0);
    let mut bad_method = booking_body(&schedule_id, &[&seats[0]]);
    bad_method["payment_method"] = json!("cash");
    let mut mismatch = booking_body(&schedule_id, &[&seats[0]]);
    mismatch["seat_ids"] = json!([seats[0], seats[1]]);

    for body in [bad_age, bad_method, mismatch, json!({ "schedule_id": schedule_id })] {
        let (status, json) = send(&app, "POST", "/bookings", user, Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["kind"], "validation_error");
    }

    let (status, json) = send(
        &app,
        "POST",
        "/bookings",
        user,
        Some(booking_body(&schedule_id, &[&UserId::new().to_string()])),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["kind"], "invalid_selection");
}

#[tokio::test]
async fn test_cancel_inside_cutoff_is_rejected() {
    let app = setup();
    let user = Some(UserId::new());
    let (schedule_id, seats) = seed_schedule(&app, 4, Duration::minutes(90)).await;
    let (_, json) = send(
        &app,
        "POST",
        "/bookings",
        user,
        Some(booking_body(&schedule_id, &[&seats[0]])),
    )
    .await;
    let booking_id = json["booking"]["id"].as_str().unwrap().to_string();

    let (status, json) = send(
        &app,
        "PUT",
        &format!("/bookings/{booking_id}/cancel"),
        user,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["kind"], "invalid_state");
}

#[tokio::test]
async fn test_list_bookings_pages_and_filters() {
    let app = setup();
    let user = Some(UserId::new());
    let (schedule_id, seats) = seed_schedule(&app, 8, Duration::days(2)).await;

    let mut ids = Vec::new();
    for seat in seats.iter().take(3) {
        let (_, json) = send(
            &app,
            "POST",
            "/bookings",
            user,
            Some(booking_body(&schedule_id, &[seat])),
        )
        .await;
        ids.push(json["booking"]["id"].as_str().unwrap().to_string());
    }
    send(&app, "PUT", &format!("/bookings/{}/cancel", ids[0]), user, None).await;

    let (status, json) = send(&app, "GET", "/bookings?page=1&limit=2", user, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["bookings"].as_array().unwrap().len(), 2);
    assert_eq!(json["pagination"]["total"], 3);
    assert_eq!(json["pagination"]["total_pages"], 2);

    let (_, json) = send(&app, "GET", "/bookings?status=cancelled", user, None).await;
    assert_eq!(json["pagination"]["total"], 1);
    assert_eq!(json["bookings"][0]["id"], ids[0].as_str());

    let (status, json) = send(&app, "GET", "/bookings?status=lost", user, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["kind"], "validation_error");
}

#[tokio::test]
async fn test_far_page_is_empty() {
    let app = setup();
    let user = Some(UserId::new());
    let (schedule_id, seats) = seed_schedule(&app, 4, Duration::days(2)).await;
    send(&app, "POST", "/bookings", user, Some(booking_body(&schedule_id, &[&seats[0]]))).await;

    let uri = format!("/bookings?page={}&limit=10", usize::MAX);
    let (status, json) = send(&app, "GET", &uri, user, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["bookings"].as_array().unwrap().is_empty());
    assert_eq!(json["pagination"]["total"], 1);
}

#[tokio::test]
async fn test_schedule_bounds_are_validated() {
    let app = setup();
    let departure_at = Utc::now() + Duration::days(1);

    for body in [
        json!({ "capacity": 0, "price_minor": 100, "departure_at": departure_at }),
        json!({ "capacity": u32::MAX, "price_minor": 100, "departure_at": departure_at }),
        json!({ "capacity": 40, "price_minor": -1, "departure_at": departure_at }),
        json!({ "capacity": 40, "price_minor": i64::MAX / 2 + 1, "departure_at": departure_at }),
    ] {
        let (status, json) = send(&app, "POST", "/schedules", None, Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["kind"], "validation_error");
    }
}

#[tokio::test]
async fn test_stored_seat_number_comes_from_the_seat() {
    let app = setup();
    let (schedule_id, seats) = seed_schedule(&app, 6, Duration::days(1)).await;
    let mut body = booking_body(&schedule_id, &[&seats[4]]);
    body["passengers"][0]["seat_number"] = json!("S9");

    let (status, json) = send(&app, "POST", "/bookings", Some(UserId::new()), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["booking"]["passengers"][0]["seat_number"], "S5");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup();
    let (schedule_id, seats) = seed_schedule(&app, 2, Duration::days(1)).await;
    send(
        &app,
        "POST",
        "/bookings",
        Some(UserId::new()),
        Some(booking_body(&schedule_id, &[&seats[0]])),
    )
    .await;
    let (status, _) = send(&app, "GET", "/bookings", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("reservation_bookings_created_total"));
    assert!(text.contains("api_errors_total"));
}
